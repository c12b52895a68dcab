//! Query API handlers: synchronous answers, SSE streaming, session history.

use crate::types::{
    AppError, QueryRequest, QueryResponse, Result, SessionHistoryResponse, SessionMessage,
};
use crate::AppState;
use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use futures::{Stream, StreamExt};
use std::convert::Infallible;
use uuid::Uuid;

/// Query the corpus and return a generated, source-cited answer.
#[utoipa::path(
    post,
    path = "/query",
    request_body = QueryRequest,
    responses(
        (status = 200, description = "Generated answer with sources", body = QueryResponse),
        (status = 404, description = "No relevant passages found")
    ),
    tag = "query"
)]
pub async fn query(
    State(state): State<AppState>,
    Json(payload): Json<QueryRequest>,
) -> Result<Json<QueryResponse>> {
    let response = state
        .pipeline
        .answer(
            &payload.question,
            payload.document_id,
            payload.session_id,
            payload.top_k,
        )
        .await?;
    Ok(Json(response))
}

/// Query with a streamed answer.
///
/// Event protocol: one `sources` event up front, zero or more `text` events
/// each carrying a fragment, then a terminal `done` event. The exchange is
/// persisted after the fragment sequence is exhausted; a client that
/// disconnects mid-stream forfeits persistence.
#[utoipa::path(
    post,
    path = "/query/stream",
    request_body = QueryRequest,
    responses(
        (status = 200, description = "Server-sent event stream"),
        (status = 404, description = "No relevant passages found")
    ),
    tag = "query"
)]
pub async fn query_stream(
    State(state): State<AppState>,
    Json(payload): Json<QueryRequest>,
) -> Result<Sse<impl Stream<Item = std::result::Result<Event, Infallible>>>> {
    let answer = state
        .pipeline
        .answer_stream(
            &payload.question,
            payload.document_id,
            payload.session_id,
            payload.top_k,
        )
        .await?;

    let sources_event = serde_json::json!({
        "type": "sources",
        "sources": answer.sources,
        "session_id": answer.session_id,
    });
    let mut fragments = answer.fragments;

    let events = async_stream::stream! {
        yield Ok(Event::default().data(sources_event.to_string()));

        let mut failed = false;
        while let Some(item) = fragments.next().await {
            match item {
                Ok(text) => {
                    let payload = serde_json::json!({ "type": "text", "content": text });
                    yield Ok(Event::default().data(payload.to_string()));
                }
                Err(e) => {
                    tracing::error!(error = %e, "Streaming generation failed");
                    failed = true;
                    break;
                }
            }
        }

        if !failed {
            yield Ok(Event::default().data(
                serde_json::json!({ "type": "done" }).to_string(),
            ));
        }
    };

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

/// Chat history for a session.
#[utoipa::path(
    get,
    path = "/query/sessions/{session_id}",
    params(("session_id" = Uuid, Path, description = "Session ID")),
    responses(
        (status = 200, description = "Ordered message list", body = SessionHistoryResponse),
        (status = 404, description = "Session not found")
    ),
    tag = "query"
)]
pub async fn session_history(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SessionHistoryResponse>> {
    let messages = state.sessions.session_messages(session_id).await?;
    if messages.is_empty() {
        return Err(AppError::NotFound("Session not found".to_string()));
    }

    Ok(Json(SessionHistoryResponse {
        session_id,
        messages: messages
            .into_iter()
            .map(|m| SessionMessage {
                id: m.id,
                role: m.role,
                content: m.content,
                created_at: m.created_at,
            })
            .collect(),
    }))
}
