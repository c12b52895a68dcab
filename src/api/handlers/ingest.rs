//! Ingestion API handlers.
//!
//! Single-document ingestion is acknowledged immediately and processed in
//! the background; batch ingestion comes in queued and synchronous flavors.
//! Status reporting combines stored passage counts with the in-process
//! ingestion tracker.

use crate::types::{
    AppError, BatchIngestResponse, CorpusStatusResponse, CorpusStatusRow, CorpusStatusSummary,
    DocumentStatusResponse, IngestAllResponse, IngestRequest, IngestResponse, Result,
};
use crate::AppState;
use axum::extract::{Path, State};
use axum::Json;
use uuid::Uuid;

/// Queue background ingestion for one document.
#[utoipa::path(
    post,
    path = "/ingest/document",
    request_body = IngestRequest,
    responses(
        (status = 200, description = "Ingestion queued", body = IngestResponse),
        (status = 404, description = "Document not found")
    ),
    tag = "ingest"
)]
pub async fn ingest_document(
    State(state): State<AppState>,
    Json(payload): Json<IngestRequest>,
) -> Result<Json<IngestResponse>> {
    if !state.passages.document_exists(payload.document_id).await? {
        return Err(AppError::NotFound("Document not found".to_string()));
    }

    state
        .ingestor
        .spawn_ingest(payload.document_id, payload.source_url);

    Ok(Json(IngestResponse {
        document_id: payload.document_id,
        chunks_created: 0,
        status: "processing".to_string(),
    }))
}

/// Queue background ingestion for every pending document.
#[utoipa::path(
    post,
    path = "/ingest/all",
    responses(
        (status = 200, description = "Pending documents queued", body = IngestAllResponse)
    ),
    tag = "ingest"
)]
pub async fn ingest_all(State(state): State<AppState>) -> Result<Json<IngestAllResponse>> {
    let queued = state.ingestor.ingest_pending().await?;
    Ok(Json(IngestAllResponse {
        status: "processing".to_string(),
        documents_queued: queued,
    }))
}

/// Ingest every pending document synchronously, reporting per-document
/// outcomes. One failure does not abort the batch.
#[utoipa::path(
    post,
    path = "/ingest/all/sync",
    responses(
        (status = 200, description = "Batch ingestion finished", body = BatchIngestResponse)
    ),
    tag = "ingest"
)]
pub async fn ingest_all_sync(State(state): State<AppState>) -> Result<Json<BatchIngestResponse>> {
    let response = state.ingestor.ingest_pending_sync().await?;
    Ok(Json(response))
}

/// Ingestion status for one document.
#[utoipa::path(
    get,
    path = "/ingest/status/{document_id}",
    params(("document_id" = Uuid, Path, description = "Document ID")),
    responses(
        (status = 200, description = "Ingestion status", body = DocumentStatusResponse)
    ),
    tag = "ingest"
)]
pub async fn ingest_status(
    State(state): State<AppState>,
    Path(document_id): Path<Uuid>,
) -> Result<Json<DocumentStatusResponse>> {
    let chunks_count = state.passages.count_passages(document_id).await?;
    let status = if chunks_count > 0 {
        "completed"
    } else {
        "pending"
    };

    Ok(Json(DocumentStatusResponse {
        document_id,
        chunks_count,
        status: status.to_string(),
        last_error: state.ingestor.tracker().last_error(document_id),
    }))
}

/// Corpus-wide ingestion status.
#[utoipa::path(
    get,
    path = "/ingest/status",
    responses(
        (status = 200, description = "Corpus status", body = CorpusStatusResponse)
    ),
    tag = "ingest"
)]
pub async fn ingest_status_all(
    State(state): State<AppState>,
) -> Result<Json<CorpusStatusResponse>> {
    let rows = state.passages.list_ingestion_status().await?;

    let documents: Vec<CorpusStatusRow> = rows
        .into_iter()
        .map(|row| {
            let status = if row.chunks_count > 0 {
                "completed"
            } else {
                "pending"
            };
            CorpusStatusRow {
                document_id: row.document_id,
                title: row.title,
                external_id: row.external_id,
                chunks_count: row.chunks_count,
                status: status.to_string(),
            }
        })
        .collect();

    let completed = documents.iter().filter(|d| d.status == "completed").count();

    Ok(Json(CorpusStatusResponse {
        summary: CorpusStatusSummary {
            total: documents.len(),
            completed,
            pending: documents.len() - completed,
        },
        documents,
    }))
}
