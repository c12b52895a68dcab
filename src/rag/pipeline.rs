//! Query orchestration: retrieve, assemble context, generate, persist.
//!
//! One pipeline instance serves both delivery modes. The synchronous path
//! persists the exchange before returning; the streaming path accumulates
//! fragments internally and persists exactly once after the provider's
//! stream is exhausted. A consumer that drops the stream early forfeits
//! persistence for that exchange; fragments already delivered are not
//! retracted.

use crate::db::SessionStore;
use crate::llm::GenerationProvider;
use crate::rag::context::{build_context, build_system_prompt};
use crate::rag::retrieval::RetrievalEngine;
use crate::types::{AppError, ChatTurn, QueryResponse, Result, Source};
use async_stream::stream;
use futures::stream::BoxStream;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

const NO_RESULTS: &str =
    "No relevant documents found. Please ensure documents have been ingested.";

/// Front half of the streaming response: sources and session id are known
/// before the first answer fragment.
pub struct StreamingAnswer {
    pub sources: Vec<Source>,
    pub session_id: Uuid,
    pub fragments: BoxStream<'static, Result<String>>,
}

pub struct RagPipeline {
    retrieval: Arc<RetrievalEngine>,
    generator: Arc<dyn GenerationProvider>,
    sessions: Arc<dyn SessionStore>,
    history_limit: i64,
}

impl RagPipeline {
    pub fn new(
        retrieval: Arc<RetrievalEngine>,
        generator: Arc<dyn GenerationProvider>,
        sessions: Arc<dyn SessionStore>,
        history_limit: i64,
    ) -> Self {
        Self {
            retrieval,
            generator,
            sessions,
            history_limit,
        }
    }

    /// Retrieve and load history, shared by both delivery modes. Returns the
    /// ranked results, prior turns, and the session id in effect.
    async fn prepare(
        &self,
        question: &str,
        scope: Option<Uuid>,
        session_id: Option<Uuid>,
        top_k: usize,
    ) -> Result<(Vec<crate::rag::retrieval::RetrievedPassage>, Vec<ChatTurn>, Uuid)> {
        let results = self.retrieval.search(question, scope, top_k).await?;
        if results.is_empty() {
            return Err(AppError::NotFound(NO_RESULTS.to_string()));
        }

        // History exists only for sessions the caller already holds.
        let history = match session_id {
            Some(id) => self.sessions.load_history(id, self.history_limit).await?,
            None => Vec::new(),
        };
        let session_id = session_id.unwrap_or_else(Uuid::new_v4);

        Ok((results, history, session_id))
    }

    /// Whole-answer mode: generate, persist the exchange, respond.
    pub async fn answer(
        &self,
        question: &str,
        scope: Option<Uuid>,
        session_id: Option<Uuid>,
        top_k: usize,
    ) -> Result<QueryResponse> {
        let start = Instant::now();
        let (results, history, session_id) =
            self.prepare(question, scope, session_id, top_k).await?;

        let context = build_context(&results);
        let system = build_system_prompt(&context);
        let answer = self.generator.generate(&system, &history, question).await?;

        self.sessions
            .append_exchange(session_id, question, &answer)
            .await?;

        tracing::info!(
            %session_id,
            results = results.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Query answered"
        );

        Ok(QueryResponse {
            answer,
            sources: results.iter().map(|r| r.to_source()).collect(),
            session_id,
        })
    }

    /// Streaming mode: sources up front, then a lazy fragment sequence.
    /// Persistence happens after the final fragment, never before, and never
    /// if the consumer abandons the stream.
    pub async fn answer_stream(
        &self,
        question: &str,
        scope: Option<Uuid>,
        session_id: Option<Uuid>,
        top_k: usize,
    ) -> Result<StreamingAnswer> {
        let (results, history, session_id) =
            self.prepare(question, scope, session_id, top_k).await?;

        let sources: Vec<Source> = results.iter().map(|r| r.to_source()).collect();
        let context = build_context(&results);
        let system = build_system_prompt(&context);

        let mut provider_stream = self.generator.stream(&system, &history, question).await?;
        let sessions = Arc::clone(&self.sessions);
        let question = question.to_string();

        let fragments = stream! {
            let mut full_answer = String::new();
            let mut failed = false;

            while let Some(item) = provider_stream.next().await {
                match item {
                    Ok(text) => {
                        full_answer.push_str(&text);
                        yield Ok(text);
                    }
                    Err(e) => {
                        // Fragments already sent stay sent; the exchange is
                        // not persisted.
                        failed = true;
                        yield Err(e);
                        break;
                    }
                }
            }

            if !failed {
                if let Err(e) = sessions
                    .append_exchange(session_id, &question, &full_answer)
                    .await
                {
                    tracing::error!(%session_id, error = %e, "Failed to persist streamed exchange");
                    yield Err(e);
                }
            }
        };

        Ok(StreamingAnswer {
            sources,
            session_id,
            fragments: fragments.boxed(),
        })
    }
}
