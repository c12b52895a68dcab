use crate::types::{ChatTurn, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// A fully-prepared passage ready for insertion: chunked, counted, embedded.
#[derive(Debug, Clone)]
pub struct NewPassage {
    pub content: String,
    pub page_start: Option<i32>,
    pub section_title: Option<String>,
    pub chunk_index: i32,
    pub token_count: i32,
    pub embedding: Vec<f32>,
}

/// A nearest-neighbor hit joined with its owning document's metadata.
#[derive(Debug, Clone)]
pub struct PassageHit {
    pub document_id: Uuid,
    pub content: String,
    pub page_start: Option<i32>,
    pub section_title: Option<String>,
    pub chunk_index: i32,
    pub title: String,
    pub external_id: String,
    /// Cosine distance to the query vector (smaller is closer).
    pub distance: f64,
}

/// A document with a source locator but no stored passages yet.
#[derive(Debug, Clone)]
pub struct PendingDocument {
    pub id: Uuid,
    pub title: String,
    pub source_url: String,
}

#[derive(Debug, Clone)]
pub struct IngestionStatusRow {
    pub document_id: Uuid,
    pub title: String,
    pub external_id: String,
    pub chunks_count: i64,
}

#[derive(Debug, Clone)]
pub struct StoredMessage {
    pub id: Uuid,
    pub role: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Storage for passages and their embeddings.
#[async_trait]
pub trait PassageStore: Send + Sync {
    /// Atomically delete every passage for `document_id` and insert the new
    /// set. A reader never observes a mix of old and new passages; a failure
    /// mid-insert rolls the delete back too. Returns the number inserted.
    async fn replace_document_passages(
        &self,
        document_id: Uuid,
        passages: &[NewPassage],
    ) -> Result<usize>;

    /// Up to `k` passages with non-null embeddings, ranked by ascending
    /// distance to `query`, optionally restricted to one document.
    async fn find_nearest(
        &self,
        query: &[f32],
        scope: Option<Uuid>,
        k: usize,
    ) -> Result<Vec<PassageHit>>;

    async fn count_passages(&self, document_id: Uuid) -> Result<i64>;

    /// Per-document passage counts for status reporting, corpus-wide.
    async fn list_ingestion_status(&self) -> Result<Vec<IngestionStatusRow>>;

    async fn document_exists(&self, document_id: Uuid) -> Result<bool>;

    /// Documents with a source locator and zero stored passages.
    async fn list_pending_documents(&self) -> Result<Vec<PendingDocument>>;
}

/// Storage for chat sessions and their append-only message history.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Oldest-first history, truncated to the *first* `limit` messages.
    /// This matches the long-standing windowing behavior; it bounds early
    /// context rather than sliding a recent-context window.
    async fn load_history(&self, session_id: Uuid, limit: i64) -> Result<Vec<ChatTurn>>;

    /// Create the session if absent and append the user question and
    /// assistant answer, in that order, with strictly increasing timestamps.
    /// All three writes share one transaction.
    async fn append_exchange(&self, session_id: Uuid, question: &str, answer: &str) -> Result<()>;

    /// Full ordered message list for a session.
    async fn session_messages(&self, session_id: Uuid) -> Result<Vec<StoredMessage>>;
}
