//! Document ingestion: extract, chunk, embed, store.
//!
//! Each document is one unit of work. Background units are supervised
//! through [`IngestTracker`], which records per-document outcomes so the
//! status endpoints can report failures instead of losing them to a log
//! line. Units for different documents run concurrently; the store's
//! per-document replace transaction keeps their writes from mixing.

use crate::db::{NewPassage, PassageStore};
use crate::extract::TextExtractor;
use crate::rag::chunker::TokenChunker;
use crate::rag::embeddings::EmbeddingProvider;
use crate::types::{
    BatchIngestDocumentResult, BatchIngestResponse, BatchIngestSummary, Result,
};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// Outcome of the most recent ingestion unit for a document.
#[derive(Debug, Clone)]
pub enum IngestOutcome {
    Running,
    Completed { chunks: usize },
    Failed { error: String },
}

/// In-process record of background ingestion outcomes.
#[derive(Default)]
pub struct IngestTracker {
    inner: RwLock<HashMap<Uuid, IngestOutcome>>,
}

impl IngestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, document_id: Uuid, outcome: IngestOutcome) {
        self.inner.write().insert(document_id, outcome);
    }

    pub fn get(&self, document_id: Uuid) -> Option<IngestOutcome> {
        self.inner.read().get(&document_id).cloned()
    }

    /// Failure message from the most recent unit, if it failed.
    pub fn last_error(&self, document_id: Uuid) -> Option<String> {
        match self.inner.read().get(&document_id) {
            Some(IngestOutcome::Failed { error }) => Some(error.clone()),
            _ => None,
        }
    }
}

#[derive(Clone)]
pub struct Ingestor {
    extractor: Arc<dyn TextExtractor>,
    chunker: Arc<TokenChunker>,
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn PassageStore>,
    tracker: Arc<IngestTracker>,
}

impl Ingestor {
    pub fn new(
        extractor: Arc<dyn TextExtractor>,
        chunker: Arc<TokenChunker>,
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn PassageStore>,
        tracker: Arc<IngestTracker>,
    ) -> Self {
        Self {
            extractor,
            chunker,
            embedder,
            store,
            tracker,
        }
    }

    pub fn tracker(&self) -> &Arc<IngestTracker> {
        &self.tracker
    }

    /// Run one ingestion unit to completion: extract page text, chunk,
    /// embed, and atomically replace the document's stored passages.
    /// Returns the number of passages stored.
    ///
    /// A source with no extractable text ends the unit with zero passages
    /// and leaves any previously stored passages untouched.
    pub async fn ingest_document(&self, document_id: Uuid, source: &str) -> Result<usize> {
        let start = Instant::now();

        let pages = self.extractor.extract(source).await?;
        if pages.is_empty() {
            tracing::warn!(%document_id, source, "No text extracted from document");
            return Ok(0);
        }

        let drafts = self.chunker.chunk_pages(&pages)?;
        if drafts.is_empty() {
            tracing::warn!(%document_id, "Document chunked to zero passages");
            return Ok(0);
        }

        let texts: Vec<String> = drafts.iter().map(|d| d.content.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;

        let passages: Vec<NewPassage> = drafts
            .into_iter()
            .zip(embeddings)
            .map(|(draft, embedding)| NewPassage {
                content: draft.content,
                page_start: draft.page_start,
                section_title: draft.section_title,
                chunk_index: draft.chunk_index,
                token_count: draft.token_count,
                embedding,
            })
            .collect();

        let count = self
            .store
            .replace_document_passages(document_id, &passages)
            .await?;

        tracing::info!(
            %document_id,
            pages = pages.len(),
            chunks = count,
            duration_ms = start.elapsed().as_millis() as u64,
            "Document ingested"
        );
        Ok(count)
    }

    /// Dispatch one background ingestion unit. The outcome lands in the
    /// tracker; the caller gets an immediate acknowledgment.
    pub fn spawn_ingest(&self, document_id: Uuid, source: String) {
        self.tracker.record(document_id, IngestOutcome::Running);
        let ingestor = self.clone();
        tokio::spawn(async move {
            match ingestor.ingest_document(document_id, &source).await {
                Ok(chunks) => {
                    ingestor
                        .tracker
                        .record(document_id, IngestOutcome::Completed { chunks });
                }
                Err(e) => {
                    tracing::error!(%document_id, error = %e, "Ingestion failed");
                    ingestor.tracker.record(
                        document_id,
                        IngestOutcome::Failed {
                            error: e.to_string(),
                        },
                    );
                }
            }
        });
    }

    /// Queue a background unit for every pending document (source locator
    /// present, zero stored passages). Returns the number queued.
    pub async fn ingest_pending(&self) -> Result<usize> {
        let pending = self.store.list_pending_documents().await?;
        for doc in &pending {
            self.spawn_ingest(doc.id, doc.source_url.clone());
        }
        Ok(pending.len())
    }

    /// Ingest every pending document sequentially, waiting for completion.
    /// One document's failure is recorded and does not abort the rest.
    pub async fn ingest_pending_sync(&self) -> Result<BatchIngestResponse> {
        let pending = self.store.list_pending_documents().await?;
        let mut results = Vec::with_capacity(pending.len());

        for (i, doc) in pending.iter().enumerate() {
            tracing::info!(
                document_id = %doc.id,
                progress = format!("{}/{}", i + 1, pending.len()),
                "Processing document"
            );
            match self.ingest_document(doc.id, &doc.source_url).await {
                Ok(_) => {
                    let chunks_count = self.store.count_passages(doc.id).await?;
                    results.push(BatchIngestDocumentResult {
                        document_id: doc.id,
                        title: doc.title.clone(),
                        status: "completed".to_string(),
                        chunks_count,
                        error: None,
                    });
                }
                Err(e) => {
                    results.push(BatchIngestDocumentResult {
                        document_id: doc.id,
                        title: doc.title.clone(),
                        status: "failed".to_string(),
                        chunks_count: 0,
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        let completed = results.iter().filter(|r| r.status == "completed").count();
        let failed = results.len() - completed;

        Ok(BatchIngestResponse {
            summary: BatchIngestSummary {
                processed: results.len(),
                completed,
                failed,
            },
            results,
        })
    }
}
