//! Nearest-neighbor passage retrieval.

use crate::db::PassageStore;
use crate::rag::embeddings::EmbeddingProvider;
use crate::types::{AppError, Result, Source};
use std::sync::Arc;
use uuid::Uuid;

/// Characters of passage content included in a source preview.
const PREVIEW_CHARS: usize = 200;

/// A ranked retrieval hit with document provenance. Transient: lives only
/// within one query.
#[derive(Debug, Clone)]
pub struct RetrievedPassage {
    pub document_id: Uuid,
    pub content: String,
    pub page_start: Option<i32>,
    pub section_title: Option<String>,
    pub chunk_index: i32,
    pub title: String,
    pub external_id: String,
    /// `1 − cosine distance`: 1.0 for identical direction, 0.0 for
    /// orthogonal, negative for opposed vectors. Not clamped to [0, 1].
    pub similarity: f64,
}

impl RetrievedPassage {
    /// Provenance entry for the API response, with content truncated to a
    /// preview.
    pub fn to_source(&self) -> Source {
        let preview = if self.content.chars().count() > PREVIEW_CHARS {
            let truncated: String = self.content.chars().take(PREVIEW_CHARS).collect();
            format!("{}...", truncated)
        } else {
            self.content.clone()
        };

        Source {
            document_id: self.document_id,
            title: self.title.clone(),
            external_id: self.external_id.clone(),
            page: self.page_start,
            content_preview: preview,
            similarity: self.similarity,
        }
    }
}

/// Embeds a query and ranks stored passages against it.
pub struct RetrievalEngine {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn PassageStore>,
}

impl RetrievalEngine {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, store: Arc<dyn PassageStore>) -> Self {
        Self { embedder, store }
    }

    /// Return up to `k` passages ranked by descending similarity, optionally
    /// scoped to one document. An empty result is Ok, not an error; ordering
    /// comes straight from the store with no re-ranking.
    pub async fn search(
        &self,
        query: &str,
        scope: Option<Uuid>,
        k: usize,
    ) -> Result<Vec<RetrievedPassage>> {
        if k == 0 {
            return Err(AppError::InvalidInput(
                "top_k must be positive".to_string(),
            ));
        }

        let query_vector = self.embedder.embed_text(query).await?;
        let hits = self.store.find_nearest(&query_vector, scope, k).await?;

        Ok(hits
            .into_iter()
            .map(|hit| RetrievedPassage {
                document_id: hit.document_id,
                content: hit.content,
                page_start: hit.page_start,
                section_title: hit.section_title,
                chunk_index: hit.chunk_index,
                title: hit.title,
                external_id: hit.external_id,
                similarity: 1.0 - hit.distance,
            })
            .collect())
    }
}
