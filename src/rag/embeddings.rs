//! Embedding provider gateway.
//!
//! Passage and query text is turned into fixed-length vectors through the
//! [`EmbeddingProvider`] trait. The default implementation talks to an
//! OpenAI-compatible `/embeddings` endpoint.

use crate::types::{AppError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Capability trait for producing embedding vectors.
///
/// Vectors are meaningful only relative to one another; callers never
/// construct them by hand.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a batch of texts. The result is parallel to the input.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single text.
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| AppError::Provider("Embedding provider returned no vector".to_string()))
    }

    /// Configured vector dimensionality.
    fn dimensions(&self) -> usize;
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
    dimensions: usize,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingItem {
    index: usize,
    embedding: Vec<f32>,
}

/// OpenAI-compatible embeddings client.
pub struct OpenAiEmbedder {
    http: reqwest::Client,
    api_key: String,
    api_base: String,
    model: String,
    dimensions: usize,
}

impl OpenAiEmbedder {
    pub fn new(api_key: String, api_base: String, model: String, dimensions: usize) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            api_base,
            model,
            dimensions,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = EmbeddingRequest {
            model: &self.model,
            input: texts,
            dimensions: self.dimensions,
        };

        let response = self
            .http
            .post(format!("{}/embeddings", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Provider(format!("Embedding request failed: {}", e)))?
            .error_for_status()
            .map_err(|e| AppError::Provider(format!("Embedding provider error: {}", e)))?;

        let body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| AppError::Provider(format!("Invalid embedding response: {}", e)))?;

        if body.data.len() != texts.len() {
            return Err(AppError::Provider(format!(
                "Embedding provider returned {} vectors for {} inputs",
                body.data.len(),
                texts.len()
            )));
        }

        // The API documents index-annotated items; order by index rather
        // than trusting response order.
        let mut items = body.data;
        items.sort_by_key(|item| item.index);
        Ok(items.into_iter().map(|item| item.embedding).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
