//! Document text extraction.
//!
//! The ingestion pipeline consumes extraction through the [`TextExtractor`]
//! trait: a source locator goes in, per-page plain text comes out. The
//! default implementation fetches a PDF over HTTP and extracts text with
//! `pdf-extract`. Tests substitute a fake extractor instead of shipping
//! fixture PDFs.

use crate::types::{AppError, Result};
use async_trait::async_trait;

/// One page of extracted text. Ephemeral: pages are chunked immediately and
/// never persisted.
#[derive(Debug, Clone)]
pub struct Page {
    /// 1-based page number.
    pub number: i32,
    pub text: String,
}

/// Capability trait for turning a source locator into per-page text.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Extract text from the document at `source`. Pages whose text is empty
    /// after trimming are dropped; the result may be empty for scanned or
    /// image-only documents.
    async fn extract(&self, source: &str) -> Result<Vec<Page>>;
}

/// Fetches PDFs over HTTP and extracts page text.
pub struct PdfExtractor {
    http: reqwest::Client,
}

impl PdfExtractor {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }
}

impl Default for PdfExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TextExtractor for PdfExtractor {
    async fn extract(&self, source: &str) -> Result<Vec<Page>> {
        let response = self
            .http
            .get(source)
            .send()
            .await
            .map_err(|e| AppError::Extraction(format!("Failed to fetch {}: {}", source, e)))?
            .error_for_status()
            .map_err(|e| AppError::Extraction(format!("Failed to fetch {}: {}", source, e)))?;

        let bytes = response
            .bytes()
            .await
            .map_err(|e| AppError::Extraction(format!("Failed to read {}: {}", source, e)))?;

        // pdf-extract is CPU-bound; keep it off the async workers.
        let pages = tokio::task::spawn_blocking(move || {
            pdf_extract::extract_text_from_mem_by_pages(&bytes)
        })
        .await
        .map_err(|e| AppError::Internal(format!("Extraction task panicked: {}", e)))?
        .map_err(|e| AppError::Extraction(format!("PDF extraction failed: {}", e)))?;

        Ok(pages
            .into_iter()
            .enumerate()
            .filter_map(|(i, text)| {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(Page {
                        number: i as i32 + 1,
                        text: trimmed.to_string(),
                    })
                }
            })
            .collect())
    }
}
