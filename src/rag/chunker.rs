//! Token-bounded document chunking.
//!
//! Splits extracted page text into overlapping passages measured in
//! cl100k_base tokens, the same vocabulary the embedding provider tokenizes
//! with. Chunking is deterministic: identical input, size, and overlap always
//! produce byte-identical passages and ordinals, which is what makes
//! re-ingestion idempotent.

use crate::extract::Page;
use crate::types::{AppError, Result};
use tiktoken_rs::CoreBPE;

/// An unpersisted passage produced by chunking, before embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct PassageDraft {
    pub content: String,
    pub page_start: Option<i32>,
    pub section_title: Option<String>,
    /// Dense zero-based ordinal across the whole document, in page order.
    pub chunk_index: i32,
    pub token_count: i32,
}

pub struct TokenChunker {
    chunk_size: usize,
    chunk_overlap: usize,
    bpe: CoreBPE,
}

impl TokenChunker {
    /// Fails when `chunk_overlap >= chunk_size`: the stride would be
    /// non-positive and the window would never advance.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(AppError::InvalidInput(
                "chunk_size must be positive".to_string(),
            ));
        }
        if chunk_overlap >= chunk_size {
            return Err(AppError::InvalidInput(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                chunk_overlap, chunk_size
            )));
        }
        let bpe = tiktoken_rs::cl100k_base()
            .map_err(|e| AppError::Internal(format!("Failed to load tokenizer: {}", e)))?;
        Ok(Self {
            chunk_size,
            chunk_overlap,
            bpe,
        })
    }

    /// Chunk one page's text, assigning ordinals starting at `next_index`.
    fn chunk_page(&self, page: &Page, next_index: &mut i32) -> Result<Vec<PassageDraft>> {
        let text = page.text.trim();
        if text.is_empty() {
            return Ok(Vec::new());
        }

        let tokens = self.bpe.encode_ordinary(text);
        let stride = self.chunk_size - self.chunk_overlap;
        let mut drafts = Vec::new();

        let mut i = 0;
        while i < tokens.len() {
            let end = (i + self.chunk_size).min(tokens.len());
            let window = tokens[i..end].to_vec();
            let token_count = window.len() as i32;
            let content = self
                .bpe
                .decode(window)
                .map_err(|e| AppError::Internal(format!("Token decode failed: {}", e)))?;

            drafts.push(PassageDraft {
                content,
                page_start: Some(page.number),
                section_title: None,
                chunk_index: *next_index,
                token_count,
            });
            *next_index += 1;
            i += stride;
        }

        Ok(drafts)
    }

    /// Chunk an entire document. Ordinals are assigned globally and
    /// monotonically across pages, not reset per page; pages with no text
    /// after trimming contribute nothing.
    pub fn chunk_pages(&self, pages: &[Page]) -> Result<Vec<PassageDraft>> {
        let mut all = Vec::new();
        let mut next_index = 0;
        for page in pages {
            all.extend(self.chunk_page(page, &mut next_index)?);
        }
        Ok(all)
    }
}
