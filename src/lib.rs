//! # regseek - Regulatory Guidance RAG Server
//!
//! A retrieval-augmented question answering server for a corpus of
//! regulatory guidance PDFs. Documents are ingested into token-bounded,
//! overlapping passages with page provenance; questions are answered by
//! embedding-similarity retrieval over pgvector, citation-tagged context
//! assembly, and a generation provider, with session-scoped chat history.
//!
//! ## Overview
//!
//! regseek can be used in two ways:
//!
//! 1. **As a standalone server** - Run the `regseek-server` binary
//! 2. **As a library** - Import the pipeline components into your own project
//!
//! ## Architecture
//!
//! External collaborators are consumed through capability traits so tests
//! can substitute fakes without process-wide state:
//!
//! - [`extract::TextExtractor`] - source locator → per-page text
//! - [`rag::embeddings::EmbeddingProvider`] - text → fixed-length vector
//! - [`llm::GenerationProvider`] - prompt + history → text, whole or streamed
//! - [`db::PassageStore`] / [`db::SessionStore`] - the relational store
//!
//! Ingestion flow: extractor → chunker → embeddings → passage store (full
//! per-document replacement). Query flow: retrieval → context assembly →
//! history → generation → session persistence.
//!
//! ## Modules
//!
//! - [`api`] - REST API handlers and routes
//! - [`db`] - Store traits and the Postgres/pgvector implementation
//! - [`extract`] - Document text extraction
//! - [`ingest`] - Ingestion pipeline and supervised background dispatch
//! - [`llm`] - Generation provider clients
//! - [`rag`] - Chunking, embeddings, retrieval, context, query pipeline
//! - [`types`] - Common types and error handling
//! - [`utils`] - Configuration

/// HTTP API handlers and routes.
pub mod api;
/// Store traits and the Postgres/pgvector implementation.
pub mod db;
/// Document text extraction.
pub mod extract;
/// Ingestion pipeline and supervised background dispatch.
pub mod ingest;
/// Generation provider clients and abstractions.
pub mod llm;
/// Retrieval Augmented Generation components.
pub mod rag;
/// Core types (requests, responses, errors).
pub mod types;
/// Configuration utilities.
pub mod utils;

// Re-export commonly used types
pub use db::{PassageStore, PgStore, SessionStore};
pub use extract::{PdfExtractor, TextExtractor};
pub use ingest::{IngestTracker, Ingestor};
pub use llm::{AnthropicClient, GenerationProvider};
pub use rag::chunker::TokenChunker;
pub use rag::embeddings::{EmbeddingProvider, OpenAiEmbedder};
pub use rag::pipeline::RagPipeline;
pub use rag::retrieval::RetrievalEngine;
pub use types::{AppError, Result};
pub use utils::config::Config;

use std::sync::Arc;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub passages: Arc<dyn PassageStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub ingestor: Arc<Ingestor>,
    pub pipeline: Arc<RagPipeline>,
}
