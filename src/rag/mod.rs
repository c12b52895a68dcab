//! Retrieval Augmented Generation pipeline.
//!
//! # Module Structure
//!
//! - [`chunker`] - Token-bounded chunking with overlap and page provenance
//! - [`embeddings`] - Embedding provider gateway
//! - [`retrieval`] - Nearest-neighbor passage retrieval
//! - [`context`] - Citation-tagged context assembly
//! - [`pipeline`] - Query orchestration, synchronous and streaming
//!
//! # Pipeline flow
//!
//! Ingestion: extractor → chunker → embeddings → passage store (full
//! replacement per document). Query: embed question → nearest-neighbor
//! search → context block → generation provider → session persistence.

pub mod chunker;
pub mod context;
pub mod embeddings;
pub mod pipeline;
pub mod retrieval;
