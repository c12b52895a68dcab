//! HTTP API handlers and routes, built on Axum.
//!
//! # Endpoints
//!
//! ## Ingestion (`/ingest`)
//! - `POST /ingest/document` - Queue background ingestion for one document
//! - `POST /ingest/all` - Queue every pending document
//! - `POST /ingest/all/sync` - Ingest pending documents, waiting for completion
//! - `GET /ingest/status` - Corpus-wide ingestion status
//! - `GET /ingest/status/{document_id}` - Per-document ingestion status
//!
//! ## Query (`/query`)
//! - `POST /query` - Ask a question, receive the full answer with sources
//! - `POST /query/stream` - Same, delivered as a server-sent event stream
//! - `GET /query/sessions/{session_id}` - Chat history for a session
//!
//! ## Health
//! - `GET /` - Service banner
//! - `GET /health` - Health check

/// Request and response handlers for all API endpoints.
pub mod handlers;
/// Router configuration and route definitions.
pub mod routes;
