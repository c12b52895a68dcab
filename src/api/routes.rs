use crate::AppState;
use axum::{
    routing::{get, post},
    Router,
};

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/", get(crate::api::handlers::health::root))
        .route("/health", get(crate::api::handlers::health::health))
        // Ingestion routes
        .route(
            "/ingest/document",
            post(crate::api::handlers::ingest::ingest_document),
        )
        .route("/ingest/all", post(crate::api::handlers::ingest::ingest_all))
        .route(
            "/ingest/all/sync",
            post(crate::api::handlers::ingest::ingest_all_sync),
        )
        .route(
            "/ingest/status",
            get(crate::api::handlers::ingest::ingest_status_all),
        )
        .route(
            "/ingest/status/{document_id}",
            get(crate::api::handlers::ingest::ingest_status),
        )
        // Query routes
        .route("/query", post(crate::api::handlers::query::query))
        .route(
            "/query/stream",
            post(crate::api::handlers::query::query_stream),
        )
        .route(
            "/query/sessions/{session_id}",
            get(crate::api::handlers::query::session_history),
        )
}
