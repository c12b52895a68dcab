use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

// ============= API Request/Response Types =============

fn default_top_k() -> usize {
    5
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct QueryRequest {
    pub question: String,
    /// Restrict retrieval to a single document.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_id: Option<Uuid>,
    /// Continue an existing chat session; a new one is minted when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<Uuid>,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct QueryResponse {
    pub answer: String,
    pub sources: Vec<Source>,
    pub session_id: Uuid,
}

/// Provenance entry for one retrieved passage, ordered to match the
/// `[Source N]` citations in the generated answer.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Source {
    pub document_id: Uuid,
    pub title: String,
    pub external_id: String,
    pub page: Option<i32>,
    pub content_preview: String,
    pub similarity: f64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct IngestRequest {
    pub document_id: Uuid,
    /// Source locator for the document's PDF (URL).
    pub source_url: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct IngestResponse {
    pub document_id: Uuid,
    pub chunks_created: usize,
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct IngestAllResponse {
    pub status: String,
    pub documents_queued: usize,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BatchIngestSummary {
    pub processed: usize,
    pub completed: usize,
    pub failed: usize,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BatchIngestDocumentResult {
    pub document_id: Uuid,
    pub title: String,
    pub status: String,
    pub chunks_count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BatchIngestResponse {
    pub summary: BatchIngestSummary,
    pub results: Vec<BatchIngestDocumentResult>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DocumentStatusResponse {
    pub document_id: Uuid,
    pub chunks_count: i64,
    /// `completed` iff at least one passage is stored, otherwise `pending`.
    pub status: String,
    /// Failure message from the most recent background ingestion, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CorpusStatusSummary {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CorpusStatusRow {
    pub document_id: Uuid,
    pub title: String,
    pub external_id: String,
    pub chunks_count: i64,
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CorpusStatusResponse {
    pub summary: CorpusStatusSummary,
    pub documents: Vec<CorpusStatusRow>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SessionMessage {
    pub id: Uuid,
    pub role: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SessionHistoryResponse {
    pub session_id: Uuid,
    pub messages: Vec<SessionMessage>,
}

// ============= Chat Types =============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

impl std::str::FromStr for MessageRole {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "user" => Ok(MessageRole::User),
            "assistant" => Ok(MessageRole::Assistant),
            other => Err(AppError::Internal(format!(
                "Unknown message role: {}",
                other
            ))),
        }
    }
}

/// One prior turn of a conversation, role-tagged, oldest first.
pub type ChatTurn = (MessageRole, String);

// ============= Error Types =============

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Extraction error: {0}")]
    Extraction(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::Database(e.to_string())
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            AppError::Database(msg) => (axum::http::StatusCode::INTERNAL_SERVER_ERROR, msg),
            AppError::Provider(msg) => (axum::http::StatusCode::BAD_GATEWAY, msg),
            AppError::Extraction(msg) => (axum::http::StatusCode::UNPROCESSABLE_ENTITY, msg),
            AppError::NotFound(msg) => (axum::http::StatusCode::NOT_FOUND, msg),
            AppError::InvalidInput(msg) => (axum::http::StatusCode::BAD_REQUEST, msg),
            AppError::Internal(msg) => (axum::http::StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = serde_json::json!({
            "error": message
        });

        (status, axum::Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
