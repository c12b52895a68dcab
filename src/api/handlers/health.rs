use axum::Json;

pub async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "service": "regseek",
        "status": "running"
    }))
}

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "healthy" }))
}
