use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

/// GET / — liveness check.
pub async fn index() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}
