//! Health endpoint pinging the queue's backing connection.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value as JsonValue};

use mentora_core::JobRepository;

use crate::AppState;

/// `GET /api/v1/health/queue`
///
/// 200 with `"connected"` when the backing store answers, 503 with the
/// connectivity error otherwise — callers degrade instead of hanging.
pub async fn queue_health(
    State(state): State<AppState>,
) -> (StatusCode, Json<JsonValue>) {
    match state.db.jobs.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "connected",
                "backend": "postgres",
                "timestamp": chrono::Utc::now(),
            })),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "disconnected",
                "error": e.to_string(),
                "timestamp": chrono::Utc::now(),
            })),
        ),
    }
}
