//! # mentora-api
//!
//! HTTP surface for mentora: queue operations, health, and the dispatch
//! hooks that enqueue background jobs as a side effect of user actions.

pub mod handlers;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde_json::json;

use mentora_db::Database;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
}

/// Build the API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/api/v1/queue/status", get(handlers::queue::queue_status))
        .route("/api/v1/queue/jobs", get(handlers::queue::list_jobs))
        .route("/api/v1/queue/clear", post(handlers::queue::clear_queue))
        .route(
            "/api/v1/queue/job/:job_id",
            delete(handlers::queue::delete_job),
        )
        .route("/api/v1/health/queue", get(handlers::health::queue_health))
        .route(
            "/api/v1/chapters/:chapter_id/generate",
            post(handlers::dispatch::generate_chapter),
        )
        .route(
            "/api/v1/chapters/:chapter_id/proof",
            post(handlers::dispatch::submit_proof),
        )
        .with_state(state)
}

async fn root() -> Json<serde_json::Value> {
    Json(json!({ "message": "Welcome to the Mentora API" }))
}

/// Error wrapper mapping core errors onto HTTP responses.
#[derive(Debug)]
pub struct ApiError(pub mentora_core::Error);

impl From<mentora_core::Error> for ApiError {
    fn from(e: mentora_core::Error) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        use mentora_core::Error;

        let status = match &self.0 {
            Error::NotFound(_) | Error::ChapterNotFound(_) | Error::JobNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
            // Connectivity failures surface as service-unavailable so
            // callers can degrade instead of treating them as bugs.
            Error::Database(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "status": "error",
            "message": self.0.to_string(),
        }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_404() {
        let resp =
            ApiError(mentora_core::Error::NotFound("job".into())).into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn connectivity_maps_to_503() {
        let resp =
            ApiError(mentora_core::Error::Database(sqlx::Error::PoolClosed)).into_response();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn invalid_input_maps_to_400() {
        let resp =
            ApiError(mentora_core::Error::InvalidInput("bad state".into())).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
