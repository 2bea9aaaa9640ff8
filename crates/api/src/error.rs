use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use hirewatch_core::error::CoreError;
use hirewatch_worker::WorkerError;
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and [`WorkerError`] for failures
/// launching the scraper. Implements [`IntoResponse`] so every rejection has
/// the same JSON shape:
///
/// - client errors: `{ "message": ..., "code": ... }`
/// - server errors: `{ "message": ..., "error": ... }`
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `hirewatch_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The worker refused a command or could not be spawned.
    #[error(transparent)]
    Worker(#[from] WorkerError),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::InvalidInput(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                CoreError::AlreadyRunning => (
                    StatusCode::BAD_REQUEST,
                    "ALREADY_RUNNING",
                    core.to_string(),
                ),
                CoreError::NotRunning => {
                    (StatusCode::BAD_REQUEST, "NOT_RUNNING", core.to_string())
                }
            },

            // --- Worker errors ---
            AppError::Worker(WorkerError::AlreadyRunning) => (
                StatusCode::BAD_REQUEST,
                "ALREADY_RUNNING",
                CoreError::AlreadyRunning.to_string(),
            ),
            AppError::Worker(WorkerError::NotRunning) => (
                StatusCode::BAD_REQUEST,
                "NOT_RUNNING",
                CoreError::NotRunning.to_string(),
            ),
            AppError::Worker(err @ WorkerError::Spawn(_)) => {
                tracing::error!(error = %err, "Failed to start worker");
                let body = json!({
                    "message": "Failed to start monitoring",
                    "error": err.to_string(),
                });
                return (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(body)).into_response();
            }

            // --- HTTP-specific errors ---
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
        };

        let body = json!({
            "message": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}
