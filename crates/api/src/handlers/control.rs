//! Handlers for `/start`, `/stop`, `/status` and the root banner.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::response::{MessageResponse, StartResponse, StatusResponse};
use crate::state::AppState;

/// Plain-text body of `GET /`.
pub const BANNER: &str = "Hirewatch control server is running";

/// Body of `POST /start`. Missing lists count as empty.
#[derive(Debug, Default, Deserialize)]
pub struct StartRequest {
    #[serde(default)]
    pub links: Vec<String>,
    #[serde(default)]
    pub positions: Vec<String>,
}

/// POST /start
pub async fn start(
    State(state): State<AppState>,
    body: Result<Json<StartRequest>, JsonRejection>,
) -> AppResult<Json<StartResponse>> {
    let Json(input) = body.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let ack = state.control.start(&input.links, &input.positions).await?;
    Ok(Json(ack.into()))
}

/// POST /stop
pub async fn stop(State(state): State<AppState>) -> AppResult<Json<MessageResponse>> {
    let message = state.control.stop().await?;
    Ok(Json(MessageResponse { message }))
}

/// GET /status
pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        is_running: state.control.status(),
    })
}

/// GET /
pub async fn banner() -> &'static str {
    BANNER
}
