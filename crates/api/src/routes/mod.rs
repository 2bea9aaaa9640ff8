pub mod health;

use axum::routing::{get, post};
use axum::Router;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the route tree.
///
/// ```text
/// /           liveness banner (GET)
/// /start      start monitoring (POST)
/// /stop       stop monitoring (POST)
/// /status     running flag (GET)
/// /ws         log stream (WebSocket)
/// ```
pub fn control_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::control::banner))
        .route("/start", post(handlers::control::start))
        .route("/stop", post(handlers::control::stop))
        .route("/status", get(handlers::control::status))
        .route("/ws", get(ws::ws_handler))
}
