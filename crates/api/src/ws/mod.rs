//! Event broadcast channel: the `/ws` log stream.
//!
//! Provides subscriber management, the liveness check, the relay from the
//! log bus and the HTTP upgrade handler used by Axum routes.

mod handler;
mod heartbeat;
pub mod manager;
pub mod relay;

pub use handler::ws_handler;
pub use heartbeat::{start_liveness_check, start_liveness_check_every};
pub use manager::{DeliveryError, WsManager};
pub use relay::LogRelay;
