//! Response bodies of the control endpoints.

use hirewatch_core::monitor::MonitorConfig;
use serde::Serialize;

use crate::control::StartAck;

/// `{ "message": ... }`
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Body of an accepted `POST /start`.
#[derive(Debug, Serialize)]
pub struct StartResponse {
    pub message: String,
    pub config: MonitorConfig,
}

impl From<StartAck> for StartResponse {
    fn from(ack: StartAck) -> Self {
        Self {
            message: ack.message,
            config: ack.config,
        }
    }
}

/// Body of `GET /status`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub is_running: bool,
}
