//! REST client for the control endpoints.
//!
//! Wraps `POST /start`, `POST /stop` and `GET /status` using [`reqwest`],
//! each with its own request timeout.

use std::time::Duration;

use hirewatch_core::monitor::MonitorConfig;
use serde::{Deserialize, Serialize};

/// Timeout for `GET /status`.
pub const STATUS_TIMEOUT: Duration = Duration::from_secs(5);
/// Timeout for `POST /start` and `POST /stop`.
pub const COMMAND_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors from the control API layer.
#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    /// The server did not answer within the request timeout.
    #[error("{operation} request timed out after {}s", .after.as_secs())]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    /// The server answered with a non-2xx status.
    #[error("{message}")]
    Rejected { status: u16, message: String },

    /// A 2xx answer whose body does not match the expected shape.
    #[error("Malformed {operation} response: {source}")]
    Decode {
        operation: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// The HTTP request itself failed (connection refused, DNS, TLS, ...).
    #[error("HTTP request failed: {0}")]
    Transport(#[source] reqwest::Error),
}

/// Body of an accepted start request.
#[derive(Debug, Clone, Deserialize)]
pub struct StartReply {
    pub message: String,
    pub config: MonitorConfig,
}

#[derive(Debug, Deserialize)]
struct MessageReply {
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusReply {
    is_running: bool,
}

#[derive(Debug, Serialize)]
struct StartBody<'a> {
    links: &'a [String],
    positions: &'a [String],
}

/// HTTP client for one control server.
#[derive(Debug, Clone)]
pub struct ControlClient {
    client: reqwest::Client,
    base_url: String,
}

impl ControlClient {
    /// * `base_url` - e.g. `http://localhost:3000`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Ask the server to start monitoring.
    pub async fn start(
        &self,
        links: &[String],
        positions: &[String],
    ) -> Result<StartReply, ControlError> {
        let request = self
            .client
            .post(format!("{}/start", self.base_url))
            .json(&StartBody { links, positions })
            .timeout(COMMAND_TIMEOUT);

        let response = send(request, "start", COMMAND_TIMEOUT).await?;
        parse(response, "start", COMMAND_TIMEOUT).await
    }

    /// Ask the server to stop monitoring. Returns the server's message.
    pub async fn stop(&self) -> Result<String, ControlError> {
        let request = self
            .client
            .post(format!("{}/stop", self.base_url))
            .timeout(COMMAND_TIMEOUT);

        let response = send(request, "stop", COMMAND_TIMEOUT).await?;
        let reply: MessageReply = parse(response, "stop", COMMAND_TIMEOUT).await?;
        Ok(reply.message)
    }

    /// Fetch the running flag.
    pub async fn status(&self) -> Result<bool, ControlError> {
        let request = self
            .client
            .get(format!("{}/status", self.base_url))
            .timeout(STATUS_TIMEOUT);

        let response = send(request, "status", STATUS_TIMEOUT).await?;
        let reply: StatusReply = parse(response, "status", STATUS_TIMEOUT).await?;
        Ok(reply.is_running)
    }
}

// ---- private helpers ----

fn classify(err: reqwest::Error, operation: &'static str, after: Duration) -> ControlError {
    if err.is_timeout() {
        ControlError::Timeout { operation, after }
    } else {
        ControlError::Transport(err)
    }
}

/// Send `request`; a non-2xx answer becomes [`ControlError::Rejected`] with
/// the server's `message` (or the raw body if it has none).
async fn send(
    request: reqwest::RequestBuilder,
    operation: &'static str,
    after: Duration,
) -> Result<reqwest::Response, ControlError> {
    let response = request
        .send()
        .await
        .map_err(|e| classify(e, operation, after))?;

    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .map_err(|e| classify(e, operation, after))?;
    let message = serde_json::from_str::<MessageReply>(&body)
        .map(|reply| reply.message)
        .unwrap_or(body);

    Err(ControlError::Rejected {
        status: status.as_u16(),
        message,
    })
}

async fn parse<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
    operation: &'static str,
    after: Duration,
) -> Result<T, ControlError> {
    response.json().await.map_err(|e| {
        if e.is_decode() {
            ControlError::Decode {
                operation,
                source: e,
            }
        } else {
            classify(e, operation, after)
        }
    })
}
