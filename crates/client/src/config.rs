use std::time::Duration;

use hirewatch_core::protocol::HEARTBEAT_INTERVAL;
use hirewatch_core::validation::DEFAULT_HIRING_SITE_PREFIX;

/// A configuration value that could not be parsed.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} must be a valid {expected}, got {value:?}")]
    Invalid {
        var: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Client configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base HTTP URL of the control server, without trailing slash.
    pub server_url: String,
    /// How often the running flag is refreshed while connected.
    pub status_poll_interval: Duration,
    /// Prefix the form requires on every job link.
    pub hiring_site_prefix: String,
    /// How often a heartbeat frame is sent while connected.
    pub heartbeat_interval: Duration,
}

impl ClientConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                     | Default                 |
    /// |-----------------------------|-------------------------|
    /// | `HIREWATCH_SERVER_URL`      | `http://localhost:3000` |
    /// | `STATUS_POLL_INTERVAL_SECS` | `5`                     |
    /// | `HIRING_SITE_PREFIX`        | `https://hiring.amazon` |
    pub fn from_env() -> Result<Self, ConfigError> {
        let server_url = std::env::var("HIREWATCH_SERVER_URL")
            .unwrap_or_else(|_| "http://localhost:3000".into());
        if !(server_url.starts_with("http://") || server_url.starts_with("https://")) {
            return Err(ConfigError::Invalid {
                var: "HIREWATCH_SERVER_URL",
                expected: "http(s) URL",
                value: server_url,
            });
        }

        let poll = std::env::var("STATUS_POLL_INTERVAL_SECS").unwrap_or_else(|_| "5".into());
        let poll_secs: u64 = match poll.trim().parse() {
            Ok(secs) if secs > 0 => secs,
            _ => {
                return Err(ConfigError::Invalid {
                    var: "STATUS_POLL_INTERVAL_SECS",
                    expected: "positive integer",
                    value: poll,
                })
            }
        };

        let hiring_site_prefix = std::env::var("HIRING_SITE_PREFIX")
            .unwrap_or_else(|_| DEFAULT_HIRING_SITE_PREFIX.into());

        Ok(Self::new(server_url)
            .with_status_poll_interval(Duration::from_secs(poll_secs))
            .with_hiring_site_prefix(hiring_site_prefix))
    }

    /// Defaults for everything except the server URL.
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into().trim_end_matches('/').to_string(),
            status_poll_interval: Duration::from_secs(5),
            hiring_site_prefix: DEFAULT_HIRING_SITE_PREFIX.to_string(),
            heartbeat_interval: HEARTBEAT_INTERVAL,
        }
    }

    pub fn with_status_poll_interval(mut self, interval: Duration) -> Self {
        self.status_poll_interval = interval;
        self
    }

    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    pub fn with_hiring_site_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.hiring_site_prefix = prefix.into();
        self
    }

    /// The log stream endpoint: same host, `ws(s)` scheme, `/ws` path.
    pub fn ws_url(&self) -> String {
        let base = self
            .server_url
            .strip_prefix("https://")
            .map(|rest| format!("wss://{rest}"))
            .or_else(|| {
                self.server_url
                    .strip_prefix("http://")
                    .map(|rest| format!("ws://{rest}"))
            })
            .unwrap_or_else(|| self.server_url.clone());
        format!("{base}/ws")
    }
}
