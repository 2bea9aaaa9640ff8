use std::str::FromStr;

use axum::http::HeaderValue;
use hirewatch_core::monitor::{MonitorDefaults, DEFAULT_REFRESH_INTERVAL_MS};
use hirewatch_core::validation::DEFAULT_HIRING_SITE_PREFIX;
use hirewatch_worker::WorkerCommand;

/// A configuration value that could not be parsed.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} must be a valid {expected}, got {value:?}")]
    Invalid {
        var: &'static str,
        expected: &'static str,
        value: String,
    },

    #[error("{0} must not be empty")]
    Empty(&'static str),
}

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Upper bound for each post-shutdown cleanup step (default: `10`).
    pub shutdown_timeout_secs: u64,
    /// Prefix every monitored link must start with.
    pub hiring_site_prefix: String,
    /// Server-side parts of every [`MonitorConfig`](hirewatch_core::monitor::MonitorConfig).
    pub monitor: MonitorDefaults,
    /// How to launch the scraper.
    pub worker: WorkerCommand,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default                  |
    /// |-------------------------|--------------------------|
    /// | `HOST`                  | `0.0.0.0`                |
    /// | `PORT`                  | `3000`                   |
    /// | `CORS_ORIGINS`          | `http://localhost:5173`  |
    /// | `REQUEST_TIMEOUT_SECS`  | `30`                     |
    /// | `SHUTDOWN_TIMEOUT_SECS` | `10`                     |
    /// | `HIRING_SITE_PREFIX`    | `https://hiring.amazon`  |
    /// | `REFRESH_INTERVAL_MS`   | `10000`                  |
    /// | `PROFILE_SELECTORS`     | built-in list            |
    /// | `WORKER_PROGRAM`        | `node`                   |
    /// | `WORKER_ARGS`           | `scraper/monitor.js`     |
    /// | `WORKER_DIR`            | unset                    |
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = env_or("HOST", "0.0.0.0");
        let port = parse_env("PORT", "3000", "u16")?;

        let cors_origins = split_list(&env_or("CORS_ORIGINS", "http://localhost:5173"), ',');
        for origin in &cors_origins {
            if origin != "*" && HeaderValue::from_str(origin).is_err() {
                return Err(ConfigError::Invalid {
                    var: "CORS_ORIGINS",
                    expected: "origin list",
                    value: origin.clone(),
                });
            }
        }

        let request_timeout_secs = parse_env("REQUEST_TIMEOUT_SECS", "30", "u64")?;
        let shutdown_timeout_secs = parse_env("SHUTDOWN_TIMEOUT_SECS", "10", "u64")?;

        let hiring_site_prefix = env_or("HIRING_SITE_PREFIX", DEFAULT_HIRING_SITE_PREFIX);
        if hiring_site_prefix.trim().is_empty() {
            return Err(ConfigError::Empty("HIRING_SITE_PREFIX"));
        }

        let mut monitor = MonitorDefaults {
            refresh_interval_ms: parse_env(
                "REFRESH_INTERVAL_MS",
                &DEFAULT_REFRESH_INTERVAL_MS.to_string(),
                "u64",
            )?,
            ..MonitorDefaults::default()
        };
        if let Ok(selectors) = std::env::var("PROFILE_SELECTORS") {
            let selectors = split_list(&selectors, ',');
            if selectors.is_empty() {
                return Err(ConfigError::Empty("PROFILE_SELECTORS"));
            }
            monitor.profile_selectors = selectors;
        }

        let program = env_or("WORKER_PROGRAM", "node");
        if program.trim().is_empty() {
            return Err(ConfigError::Empty("WORKER_PROGRAM"));
        }
        let args = env_or("WORKER_ARGS", "scraper/monitor.js")
            .split_whitespace()
            .map(str::to_string)
            .collect();
        let mut worker = WorkerCommand::new(program, args);
        worker.working_directory = std::env::var("WORKER_DIR").ok().filter(|d| !d.is_empty());

        Ok(Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            hiring_site_prefix,
            monitor,
            worker,
        })
    }
}

fn env_or(var: &str, default: &str) -> String {
    std::env::var(var).unwrap_or_else(|_| default.into())
}

fn parse_env<T: FromStr>(
    var: &'static str,
    default: &str,
    expected: &'static str,
) -> Result<T, ConfigError> {
    let value = env_or(var, default);
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        var,
        expected,
        value,
    })
}

fn split_list(raw: &str, sep: char) -> Vec<String> {
    raw.split(sep)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
