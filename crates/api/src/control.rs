//! Start, stop and status of the monitoring run.

use std::sync::Arc;

use hirewatch_core::error::CoreError;
use hirewatch_core::log_entry::LogSink;
use hirewatch_core::monitor::{MonitorConfig, MonitorDefaults};
use hirewatch_core::validation::validate_start;
use hirewatch_worker::Worker;
use tokio::sync::Mutex;

use crate::error::AppResult;

/// Result of an accepted start request.
#[derive(Debug, Clone)]
pub struct StartAck {
    pub message: String,
    pub config: MonitorConfig,
}

/// Owns the worker handle and enforces "at most one run".
///
/// Start and stop are serialised by `gate`; handlers run concurrently, and
/// the running check and the worker call must happen as one step.
pub struct ControlService {
    worker: Arc<dyn Worker>,
    sink: Arc<dyn LogSink>,
    defaults: MonitorDefaults,
    link_prefix: String,
    gate: Mutex<()>,
}

impl ControlService {
    pub fn new(
        worker: Arc<dyn Worker>,
        sink: Arc<dyn LogSink>,
        defaults: MonitorDefaults,
        link_prefix: impl Into<String>,
    ) -> Self {
        Self {
            worker,
            sink,
            defaults,
            link_prefix: link_prefix.into(),
            gate: Mutex::new(()),
        }
    }

    /// Validate the request and launch a run.
    ///
    /// Returns once the worker has been launched; the run itself reports
    /// through the log sink.
    pub async fn start(&self, links: &[String], positions: &[String]) -> AppResult<StartAck> {
        let input = validate_start(links, positions, &self.link_prefix)?;

        let _gate = self.gate.lock().await;
        if self.worker.is_running() {
            return Err(CoreError::AlreadyRunning.into());
        }

        let config = MonitorConfig::from_start(&input, &self.defaults);
        if input.links().len() > 1 {
            tracing::info!(
                ignored = input.links().len() - 1,
                "Only the first link is monitored",
            );
        }

        self.worker.start(config.clone(), Arc::clone(&self.sink))?;
        tracing::info!(
            target_url = %config.target_url,
            positions = config.target_positions.len(),
            "Monitoring run launched",
        );

        Ok(StartAck {
            message: "Monitoring started".to_string(),
            config,
        })
    }

    /// Signal the running worker to stop.
    pub async fn stop(&self) -> AppResult<String> {
        let _gate = self.gate.lock().await;
        if !self.worker.is_running() {
            return Err(CoreError::NotRunning.into());
        }

        self.worker.stop()?;
        tracing::info!("Monitoring stop requested");
        Ok("Monitoring stopped".to_string())
    }

    /// Whether a run is currently active.
    pub fn status(&self) -> bool {
        self.worker.is_running()
    }
}
