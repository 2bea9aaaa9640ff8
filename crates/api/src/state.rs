use std::sync::Arc;

use hirewatch_core::log_entry::LogSink;
use hirewatch_events::LogBus;
use hirewatch_worker::Worker;

use crate::config::ServerConfig;
use crate::control::ControlService;
use crate::ws::WsManager;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Log stream subscribers.
    pub ws_manager: Arc<WsManager>,
    /// Start/stop/status of the monitoring run.
    pub control: Arc<ControlService>,
    /// Every log line passes through here on its way to the subscribers.
    pub log_bus: Arc<LogBus>,
}

impl AppState {
    /// Wire the control service to `worker`, with run output going to `log_bus`.
    pub fn new(config: ServerConfig, worker: Arc<dyn Worker>, log_bus: Arc<LogBus>) -> Self {
        let sink: Arc<dyn LogSink> = Arc::clone(&log_bus) as Arc<dyn LogSink>;
        let control = ControlService::new(
            worker,
            sink,
            config.monitor.clone(),
            config.hiring_site_prefix.clone(),
        );

        Self {
            config: Arc::new(config),
            ws_manager: Arc::new(WsManager::new()),
            control: Arc::new(control),
            log_bus,
        }
    }
}
