//! The worker handle trait.

use std::sync::Arc;

use hirewatch_core::log_entry::LogSink;
use hirewatch_core::monitor::MonitorConfig;

use crate::error::WorkerError;

/// An opaque long-running scraping task.
///
/// Implementations must not block: `start` launches the run in the
/// background and returns, `stop` signals termination and returns without
/// waiting for teardown.
pub trait Worker: Send + Sync {
    /// Begin a run with `config`, writing every output line to `sink`.
    fn start(&self, config: MonitorConfig, sink: Arc<dyn LogSink>) -> Result<(), WorkerError>;

    /// Signal the active run to terminate.
    fn stop(&self) -> Result<(), WorkerError>;

    /// Whether a run is active.
    fn is_running(&self) -> bool;
}
