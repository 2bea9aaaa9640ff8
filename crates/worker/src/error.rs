/// Errors returned synchronously by a [`Worker`](crate::Worker).
///
/// Failures after a run has started never surface here; they are written
/// to the run's log sink instead.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("Worker is already running")]
    AlreadyRunning,

    #[error("Worker is not running")]
    NotRunning,

    /// The worker process could not be spawned.
    #[error("Failed to spawn worker process: {0}")]
    Spawn(#[source] std::io::Error),
}
