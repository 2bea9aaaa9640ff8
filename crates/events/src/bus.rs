//! In-process log bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`LogBus`] is the single path every log line takes on its way to the
//! websocket subscribers, whether it came from the worker's output or from
//! a mirrored `tracing` event. Share it via `Arc<LogBus>`.

use hirewatch_core::log_entry::{LogEntry, LogSink};
use tokio::sync::broadcast;

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out log bus.
///
/// # Usage
///
/// ```rust
/// use hirewatch_core::log_entry::LogSink;
/// use hirewatch_events::LogBus;
///
/// let bus = LogBus::default();
/// let mut rx = bus.subscribe();
///
/// bus.line("Monitoring started");
/// ```
pub struct LogBus {
    sender: broadcast::Sender<LogEntry>,
}

impl LogBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full, the oldest un-consumed entries are dropped
    /// and slow receivers will observe a `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an entry to all current receivers.
    ///
    /// With no receivers the entry is dropped.
    pub fn publish(&self, entry: LogEntry) {
        // Ignore the SendError; it only means there are zero receivers.
        let _ = self.sender.send(entry);
    }

    /// Subscribe to every entry published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<LogEntry> {
        self.sender.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for LogBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl LogSink for LogBus {
    fn emit(&self, entry: LogEntry) {
        self.publish(entry);
    }
}
