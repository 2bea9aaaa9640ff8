//! Log lines as they travel from the worker to every client.
//!
//! A [`LogEntry`] is immutable once created. Producers hand entries to a
//! [`LogSink`]; clients keep them in a [`SessionLog`] in arrival order.

use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};

use crate::types::Timestamp;

/// A single log line with the time it was produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub message: String,
    /// RFC 3339, UTC, millisecond precision.
    pub timestamp: String,
}

impl LogEntry {
    /// Create an entry stamped with the current time.
    pub fn now(message: impl Into<String>) -> Self {
        Self::at(message, chrono::Utc::now())
    }

    /// Create an entry stamped with an explicit time.
    pub fn at(message: impl Into<String>, at: Timestamp) -> Self {
        Self {
            message: message.into(),
            timestamp: at.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

/// Destination for log lines produced anywhere in the process.
///
/// The worker receives one of these when it starts; the log bus implements
/// it so worker output and mirrored diagnostics share one path.
pub trait LogSink: Send + Sync {
    fn emit(&self, entry: LogEntry);

    /// Convenience wrapper stamping `message` with the current time.
    fn line(&self, message: &str) {
        self.emit(LogEntry::now(message));
    }
}

/// Ordered, append-only log held by one client session.
///
/// Grows without bound until [`clear`](Self::clear) is called. Entries are
/// kept in arrival order with no de-duplication.
#[derive(Debug, Default, Clone)]
pub struct SessionLog {
    entries: Vec<LogEntry>,
}

impl SessionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: LogEntry) {
        self.entries.push(entry);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
