//! `tracing` layer mirroring diagnostics onto the [`LogBus`].
//!
//! Registered next to the fmt layer at startup, so every component logs
//! through the ordinary `tracing` macros and subscribers still see the
//! output. Events whose target starts with an excluded prefix are never
//! mirrored; the fan-out path is excluded so that its own diagnostics
//! cannot feed back into itself.

use std::fmt::{self, Write as _};
use std::sync::Arc;

use hirewatch_core::log_entry::LogEntry;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

use crate::bus::LogBus;

/// Mirrors `tracing` events onto a [`LogBus`].
pub struct BroadcastLayer {
    bus: Arc<LogBus>,
    excluded_targets: Vec<String>,
}

impl BroadcastLayer {
    pub fn new(bus: Arc<LogBus>) -> Self {
        Self {
            bus,
            excluded_targets: Vec::new(),
        }
    }

    /// Never mirror events whose target starts with `prefix`.
    pub fn exclude_target(mut self, prefix: impl Into<String>) -> Self {
        self.excluded_targets.push(prefix.into());
        self
    }

    fn is_excluded(&self, target: &str) -> bool {
        self.excluded_targets
            .iter()
            .any(|prefix| target.starts_with(prefix.as_str()))
    }
}

impl<S> Layer<S> for BroadcastLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if self.is_excluded(metadata.target()) {
            return;
        }
        // Only do work if someone is listening.
        if self.bus.receiver_count() == 0 {
            return;
        }

        let mut visitor = LineVisitor::default();
        event.record(&mut visitor);

        self.bus
            .publish(LogEntry::now(visitor.finish(*metadata.level())));
    }
}

/// Collects the `message` field and any extra fields into one line.
#[derive(Default)]
struct LineVisitor {
    message: String,
    fields: String,
}

impl LineVisitor {
    fn finish(self, level: Level) -> String {
        let mut line = match level {
            Level::INFO => String::new(),
            other => format!("{other}: "),
        };
        line.push_str(&self.message);
        line.push_str(&self.fields);
        line
    }
}

impl Visit for LineVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            let _ = write!(self.fields, " {}={}", field.name(), value);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{value:?}");
        } else {
            let _ = write!(self.fields, " {}={:?}", field.name(), value);
        }
    }
}
