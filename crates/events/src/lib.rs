//! Hirewatch log bus and log mirroring.
//!
//! - [`LogBus`] -- in-process fan-out of [`LogEntry`] values backed by
//!   `tokio::sync::broadcast`. Implements [`LogSink`] so the worker can
//!   write straight into it.
//! - [`BroadcastLayer`] -- a `tracing` layer that mirrors ordinary
//!   diagnostics onto the bus.
//!
//! [`LogEntry`]: hirewatch_core::log_entry::LogEntry
//! [`LogSink`]: hirewatch_core::log_entry::LogSink

pub mod bus;
pub mod layer;

pub use bus::LogBus;
pub use layer::BroadcastLayer;
