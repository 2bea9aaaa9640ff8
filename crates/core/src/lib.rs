//! Hirewatch domain logic.
//!
//! Pure types and rules shared by the control server, the worker and the
//! client session. Nothing here performs I/O or owns a timer.

pub mod error;
pub mod log_entry;
pub mod monitor;
pub mod protocol;
pub mod session;
pub mod types;
pub mod validation;
