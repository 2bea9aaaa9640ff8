//! Hirewatch client library.
//!
//! [`session`] keeps a log-stream subscription alive with bounded
//! exponential backoff and relays control calls made through
//! [`control::ControlClient`]; [`ui`] is the command-line front end on top.

pub mod config;
pub mod control;
pub mod session;
pub mod ui;

pub use config::ClientConfig;
pub use control::{ControlClient, ControlError};
pub use session::{SessionCommand, SessionHandle, SessionStatus, SessionUpdate};
