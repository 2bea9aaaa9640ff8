//! The scraping worker as seen by the control service.
//!
//! [`Worker`] is the opaque handle (`start`, `stop`, `is_running`);
//! [`ProcessWorker`] runs the scraper as a child process and turns its
//! output into log lines.

pub mod error;
pub mod handle;
pub mod process;

pub use error::WorkerError;
pub use handle::Worker;
pub use process::{ProcessWorker, WorkerCommand};
