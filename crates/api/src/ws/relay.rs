//! Forwards the log bus onto the websocket subscribers.
//!
//! [`LogRelay`] subscribes to the [`LogBus`](hirewatch_events::LogBus) and
//! publishes every entry through the [`WsManager`]. It runs as a long-lived
//! background task and exits when cancelled or when the bus is dropped.

use std::sync::Arc;

use hirewatch_core::log_entry::LogEntry;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::ws::manager::WsManager;

/// Background service relaying bus entries to subscribers.
pub struct LogRelay;

impl LogRelay {
    /// Run the relay loop until `cancel` fires or the bus channel closes.
    ///
    /// Entries already queued when `cancel` fires are still delivered.
    pub async fn run(
        ws_manager: Arc<WsManager>,
        mut receiver: broadcast::Receiver<LogEntry>,
        cancel: CancellationToken,
    ) {
        loop {
            let next = tokio::select! {
                biased;
                next = receiver.recv() => next,
                () = cancel.cancelled() => {
                    tracing::info!("Log relay cancelled");
                    break;
                }
            };
            match next {
                Ok(entry) => {
                    ws_manager.publish(&entry).await;
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Log relay lagged, some lines were not delivered");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Log bus closed, relay shutting down");
                    break;
                }
            }
        }
    }
}
