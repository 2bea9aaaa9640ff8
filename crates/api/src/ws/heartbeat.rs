use std::sync::Arc;
use std::time::Duration;

use hirewatch_core::protocol::HEARTBEAT_INTERVAL;

use crate::ws::manager::WsManager;

/// Spawn the liveness check with the standard interval.
pub fn start_liveness_check(ws_manager: Arc<WsManager>) -> tokio::task::JoinHandle<()> {
    start_liveness_check_every(ws_manager, HEARTBEAT_INTERVAL)
}

/// Spawn a background task that sweeps subscribers every `period`.
///
/// A subscriber that has not answered the previous round's Ping is
/// terminated; every other subscriber is pinged again. The task runs until
/// aborted (which happens during shutdown).
pub fn start_liveness_check_every(
    ws_manager: Arc<WsManager>,
    period: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        // The first tick completes immediately; nobody has been pinged yet.
        interval.tick().await;

        loop {
            interval.tick().await;
            let report = ws_manager.check_liveness().await;
            tracing::debug!(
                pinged = report.pinged,
                terminated = report.terminated,
                "WebSocket liveness check",
            );
        }
    })
}
