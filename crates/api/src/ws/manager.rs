use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::ws::Message;
use hirewatch_core::log_entry::LogEntry;
use hirewatch_core::protocol::{encode_control, encode_log, ControlFrame, WELCOME_MESSAGE};
use hirewatch_core::types::Timestamp;
use tokio::sync::{mpsc, RwLock};
use tokio_util::sync::CancellationToken;

/// Channel sender half for pushing messages to a WebSocket connection.
pub type WsSender = mpsc::UnboundedSender<Message>;

/// A message could not be handed to one subscriber.
#[derive(Debug, thiserror::Error)]
#[error("delivery to {conn_id} failed: channel closed")]
pub struct DeliveryError {
    pub conn_id: String,
}

/// Metadata for a single WebSocket subscriber.
pub struct WsConnection {
    /// Channel sender for outbound messages to this connection.
    pub sender: WsSender,
    /// Cancelled to force the connection task to close the socket.
    pub cancel: CancellationToken,
    /// Set when a Ping goes out, cleared by the matching Pong.
    pub awaiting_pong: bool,
    /// When this connection was established.
    pub connected_at: Timestamp,
}

/// What the connection task needs after [`WsManager::subscribe`].
pub struct Subscription {
    pub receiver: mpsc::UnboundedReceiver<Message>,
    pub cancel: CancellationToken,
}

/// Result of one liveness sweep.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LivenessReport {
    /// Subscribers that never answered the previous Ping.
    pub terminated: usize,
    /// Subscribers that were pinged this round.
    pub pinged: usize,
}

/// Manages all active WebSocket subscribers.
///
/// Thread-safe via interior `RwLock`; designed to be wrapped in `Arc` and
/// shared across the application.
pub struct WsManager {
    connections: RwLock<HashMap<String, WsConnection>>,
}

impl WsManager {
    /// Create a new, empty connection manager.
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Register a subscriber and queue the welcome frame.
    ///
    /// The welcome text is always the first message on the returned
    /// receiver. Re-using an id replaces the previous connection.
    pub async fn subscribe(&self, conn_id: String) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        // Welcome is queued under the write lock, ahead of any publish.
        let mut conns = self.connections.write().await;
        let _ = tx.send(Message::Text(WELCOME_MESSAGE.into()));

        let conn = WsConnection {
            sender: tx,
            cancel: cancel.clone(),
            awaiting_pong: false,
            connected_at: chrono::Utc::now(),
        };
        if let Some(old) = conns.insert(conn_id, conn) {
            old.cancel.cancel();
        }
        drop(conns);

        Subscription {
            receiver: rx,
            cancel,
        }
    }

    /// Remove a connection by its ID.
    pub async fn remove(&self, conn_id: &str) {
        if let Some(conn) = self.connections.write().await.remove(conn_id) {
            tracing::debug!(
                conn_id,
                connected_secs = (chrono::Utc::now() - conn.connected_at).num_seconds(),
                "Subscriber removed",
            );
        }
    }

    /// Deliver a log entry to every subscriber.
    ///
    /// The frame is serialised once. A failed delivery only affects its own
    /// subscriber, which is logged and pruned. Returns how many subscribers
    /// received the frame.
    pub async fn publish(&self, entry: &LogEntry) -> usize {
        let frame = encode_log(&entry.message, Some(&entry.timestamp));
        let message = Message::Text(frame.into());

        let mut failed = Vec::new();
        let mut delivered = 0;
        {
            let conns = self.connections.read().await;
            for (conn_id, conn) in conns.iter() {
                match deliver(conn_id, conn, message.clone()) {
                    Ok(()) => delivered += 1,
                    Err(err) => {
                        tracing::warn!(error = %err, "Dropping subscriber");
                        failed.push(err.conn_id);
                    }
                }
            }
        }

        if !failed.is_empty() {
            let mut conns = self.connections.write().await;
            for conn_id in &failed {
                if let Some(conn) = conns.remove(conn_id) {
                    conn.cancel.cancel();
                }
            }
        }
        delivered
    }

    /// Send a message to one subscriber.
    pub async fn send_to(&self, conn_id: &str, message: Message) -> Result<(), DeliveryError> {
        let conns = self.connections.read().await;
        match conns.get(conn_id) {
            Some(conn) => deliver(conn_id, conn, message),
            None => Err(DeliveryError {
                conn_id: conn_id.to_string(),
            }),
        }
    }

    /// Answer a client heartbeat.
    pub async fn reply_heartbeat(&self, conn_id: &str) -> Result<(), DeliveryError> {
        let frame = encode_control(ControlFrame::HeartbeatResponse);
        self.send_to(conn_id, Message::Text(frame.into())).await
    }

    /// Record a Pong from `conn_id`.
    pub async fn mark_alive(&self, conn_id: &str) {
        if let Some(conn) = self.connections.write().await.get_mut(conn_id) {
            conn.awaiting_pong = false;
        }
    }

    /// Terminate subscribers that missed the previous Ping, then ping the rest.
    pub async fn check_liveness(&self) -> LivenessReport {
        let mut report = LivenessReport::default();
        let mut conns = self.connections.write().await;

        conns.retain(|conn_id, conn| {
            if conn.awaiting_pong {
                tracing::info!(conn_id = %conn_id, "Subscriber missed heartbeat, terminating");
                conn.cancel.cancel();
                report.terminated += 1;
                return false;
            }
            conn.awaiting_pong = true;
            if conn.sender.send(Message::Ping(Bytes::new())).is_err() {
                conn.cancel.cancel();
                report.terminated += 1;
                return false;
            }
            report.pinged += 1;
            true
        });

        report
    }

    /// Return the current number of active connections.
    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Send a Close frame to every connection, then clear the map.
    ///
    /// Used during graceful shutdown to notify all clients before the
    /// server exits.
    pub async fn shutdown_all(&self) {
        let mut conns = self.connections.write().await;
        let count = conns.len();
        for conn in conns.values() {
            let _ = conn.sender.send(Message::Close(None));
        }
        conns.clear();
        tracing::info!(count, "Closed all WebSocket connections");
    }
}

impl Default for WsManager {
    fn default() -> Self {
        Self::new()
    }
}

fn deliver(conn_id: &str, conn: &WsConnection, message: Message) -> Result<(), DeliveryError> {
    conn.sender.send(message).map_err(|_| DeliveryError {
        conn_id: conn_id.to_string(),
    })
}
