use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use hirewatch_core::protocol::{parse_client_frame, ControlFrame};

use crate::state::AppState;
use crate::ws::manager::{Subscription, WsManager};

/// How long the sender may take to flush its final Close frame.
const SENDER_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// HTTP handler that upgrades the connection to WebSocket.
///
/// After the upgrade the connection is subscribed to the log stream and
/// managed by a sender task plus the receive loop below.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state.ws_manager))
}

/// Manage a single subscriber after upgrade.
///
///   1. Subscribes with `WsManager` (the welcome frame is queued first).
///   2. Spawns a sender task that forwards messages from the manager channel.
///   3. Processes inbound frames until the client leaves or the manager
///      cancels the subscription.
///   4. Unsubscribes on the way out.
async fn handle_socket(socket: WebSocket, ws_manager: Arc<WsManager>) {
    let conn_id = uuid::Uuid::new_v4().to_string();
    tracing::info!(conn_id = %conn_id, "WebSocket connected");

    let Subscription {
        receiver: mut rx,
        cancel,
    } = ws_manager.subscribe(conn_id.clone()).await;

    let (mut sink, mut stream) = socket.split();

    // Sender task: forward channel messages to the WebSocket sink.
    let sender_conn_id = conn_id.clone();
    let sender_cancel = cancel.clone();
    let mut send_task = tokio::spawn(async move {
        loop {
            tokio::select! {
                msg = rx.recv() => {
                    let Some(msg) = msg else { break };
                    if sink.send(msg).await.is_err() {
                        tracing::debug!(conn_id = %sender_conn_id, "WebSocket sink closed");
                        break;
                    }
                }
                () = sender_cancel.cancelled() => {
                    let _ = sink.send(Message::Close(None)).await;
                    break;
                }
            }
        }
    });

    // Receiver loop: process inbound frames.
    loop {
        let result = tokio::select! {
            next = stream.next() => match next {
                Some(result) => result,
                None => break,
            },
            () = cancel.cancelled() => break,
        };

        match result {
            Ok(Message::Close(_)) => break,
            Ok(Message::Pong(_)) => {
                tracing::trace!(conn_id = %conn_id, "Pong received");
                ws_manager.mark_alive(&conn_id).await;
            }
            Ok(Message::Text(text)) => match parse_client_frame(text.as_str()) {
                Ok(ControlFrame::Heartbeat) => {
                    if let Err(e) = ws_manager.reply_heartbeat(&conn_id).await {
                        tracing::debug!(error = %e, "Heartbeat reply not delivered");
                    }
                }
                Ok(other) => {
                    tracing::debug!(conn_id = %conn_id, frame = ?other, "Ignoring client frame");
                }
                Err(e) => {
                    tracing::debug!(conn_id = %conn_id, error = %e, "Ignoring malformed frame");
                }
            },
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(conn_id = %conn_id, error = %e, "WebSocket receive error");
                break;
            }
        }
    }

    // Clean up: unsubscribe, then let the sender flush or stop.
    ws_manager.remove(&conn_id).await;
    cancel.cancel();
    if tokio::time::timeout(SENDER_DRAIN_TIMEOUT, &mut send_task)
        .await
        .is_err()
    {
        tracing::debug!(conn_id = %conn_id, "Sender task did not stop in time");
        send_task.abort();
    }
    tracing::info!(conn_id = %conn_id, "WebSocket disconnected");
}
