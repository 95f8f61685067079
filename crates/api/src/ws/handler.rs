use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};

use crate::background::schedule_feed;
use crate::state::AppState;

/// HTTP handler that upgrades the connection to WebSocket.
///
/// After the upgrade the connection is registered with `WsManager`, receives
/// the current schedule, and then every `schedule.updated` broadcast.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Manage a single WebSocket connection after upgrade.
///
/// Splits the socket into a sink (outbound) and stream (inbound), then:
///   1. Registers the connection with `WsManager`, which queues the latest
///      published schedule snapshot.
///   2. Loads and seeds a snapshot if the feed has not published one yet.
///   3. Spawns a sender task that forwards messages from the manager channel.
///   4. Drains inbound messages on the current task until the client leaves.
async fn handle_socket(socket: WebSocket, state: AppState) {
    let ws_manager = state.ws_manager;
    let conn_id = uuid::Uuid::new_v4().to_string();
    tracing::info!(conn_id = %conn_id, "WebSocket connected");

    let mut rx = ws_manager.add(conn_id.clone()).await;

    if !ws_manager.has_snapshot().await {
        match schedule_feed::schedule_message(&state.pool).await {
            Ok(snapshot) => {
                // Loses to any snapshot the feed published meanwhile.
                ws_manager.seed_snapshot(snapshot).await;
            }
            Err(e) => {
                tracing::warn!(conn_id = %conn_id, error = %e, "Failed to load initial schedule");
            }
        }
    }

    let (mut sink, mut stream) = socket.split();

    let sender_conn_id = conn_id.clone();
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sink.send(msg).await.is_err() {
                tracing::debug!(conn_id = %sender_conn_id, "WebSocket sink closed");
                break;
            }
        }
    });

    // The feed is server-to-client only; inbound frames are ignored.
    while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Close(_)) => break,
            Ok(Message::Pong(_)) => {
                tracing::trace!(conn_id = %conn_id, "Pong received");
            }
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(conn_id = %conn_id, error = %e, "WebSocket receive error");
                break;
            }
        }
    }

    ws_manager.remove(&conn_id).await;
    send_task.abort();
    tracing::info!(conn_id = %conn_id, "WebSocket disconnected");
}
