use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::ws::Message;
use ensemble_core::types::Timestamp;
use tokio::sync::{mpsc, RwLock};

/// Channel sender half for pushing messages to a WebSocket connection.
pub type WsSender = mpsc::UnboundedSender<Message>;

/// Metadata for a single WebSocket connection.
pub struct WsConnection {
    /// Channel sender for outbound messages to this connection.
    pub sender: WsSender,
    /// When this connection was established.
    pub connected_at: Timestamp,
}

#[derive(Default)]
struct Registry {
    connections: HashMap<String, WsConnection>,
    /// Most recent schedule snapshot, queued to every new connection.
    snapshot: Option<Message>,
}

impl Registry {
    fn send_all(&self, message: &Message) {
        for conn in self.connections.values() {
            let _ = conn.sender.send(message.clone());
        }
    }
}

/// Manages all active WebSocket connections.
///
/// Connections and the latest schedule snapshot sit behind one `RwLock`, so
/// a connection is registered either before a snapshot is published (and
/// receives it through the broadcast) or after it (and receives it on
/// registration), never both and never out of order.
pub struct WsManager {
    registry: RwLock<Registry>,
}

impl WsManager {
    /// Create a new, empty connection manager.
    pub fn new() -> Self {
        Self {
            registry: RwLock::new(Registry::default()),
        }
    }

    /// Register a new connection.
    ///
    /// Returns the receiver half of the message channel so the caller can
    /// forward messages to the WebSocket sink. The latest snapshot, if any,
    /// is already queued on it.
    pub async fn add(&self, conn_id: String) -> mpsc::UnboundedReceiver<Message> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut registry = self.registry.write().await;
        if let Some(snapshot) = &registry.snapshot {
            let _ = tx.send(snapshot.clone());
        }
        let conn = WsConnection {
            sender: tx,
            connected_at: chrono::Utc::now(),
        };
        registry.connections.insert(conn_id, conn);
        rx
    }

    /// Remove a connection by its ID.
    pub async fn remove(&self, conn_id: &str) {
        self.registry.write().await.connections.remove(conn_id);
    }

    /// Store `snapshot` as the latest schedule and broadcast it.
    pub async fn publish_snapshot(&self, snapshot: Message) {
        let mut registry = self.registry.write().await;
        registry.send_all(&snapshot);
        registry.snapshot = Some(snapshot);
    }

    /// Publish `snapshot` only if none has been published yet.
    ///
    /// Returns `false` when a snapshot already exists; `snapshot` is then
    /// dropped, since the stored one is at least as recent.
    pub async fn seed_snapshot(&self, snapshot: Message) -> bool {
        let mut registry = self.registry.write().await;
        if registry.snapshot.is_some() {
            return false;
        }
        registry.send_all(&snapshot);
        registry.snapshot = Some(snapshot);
        true
    }

    /// Whether a schedule snapshot has been published.
    pub async fn has_snapshot(&self) -> bool {
        self.registry.read().await.snapshot.is_some()
    }

    /// Return the current number of active connections.
    pub async fn connection_count(&self) -> usize {
        self.registry.read().await.connections.len()
    }

    /// Send a Close frame to every connection, then clear the map.
    pub async fn shutdown_all(&self) {
        let mut registry = self.registry.write().await;
        let count = registry.connections.len();
        registry.send_all(&Message::Close(None));
        registry.connections.clear();
        tracing::info!(count, "Closed all WebSocket connections");
    }

    /// Send a Ping frame to every connected client.
    pub async fn ping_all(&self) {
        self.registry
            .read()
            .await
            .send_all(&Message::Ping(Bytes::new()));
    }
}

impl Default for WsManager {
    fn default() -> Self {
        Self::new()
    }
}
