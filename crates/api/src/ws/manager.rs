use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::ws::Message;
use serde::Serialize;
use tokio::sync::{mpsc, RwLock};
use vigia_core::types::{DbId, Timestamp};

/// Channel sender half for pushing messages to a WebSocket connection.
pub type WsSender = mpsc::UnboundedSender<Message>;

/// Metadata for a single dashboard connection.
pub struct WsConnection {
    /// Ingenio the connection was attributed to at upgrade time. There are
    /// no anonymous recipients; unattributable connections are refused
    /// before registration.
    pub ingenio_id: DbId,
    /// Channel sender for outbound messages to this connection.
    pub sender: WsSender,
    /// When this connection was established.
    pub connected_at: Timestamp,
}

/// Tenant-partitioned publish/subscribe registry over live dashboard
/// connections.
///
/// Thread-safe via interior `RwLock`; designed to be wrapped in `Arc` and
/// shared across the application. Sends are fire-and-forget channel pushes:
/// a connection whose channel is closed is skipped silently and cleaned up
/// by its own receive loop, and clients that reconnect only see data from
/// that point forward.
pub struct BroadcastBus {
    connections: RwLock<HashMap<String, WsConnection>>,
}

impl BroadcastBus {
    /// Create a new, empty bus.
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Register a new connection attributed to an ingenio.
    ///
    /// Returns the receiver half of the message channel so the caller can
    /// forward messages to the WebSocket sink.
    pub async fn add(
        &self,
        conn_id: String,
        ingenio_id: DbId,
    ) -> mpsc::UnboundedReceiver<Message> {
        let (tx, rx) = mpsc::unbounded_channel();
        let conn = WsConnection {
            ingenio_id,
            sender: tx,
            connected_at: chrono::Utc::now(),
        };
        self.connections.write().await.insert(conn_id, conn);
        rx
    }

    /// Remove a connection by its ID. Removing an unknown ID is a no-op.
    pub async fn remove(&self, conn_id: &str) {
        self.connections.write().await.remove(conn_id);
    }

    /// Broadcast an event to every connection regardless of ingenio.
    /// Used for system-wide events.
    ///
    /// Returns the number of connections the frame was pushed to.
    pub async fn publish<T: Serialize>(&self, event: &str, payload: &T) -> usize {
        let Some(frame) = envelope(event, payload) else {
            return 0;
        };
        let conns = self.connections.read().await;
        let mut count = 0;
        for conn in conns.values() {
            if conn.sender.send(frame.clone()).is_ok() {
                count += 1;
            }
        }
        count
    }

    /// Send an event only to connections attributed to `ingenio_id`.
    ///
    /// The envelope is serialized once and the frame cloned per matching
    /// connection. Returns the number of connections reached.
    pub async fn publish_to_ingenio<T: Serialize>(
        &self,
        event: &str,
        payload: &T,
        ingenio_id: DbId,
    ) -> usize {
        let Some(frame) = envelope(event, payload) else {
            return 0;
        };
        let conns = self.connections.read().await;
        let mut count = 0;
        for conn in conns.values() {
            if conn.ingenio_id == ingenio_id && conn.sender.send(frame.clone()).is_ok() {
                count += 1;
            }
        }
        count
    }

    /// Return the current number of active connections.
    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Number of connections attributed to one ingenio.
    pub async fn connection_count_for(&self, ingenio_id: DbId) -> usize {
        self.connections
            .read()
            .await
            .values()
            .filter(|conn| conn.ingenio_id == ingenio_id)
            .count()
    }

    /// Send a Ping frame to every connected client.
    ///
    /// Used by the heartbeat task to keep connections alive and detect
    /// stale ones.
    pub async fn ping_all(&self) {
        let conns = self.connections.read().await;
        for conn in conns.values() {
            let _ = conn.sender.send(Message::Ping(Bytes::new()));
        }
    }

    /// Send a Close frame to every connection, then clear the map.
    ///
    /// Used during graceful shutdown to notify all clients before the
    /// server stops accepting new connections.
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

impl Default for BroadcastBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Build the wire frame for one publish call.
///
/// Object payloads are flattened into the envelope (`{"type": ..., ...payload}`);
/// anything else is carried under a `payload` key.
fn envelope<T: Serialize>(event: &str, payload: &T) -> Option<Message> {
    let value = match serde_json::to_value(payload) {
        Ok(value) => value,
        Err(e) => {
            tracing::error!(event, error = %e, "Unserializable broadcast payload dropped");
            return None;
        }
    };
    let frame = match value {
        serde_json::Value::Object(mut map) => {
            map.insert(
                "type".to_string(),
                serde_json::Value::String(event.to_string()),
            );
            serde_json::Value::Object(map)
        }
        other => serde_json::json!({ "type": event, "payload": other }),
    };
    Some(Message::Text(frame.to_string().into()))
}
