use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use vigia_core::error::CoreError;
use vigia_core::types::DbId;
use vigia_db::repositories::IngenioRepo;

use crate::error::{AppError, AppResult};
use crate::state::AppState;
use crate::ws::manager::BroadcastBus;

/// Query parameters for the live stream upgrade.
#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub ingenio: Option<DbId>,
}

/// GET /ws?ingenio={id}
///
/// Upgrades the connection to WebSocket after attributing it to an ingenio.
/// Connections without a resolvable ingenio are refused — the bus carries
/// no anonymous recipients.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let Some(ingenio_id) = query.ingenio else {
        return Err(AppError::BadRequest(
            "ingenio query parameter is required".to_string(),
        ));
    };
    let ingenio = IngenioRepo::get(&state.pool, ingenio_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "ingenio",
            id: ingenio_id.to_string(),
        })?;

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state.bus, ingenio.id)))
}

/// Manage a single WebSocket connection after upgrade.
///
/// Splits the socket into a sink (outbound) and stream (inbound), then:
///   1. Registers the connection with the bus under its ingenio.
///   2. Spawns a sender task that forwards messages from the bus channel.
///   3. Drains inbound messages on the current task (they are ignored —
///      the stream is outbound-only).
///   4. Cleans up on disconnect.
async fn handle_socket(socket: WebSocket, bus: Arc<BroadcastBus>, ingenio_id: DbId) {
    let conn_id = uuid::Uuid::new_v4().to_string();
    tracing::info!(conn_id = %conn_id, ingenio_id, "WebSocket connected");

    // Register and get the receiver for outbound messages.
    let mut rx = bus.add(conn_id.clone(), ingenio_id).await;

    let (mut sink, mut stream) = socket.split();

    // Sender task: forward channel messages to the WebSocket sink.
    let sender_conn_id = conn_id.clone();
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sink.send(msg).await.is_err() {
                tracing::debug!(conn_id = %sender_conn_id, "WebSocket sink closed");
                break;
            }
        }
    });

    // Receiver loop: inbound frames are ignored apart from lifecycle ones.
    while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Close(_)) => break,
            Ok(Message::Pong(_)) => {
                tracing::trace!(conn_id = %conn_id, "Pong received");
            }
            Ok(_msg) => {}
            Err(e) => {
                tracing::debug!(conn_id = %conn_id, error = %e, "WebSocket receive error");
                break;
            }
        }
    }

    // Clean up: remove connection and abort sender task.
    bus.remove(&conn_id).await;
    send_task.abort();
    tracing::info!(conn_id = %conn_id, ingenio_id, "WebSocket disconnected");
}
