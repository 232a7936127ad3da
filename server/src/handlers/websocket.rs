//! WebSocket handler for change notifications.
//!
//! Clients subscribe to records and are told when their fields or watcher
//! count change, so another member's edits can be applied as authoritative
//! updates without polling.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use sqlx::PgPool;
use tokio::sync::mpsc;

use crate::db;
use crate::websocket::{ClientMessage, ConnectionManager, ServerMessage};

/// Handle an established WebSocket connection.
///
/// Registers the connection, forwards queued notifications from a spawned
/// task, answers incoming messages until the socket closes, then cleans up.
pub async fn handle_websocket_connection(
    socket: WebSocket,
    pool: PgPool,
    conn_manager: Arc<ConnectionManager>,
    member: String,
) {
    let (mut ws_sender, mut ws_receiver) = socket.split();

    // Create channel for sending messages to this connection
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();

    let conn_id = conn_manager.register(member.clone(), tx);

    tracing::info!(
        conn_id = %conn_id,
        member = %member,
        "WebSocket client connected"
    );

    // Forward messages from channel to WebSocket
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            match serde_json::to_string(&msg) {
                Ok(text) => {
                    if let Err(e) = ws_sender.send(Message::Text(text.into())).await {
                        tracing::warn!("Failed to send WebSocket message: {}", e);
                        break;
                    }
                }
                Err(e) => {
                    tracing::error!("Failed to serialize WebSocket message: {}", e);
                }
            }
        }
    });

    while let Some(result) = ws_receiver.next().await {
        match result {
            Ok(Message::Text(text)) => {
                let response =
                    process_message(text.as_str(), &pool, &conn_manager, &conn_id).await;
                conn_manager.send_to(&conn_id, response);
            }
            Ok(Message::Binary(_)) => {
                tracing::warn!("Binary messages not supported");
                let reply = ServerMessage::error("binary messages not supported");
                conn_manager.send_to(&conn_id, reply);
            }
            Ok(Message::Ping(data)) => {
                tracing::trace!("Received ping: {} bytes", data.len());
            }
            Ok(Message::Pong(_)) => {
                tracing::trace!("Received pong");
            }
            Ok(Message::Close(_)) => {
                tracing::info!(conn_id = %conn_id, "WebSocket close frame received");
                break;
            }
            Err(e) => {
                tracing::warn!(conn_id = %conn_id, "WebSocket error: {}", e);
                break;
            }
        }
    }

    conn_manager.unregister(&conn_id);
    send_task.abort();

    tracing::info!(
        conn_id = %conn_id,
        member = %member,
        active_connections = conn_manager.connection_count(),
        "WebSocket client disconnected"
    );
}

/// Process a client message and return the reply.
async fn process_message(
    text: &str,
    pool: &PgPool,
    conn_manager: &ConnectionManager,
    conn_id: &str,
) -> ServerMessage {
    let client_msg: ClientMessage = match serde_json::from_str(text) {
        Ok(msg) => msg,
        Err(e) => return ServerMessage::error(format!("Invalid message format: {}", e)),
    };

    match client_msg {
        ClientMessage::Subscribe { record_id } => match db::record_exists(pool, &record_id).await {
            Ok(true) => {
                conn_manager.subscribe(conn_id, &record_id);
                tracing::debug!(
                    record_id = %record_id,
                    subscribers = conn_manager.subscriber_count(&record_id),
                    "Record subscribed"
                );
                ServerMessage::Subscribed { record_id }
            }
            Ok(false) => ServerMessage::error(format!("unknown record: {record_id}")),
            Err(e) => {
                tracing::error!("Database error: {:?}", e);
                ServerMessage::error("Database error")
            }
        },

        ClientMessage::Unsubscribe { record_id } => {
            conn_manager.unsubscribe(conn_id, &record_id);
            ServerMessage::Unsubscribed { record_id }
        }

        ClientMessage::Ping => ServerMessage::Pong,
    }
}
