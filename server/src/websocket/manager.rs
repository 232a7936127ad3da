//! WebSocket connection manager.
//!
//! Tracks active WebSocket connections and their record subscriptions, and
//! fans change notifications out to the subscribers of a record.

use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc;

use super::ServerMessage;

/// Sender for WebSocket messages.
pub type MessageSender = mpsc::UnboundedSender<ServerMessage>;

/// A single WebSocket connection.
#[derive(Debug)]
pub struct Connection {
    /// Member who opened the connection
    pub member: String,
    /// Channel to send messages to this connection
    pub sender: MessageSender,
    /// Records this connection is subscribed to
    pub records: HashSet<String>,
}

/// Manages active WebSocket connections.
///
/// Thread-safe and can be shared across handlers via `Arc`.
#[derive(Debug, Default)]
pub struct ConnectionManager {
    /// All active connections, keyed by connection ID.
    connections: DashMap<String, Connection>,
    /// Subscribed connection IDs by record ID.
    subscribers: DashMap<String, HashSet<String>>,
}

impl ConnectionManager {
    /// Create a new connection manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new connection manager wrapped in Arc for sharing.
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Register a new connection.
    ///
    /// Returns the connection ID.
    pub fn register(&self, member: String, sender: MessageSender) -> String {
        let conn_id = uuid::Uuid::new_v4().to_string();

        let connection = Connection {
            member,
            sender,
            records: HashSet::new(),
        };
        self.connections.insert(conn_id.clone(), connection);

        tracing::info!(conn_id = %conn_id, "WebSocket connection registered");

        conn_id
    }

    /// Unregister a connection and drop its subscriptions.
    pub fn unregister(&self, conn_id: &str) {
        if let Some((_, conn)) = self.connections.remove(conn_id) {
            for record_id in &conn.records {
                self.remove_subscriber(record_id, conn_id);
            }

            tracing::info!(
                conn_id = %conn_id,
                member = %conn.member,
                "WebSocket connection unregistered"
            );
        }
    }

    /// Subscribe a connection to a record's notifications.
    ///
    /// Returns false if the connection is unknown.
    pub fn subscribe(&self, conn_id: &str, record_id: &str) -> bool {
        let Some(mut conn) = self.connections.get_mut(conn_id) else {
            return false;
        };
        conn.records.insert(record_id.to_string());
        drop(conn);

        self.subscribers
            .entry(record_id.to_string())
            .or_default()
            .insert(conn_id.to_string());

        tracing::debug!(conn_id = %conn_id, record_id = %record_id, "Subscribed");
        true
    }

    /// Unsubscribe a connection from a record. Returns whether it was subscribed.
    pub fn unsubscribe(&self, conn_id: &str, record_id: &str) -> bool {
        let removed = match self.connections.get_mut(conn_id) {
            Some(mut conn) => conn.records.remove(record_id),
            None => false,
        };
        if removed {
            self.remove_subscriber(record_id, conn_id);
        }
        removed
    }

    fn remove_subscriber(&self, record_id: &str, conn_id: &str) {
        if let Some(mut conn_ids) = self.subscribers.get_mut(record_id) {
            conn_ids.remove(conn_id);
            // Clean up empty entries
            if conn_ids.is_empty() {
                drop(conn_ids);
                self.subscribers.remove(record_id);
            }
        }
    }

    /// Send a message to every subscriber of a record.
    ///
    /// Returns the number of connections that received the message.
    pub fn broadcast_record(&self, record_id: &str, message: ServerMessage) -> usize {
        let conn_ids: Vec<String> = match self.subscribers.get(record_id) {
            Some(conn_ids) => conn_ids.iter().cloned().collect(),
            None => return 0,
        };

        let sent_count = conn_ids
            .iter()
            .filter(|conn_id| self.send_to(conn_id, message.clone()))
            .count();

        tracing::debug!(
            record_id = %record_id,
            recipients = sent_count,
            "Broadcast message to subscribers"
        );

        sent_count
    }

    /// Send a message to a specific connection.
    pub fn send_to(&self, conn_id: &str, message: ServerMessage) -> bool {
        match self.connections.get(conn_id) {
            Some(conn) => conn.sender.send(message).is_ok(),
            None => false,
        }
    }

    /// Get the number of active connections.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Get the number of connections subscribed to a record.
    pub fn subscriber_count(&self, record_id: &str) -> usize {
        self.subscribers
            .get(record_id)
            .map(|conn_ids| conn_ids.len())
            .unwrap_or(0)
    }
}
