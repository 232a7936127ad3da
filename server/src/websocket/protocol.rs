//! WebSocket message protocol definitions.
//!
//! All messages are JSON-encoded, tagged by `type`, and use snake_case for
//! field names.

use serde::{Deserialize, Serialize};

use crate::db::Fields;

/// Messages sent from client to server.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Start receiving change notifications for a record.
    Subscribe { record_id: String },

    /// Stop receiving change notifications for a record.
    Unsubscribe { record_id: String },

    /// Keep-alive ping.
    Ping,
}

/// Messages sent from server to client.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Fields of a record changed. Carries the stored values of the changed
    /// keys only.
    RecordChanged {
        record_id: String,
        values: Fields,
        version: i64,
    },

    /// The watcher count of a record changed.
    WatchChanged { record_id: String, count: u64 },

    /// Acknowledges a subscribe.
    Subscribed { record_id: String },

    /// Acknowledges an unsubscribe.
    Unsubscribed { record_id: String },

    /// Response to ping.
    Pong,

    /// Error message.
    Error { message: String },
}

impl ServerMessage {
    /// Create an error message.
    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_client_message_deserialization() {
        let json = r#"{"type": "subscribe", "record_id": "board-1"}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        assert_eq!(
            msg,
            ClientMessage::Subscribe {
                record_id: "board-1".to_string()
            }
        );

        let json = r#"{"type": "ping"}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        assert_eq!(msg, ClientMessage::Ping);

        let json = r#"{"type": "push", "operations": []}"#;
        assert!(serde_json::from_str::<ClientMessage>(json).is_err());
    }

    #[test]
    fn test_server_message_serialization() {
        let msg = ServerMessage::Pong;
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(json, r#"{"type":"pong"}"#);

        let msg = ServerMessage::RecordChanged {
            record_id: "board-1".into(),
            values: Fields::from([("title".to_string(), json!("Q3"))]),
            version: 4,
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            json,
            json!({
                "type": "record_changed",
                "record_id": "board-1",
                "values": {"title": "Q3"},
                "version": 4
            })
        );

        let msg = ServerMessage::error("test error");
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(json, r#"{"type":"error","message":"test error"}"#);
    }
}
