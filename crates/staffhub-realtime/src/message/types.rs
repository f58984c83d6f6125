//! Inbound and outbound wire message type definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::connection::handle::ConnectionId;
use crate::room::key::RoomKey;

/// Control messages sent by the client to the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundMessage {
    /// Join a room.
    Subscribe {
        /// Room key, e.g. `"property:{uuid}"`.
        room: String,
    },
    /// Leave a room.
    Unsubscribe {
        /// Room key.
        room: String,
    },
    /// Keepalive; refreshes the server-side heartbeat timestamp.
    Heartbeat,
    /// Acknowledge (mark read) a delivered notification.
    Ack {
        /// Notification ID being acknowledged.
        notification_id: Uuid,
    },
}

/// Messages sent by the server to the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    /// Handshake accepted.
    Accepted {
        /// Assigned connection ID.
        connection_id: ConnectionId,
    },
    /// Subscription confirmed.
    Subscribed {
        /// Room key.
        room: String,
    },
    /// Broadcast event delivery.
    Event {
        /// Room the event was broadcast to.
        room: String,
        /// Event type.
        event_type: String,
        /// Event payload.
        payload: serde_json::Value,
        /// Server-side broadcast timestamp.
        timestamp: DateTime<Utc>,
    },
    /// Heartbeat acknowledgement.
    HeartbeatAck,
    /// Error, reported only to the offending connection.
    Error {
        /// Error code.
        code: String,
        /// Error description.
        message: String,
    },
}

impl OutboundMessage {
    /// Build a broadcast event frame stamped with the current time.
    pub fn event(room: &RoomKey, event_type: &str, payload: serde_json::Value) -> Self {
        Self::Event {
            room: room.to_string(),
            event_type: event_type.to_string(),
            payload,
            timestamp: Utc::now(),
        }
    }
}
