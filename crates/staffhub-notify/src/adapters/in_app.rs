//! In-app adapter — delivery via the room broadcaster.

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use staffhub_core::types::id::UserId;
use staffhub_entity::notification::ChannelKind;
use staffhub_realtime::connection::manager::ConnectionManager;
use staffhub_realtime::message::types::OutboundMessage;
use staffhub_realtime::room::key::RoomKey;

use super::{ChannelAdapter, DeliveryError};

/// Delivers notifications to the recipient's personal room.
///
/// By default this is fire-and-forget: the notification counts as
/// delivered as soon as the broadcast returns, live connections or not —
/// an offline recipient catches up through the notification list. With
/// `requires_listener` set, a zero-receiver broadcast is a transient
/// failure instead.
#[derive(Debug)]
pub struct InAppAdapter {
    connections: Arc<ConnectionManager>,
    requires_listener: bool,
}

impl InAppAdapter {
    /// Create an in-app adapter over the connection manager.
    pub fn new(connections: Arc<ConnectionManager>, requires_listener: bool) -> Self {
        Self {
            connections,
            requires_listener,
        }
    }
}

#[async_trait]
impl ChannelAdapter for InAppAdapter {
    fn channel(&self) -> ChannelKind {
        ChannelKind::InApp
    }

    async fn send(
        &self,
        address: &str,
        _subject: &str,
        _body: &str,
        metadata: &serde_json::Value,
    ) -> Result<(), DeliveryError> {
        let user_id = UserId::from_str(address)
            .map_err(|_| DeliveryError::Permanent(format!("Invalid user id: '{address}'")))?;

        let room = RoomKey::User(user_id);
        let event_type = metadata
            .get("event_type")
            .and_then(|v| v.as_str())
            .unwrap_or("notification");
        let frame = OutboundMessage::event(&room, event_type, metadata.clone());

        let delivered = self.connections.broadcast(&room, &frame);
        debug!(
            user_id = %user_id,
            delivered,
            "In-app notification broadcast"
        );

        if self.requires_listener && delivered == 0 {
            return Err(DeliveryError::Transient(
                "No live connections for recipient".to_string(),
            ));
        }
        Ok(())
    }
}
