//! Connection manager — lifecycle, room authorization, and broadcast.

use std::str::FromStr;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use staffhub_auth::access::cache::AccessCache;
use staffhub_auth::jwt::verifier::TokenVerifier;
use staffhub_core::config::realtime::RealtimeConfig;
use staffhub_core::error::AppError;
use staffhub_core::result::AppResult;
use staffhub_core::types::id::{NotificationId, UserId};
use staffhub_entity::user::UserRole;

use crate::message::types::{InboundMessage, OutboundMessage};
use crate::metrics::EngineMetrics;
use crate::room::key::RoomKey;
use crate::room::registry::RoomRegistry;

use super::handle::{ConnectionHandle, ConnectionId, SendOutcome};
use super::pool::ConnectionPool;

/// A notification acknowledgement raised over a connection, forwarded to
/// the read-side consumer.
pub type AckEvent = (UserId, NotificationId);

/// Manages all live connections.
#[derive(Debug)]
pub struct ConnectionManager {
    /// Connection pool.
    pool: Arc<ConnectionPool>,
    /// Room registry.
    rooms: Arc<RoomRegistry>,
    /// Property-access cache gating manager subscriptions.
    access: Arc<AccessCache>,
    /// Handshake credential verifier.
    verifier: Arc<TokenVerifier>,
    /// Metrics.
    metrics: Arc<EngineMetrics>,
    /// Configuration.
    config: RealtimeConfig,
    /// Optional sink for `ack` control messages.
    ack_tx: Option<mpsc::UnboundedSender<AckEvent>>,
}

impl ConnectionManager {
    /// Creates a new connection manager.
    pub fn new(
        config: RealtimeConfig,
        verifier: Arc<TokenVerifier>,
        access: Arc<AccessCache>,
        metrics: Arc<EngineMetrics>,
    ) -> Self {
        Self {
            pool: Arc::new(ConnectionPool::new()),
            rooms: Arc::new(RoomRegistry::new()),
            access,
            verifier,
            metrics,
            config,
            ack_tx: None,
        }
    }

    /// Attach a sink for notification acknowledgements.
    pub fn with_ack_sink(mut self, ack_tx: mpsc::UnboundedSender<AckEvent>) -> Self {
        self.ack_tx = Some(ack_tx);
        self
    }

    /// Registers a new connection after verifying the handshake credential.
    ///
    /// Fails with an authentication error when the credential is invalid
    /// or expired. On success the connection is auto-subscribed to the
    /// user's personal room and the `accepted` frame is already queued on
    /// the returned receiver.
    pub fn register(
        &self,
        credential: &str,
    ) -> AppResult<(Arc<ConnectionHandle>, mpsc::Receiver<String>)> {
        let identity = self.verifier.verify(credential)?;

        let (tx, rx) = mpsc::channel(self.config.channel_buffer_size);
        let handle = Arc::new(ConnectionHandle::new(
            identity.user_id,
            identity.role,
            identity.full_name,
            tx,
        ));

        // Per-user connection cap; the oldest connection gives way.
        let existing = self.pool.user_connections(&identity.user_id);
        if existing.len() >= self.config.max_connections_per_user {
            warn!(
                user_id = %identity.user_id,
                count = existing.len(),
                max = self.config.max_connections_per_user,
                "User at max connections, oldest will be replaced"
            );
            if let Some(oldest) = existing.first() {
                let oldest_id = oldest.id;
                self.disconnect(&oldest_id);
            }
        }

        self.pool.add(handle.clone());
        self.rooms.join(RoomKey::User(identity.user_id), handle.id);
        self.metrics.connection_opened();

        let accepted = OutboundMessage::Accepted {
            connection_id: handle.id,
        };
        handle.send(serde_json::to_string(&accepted).unwrap_or_default());

        info!(
            conn_id = %handle.id,
            user_id = %identity.user_id,
            role = %identity.role,
            "Connection registered"
        );

        Ok((handle, rx))
    }

    /// Subscribes a connection to a room, enforcing role and property
    /// authorization.
    pub async fn subscribe(&self, conn_id: &ConnectionId, room: RoomKey) -> AppResult<()> {
        let handle = self
            .pool
            .get(conn_id)
            .ok_or_else(|| AppError::not_found(format!("Unknown connection: {conn_id}")))?;

        if self.rooms.subscription_count(handle.id) >= self.config.max_subscriptions_per_connection
        {
            return Err(AppError::validation(format!(
                "Maximum subscriptions ({}) reached",
                self.config.max_subscriptions_per_connection
            )));
        }

        self.authorize_subscription(&handle, &room).await?;
        self.rooms.join(room, handle.id);
        debug!(conn_id = %conn_id, room = %room, "Subscribed to room");
        Ok(())
    }

    /// Checks whether a connection's subject may join a room.
    async fn authorize_subscription(
        &self,
        handle: &ConnectionHandle,
        room: &RoomKey,
    ) -> AppResult<()> {
        // Admins may join any room; everything below is for the rest.
        if handle.role.is_admin() {
            return Ok(());
        }

        match room {
            RoomKey::Global => {
                warn!(
                    conn_id = %handle.id,
                    user_id = %handle.user_id,
                    "Non-admin attempted to join the global room"
                );
                Err(AppError::authorization(
                    "The global room is restricted to administrators",
                ))
            }
            RoomKey::User(user_id) => {
                if *user_id == handle.user_id {
                    Ok(())
                } else {
                    warn!(
                        conn_id = %handle.id,
                        user_id = %handle.user_id,
                        target = %user_id,
                        "Attempt to join another user's personal room"
                    );
                    Err(AppError::authorization(
                        "Cannot join another user's personal room",
                    ))
                }
            }
            RoomKey::Property(property_id) => {
                if handle.role != UserRole::Manager {
                    warn!(
                        conn_id = %handle.id,
                        user_id = %handle.user_id,
                        property_id = %property_id,
                        "Non-manager attempted to join a property room"
                    );
                    return Err(AppError::authorization(
                        "Property rooms are restricted to assigned managers",
                    ));
                }
                let authorized = self.access.authorized_properties(handle.user_id).await?;
                if authorized.contains(property_id) {
                    Ok(())
                } else {
                    warn!(
                        conn_id = %handle.id,
                        user_id = %handle.user_id,
                        property_id = %property_id,
                        "Manager attempted to join an unassigned property room"
                    );
                    Err(AppError::authorization(format!(
                        "Not assigned to property {property_id}"
                    )))
                }
            }
        }
    }

    /// Unsubscribes a connection from a room. A no-op when the connection
    /// is not a member.
    pub fn unsubscribe(&self, conn_id: &ConnectionId, room: RoomKey) {
        self.rooms.leave(room, *conn_id);
        debug!(conn_id = %conn_id, room = %room, "Unsubscribed from room");
    }

    /// Refreshes a connection's heartbeat timestamp.
    pub async fn heartbeat(&self, conn_id: &ConnectionId) {
        if let Some(handle) = self.pool.get(conn_id) {
            handle.touch().await;
        }
    }

    /// Tears down a connection: marks it dead, removes it from the pool,
    /// and vacates all its rooms in one pass. Idempotent.
    pub fn disconnect(&self, conn_id: &ConnectionId) {
        if let Some(handle) = self.pool.remove(conn_id) {
            handle.mark_dead();
            self.rooms.leave_all(*conn_id);
            self.metrics.connection_closed();
            info!(
                conn_id = %conn_id,
                user_id = %handle.user_id,
                "Connection closed"
            );
        }
    }

    /// Broadcasts an event to every member of a room.
    ///
    /// The frame is serialized once; sends are independent non-blocking
    /// pushes onto each member's buffer, so delivery cost is O(room size)
    /// and a slow consumer cannot stall the rest. Members whose receiver
    /// is gone are unregistered as a side effect, not counted as
    /// failures. Returns the number of members the frame was queued for.
    pub fn broadcast(&self, room: &RoomKey, event: &OutboundMessage) -> usize {
        let members = self.rooms.members(room);
        self.metrics.broadcast();
        if members.is_empty() {
            return 0;
        }

        let frame = match serde_json::to_string(event) {
            Ok(f) => f,
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize broadcast frame");
                return 0;
            }
        };

        let mut delivered = 0usize;
        let mut dead: Vec<ConnectionId> = Vec::new();
        for conn_id in &members {
            match self.pool.get(conn_id) {
                Some(handle) => match handle.send(frame.clone()) {
                    SendOutcome::Sent => delivered += 1,
                    SendOutcome::Dropped => {}
                    SendOutcome::Closed => dead.push(*conn_id),
                },
                None => dead.push(*conn_id),
            }
        }

        for conn_id in &dead {
            self.disconnect(conn_id);
        }

        self.metrics.messages_sent(delivered as u64);
        delivered
    }

    /// Processes one inbound control frame from a client.
    ///
    /// Single decode-then-match path; errors are reported only to the
    /// offending connection and never affect other room members.
    pub async fn handle_inbound(&self, conn_id: &ConnectionId, raw: &str) {
        let Some(handle) = self.pool.get(conn_id) else {
            warn!(conn_id = %conn_id, "Frame from unknown connection");
            return;
        };

        let msg: InboundMessage = match serde_json::from_str(raw) {
            Ok(m) => m,
            Err(e) => {
                self.send_error(&handle, "INVALID_MESSAGE", &format!("Unparseable frame: {e}"));
                return;
            }
        };

        match msg {
            InboundMessage::Subscribe { room } => match RoomKey::from_str(&room) {
                Ok(key) => match self.subscribe(conn_id, key).await {
                    Ok(()) => {
                        let ack = OutboundMessage::Subscribed { room };
                        handle.send(serde_json::to_string(&ack).unwrap_or_default());
                    }
                    Err(e) => self.send_error(&handle, &e.kind.to_string(), &e.message),
                },
                Err(e) => self.send_error(&handle, &e.kind.to_string(), &e.message),
            },
            InboundMessage::Unsubscribe { room } => match RoomKey::from_str(&room) {
                Ok(key) => self.unsubscribe(conn_id, key),
                Err(e) => self.send_error(&handle, &e.kind.to_string(), &e.message),
            },
            InboundMessage::Heartbeat => {
                handle.touch().await;
                let ack = OutboundMessage::HeartbeatAck;
                handle.send(serde_json::to_string(&ack).unwrap_or_default());
            }
            InboundMessage::Ack { notification_id } => {
                debug!(
                    conn_id = %conn_id,
                    notification_id = %notification_id,
                    "Notification acknowledged"
                );
                if let Some(ack_tx) = &self.ack_tx {
                    let _ = ack_tx.send((
                        handle.user_id,
                        NotificationId::from_uuid(notification_id),
                    ));
                }
            }
        }
    }

    fn send_error(&self, handle: &ConnectionHandle, code: &str, message: &str) {
        let frame = OutboundMessage::Error {
            code: code.to_string(),
            message: message.to_string(),
        };
        handle.send(serde_json::to_string(&frame).unwrap_or_default());
    }

    /// Returns the total connection count.
    pub fn connection_count(&self) -> usize {
        self.pool.connection_count()
    }

    /// Returns the number of unique connected users.
    pub fn user_count(&self) -> usize {
        self.pool.user_count()
    }

    /// Checks if a user has at least one live connection.
    pub fn is_user_connected(&self, user_id: &UserId) -> bool {
        !self.pool.user_connections(user_id).is_empty()
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &Arc<ConnectionPool> {
        &self.pool
    }

    /// Returns a reference to the room registry.
    pub fn rooms(&self) -> &Arc<RoomRegistry> {
        &self.rooms
    }

    /// Returns the engine configuration.
    pub fn config(&self) -> &RealtimeConfig {
        &self.config
    }
}
