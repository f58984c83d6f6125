//! Individual connection handle.

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use uuid::Uuid;

use staffhub_core::types::id::UserId;
use staffhub_entity::user::UserRole;

/// Unique connection identifier.
pub type ConnectionId = Uuid;

/// Outcome of pushing a frame onto a connection's send buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Frame queued for delivery.
    Sent,
    /// Send buffer full; frame dropped for this connection only.
    Dropped,
    /// Receiver gone; the connection is dead.
    Closed,
}

/// A handle to a single live connection.
///
/// Holds the sender half of the connection's outbound buffer plus
/// metadata about the authenticated subject. Frames are serialized once
/// by the caller and pushed with a non-blocking `try_send`, so one slow
/// consumer can never stall fan-out to the rest of a room.
#[derive(Debug)]
pub struct ConnectionHandle {
    /// Unique connection ID.
    pub id: ConnectionId,
    /// User who owns this connection.
    pub user_id: UserId,
    /// The user's role (cached from the verified credential).
    pub role: UserRole,
    /// Display name (cached from the verified credential).
    pub full_name: String,
    /// Sender for serialized outbound frames.
    sender: mpsc::Sender<String>,
    /// When the connection was established.
    pub connected_at: DateTime<Utc>,
    /// Last heartbeat timestamp.
    last_heartbeat: tokio::sync::RwLock<DateTime<Utc>>,
    /// Whether the connection is still alive.
    alive: AtomicBool,
}

impl ConnectionHandle {
    /// Create a new connection handle.
    pub fn new(
        user_id: UserId,
        role: UserRole,
        full_name: String,
        sender: mpsc::Sender<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            role,
            full_name,
            sender,
            connected_at: now,
            last_heartbeat: tokio::sync::RwLock::new(now),
            alive: AtomicBool::new(true),
        }
    }

    /// Push a serialized frame onto the send buffer.
    pub fn send(&self, frame: String) -> SendOutcome {
        if !self.is_alive() {
            return SendOutcome::Closed;
        }
        match self.sender.try_send(frame) {
            Ok(()) => SendOutcome::Sent,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(conn_id = %self.id, "Send buffer full, dropping frame");
                SendOutcome::Dropped
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.mark_dead();
                SendOutcome::Closed
            }
        }
    }

    /// Check if the connection is alive.
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Mark the connection as dead.
    pub fn mark_dead(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }

    /// Refresh the heartbeat timestamp.
    pub async fn touch(&self) {
        let mut hb = self.last_heartbeat.write().await;
        *hb = Utc::now();
    }

    /// Read the heartbeat timestamp.
    pub async fn last_heartbeat(&self) -> DateTime<Utc> {
        *self.last_heartbeat.read().await
    }
}
