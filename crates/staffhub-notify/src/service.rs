//! Read-side notification service for dashboards and clients.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use staffhub_core::error::AppError;
use staffhub_core::result::AppResult;
use staffhub_core::types::cursor::{CursorPage, PageCursor, clamp_limit};
use staffhub_core::types::id::{NotificationId, UserId};
use staffhub_database::NotificationStore;
use staffhub_entity::notification::Notification;
use staffhub_realtime::connection::manager::AckEvent;

/// Query and read-state operations, outside the real-time path.
#[derive(Clone)]
pub struct NotificationReader {
    store: Arc<dyn NotificationStore>,
}

impl std::fmt::Debug for NotificationReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationReader").finish()
    }
}

impl NotificationReader {
    /// Create a reader over the given store.
    pub fn new(store: Arc<dyn NotificationStore>) -> Self {
        Self { store }
    }

    /// List a recipient's notifications, newest first.
    pub async fn list_notifications(
        &self,
        user_id: UserId,
        unread_only: bool,
        limit: Option<u32>,
        cursor: Option<&str>,
    ) -> AppResult<CursorPage<Notification>> {
        let cursor = cursor.map(PageCursor::decode).transpose()?;
        self.store
            .list_for_user(user_id, unread_only, clamp_limit(limit), cursor)
            .await
    }

    /// Mark one notification read. Idempotent; a notification that does
    /// not exist or belongs to someone else is a not-found error.
    pub async fn mark_read(&self, id: NotificationId, reader: UserId) -> AppResult<()> {
        if self.store.mark_read(id, reader, Utc::now()).await? {
            Ok(())
        } else {
            Err(AppError::not_found(format!("Notification not found: {id}")))
        }
    }

    /// Mark all of a user's notifications read. Returns the number updated.
    pub async fn mark_all_read(&self, user_id: UserId) -> AppResult<u64> {
        self.store.mark_all_read(user_id, Utc::now()).await
    }

    /// Count a user's unread notifications.
    pub async fn unread_count(&self, user_id: UserId) -> AppResult<i64> {
        self.store.count_unread(user_id).await
    }
}

/// Consume `ack` control frames from the real-time engine, marking the
/// acknowledged notifications read.
pub async fn run_ack_loop(reader: NotificationReader, mut ack_rx: mpsc::UnboundedReceiver<AckEvent>) {
    while let Some((user_id, notification_id)) = ack_rx.recv().await {
        match reader.mark_read(notification_id, user_id).await {
            Ok(()) => {
                debug!(
                    user_id = %user_id,
                    notification_id = %notification_id,
                    "Notification marked read via ack"
                );
            }
            Err(e) => {
                // An ack for an unknown id is client noise, not a fault.
                warn!(
                    user_id = %user_id,
                    notification_id = %notification_id,
                    error = %e,
                    "Ignoring ack for unknown notification"
                );
            }
        }
    }
}
