//! Notification queue — enqueue with synchronous validation.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use staffhub_core::config::notify::NotifyConfig;
use staffhub_core::error::AppError;
use staffhub_core::result::AppResult;
use staffhub_core::types::id::{NotificationId, PropertyId, UserId};
use staffhub_database::NotificationStore;
use staffhub_entity::notification::{
    ChannelKind, EventType, Notification, NotificationPriority, NotificationStatus,
};

/// Parameters for enqueuing one notification.
#[derive(Debug, Clone)]
pub struct EnqueueParams {
    /// The recipient.
    pub user_id: UserId,
    /// Event type that produced this notification.
    pub event_type: EventType,
    /// Property scope, when the event is property-scoped.
    pub property_id: Option<PropertyId>,
    /// Headline.
    pub title: String,
    /// Body text.
    pub body: String,
    /// Additional structured data.
    pub payload: Option<serde_json::Value>,
    /// Requested delivery channels.
    pub channels: Vec<ChannelKind>,
    /// Priority level.
    pub priority: NotificationPriority,
    /// Earliest dispatch time; `None` means now.
    pub scheduled_for: Option<DateTime<Utc>>,
    /// Hard expiry; `None` means none.
    pub expires_at: Option<DateTime<Utc>>,
}

/// Accepts notification requests and persists them `pending`.
#[derive(Clone)]
pub struct NotificationQueue {
    store: Arc<dyn NotificationStore>,
    config: NotifyConfig,
}

impl std::fmt::Debug for NotificationQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationQueue").finish()
    }
}

impl NotificationQueue {
    /// Create a queue over the given store.
    pub fn new(store: Arc<dyn NotificationStore>, config: NotifyConfig) -> Self {
        Self { store, config }
    }

    /// Validate and persist one notification request.
    ///
    /// Rejections are the caller's responsibility, reported synchronously:
    /// empty channel set, a `scheduled_for` already in the past, or an
    /// expiry at or before the effective schedule.
    pub async fn enqueue(&self, params: EnqueueParams) -> AppResult<NotificationId> {
        let now = Utc::now();

        if params.channels.is_empty() {
            return Err(AppError::validation(
                "A notification needs at least one delivery channel",
            ));
        }
        if let Some(scheduled_for) = params.scheduled_for {
            if scheduled_for < now {
                return Err(AppError::validation(format!(
                    "scheduled_for is in the past: {scheduled_for}"
                )));
            }
        }
        let scheduled_for = params.scheduled_for.unwrap_or(now);
        if let Some(expires_at) = params.expires_at {
            if expires_at <= scheduled_for {
                return Err(AppError::validation(
                    "expires_at must be after the scheduled dispatch time",
                ));
            }
        }

        let mut channels: Vec<ChannelKind> = Vec::with_capacity(params.channels.len());
        for channel in params.channels {
            if !channels.contains(&channel) {
                channels.push(channel);
            }
        }

        let notification = Notification {
            id: NotificationId::new(),
            user_id: params.user_id,
            event_type: params.event_type,
            property_id: params.property_id,
            title: params.title,
            body: params.body,
            payload: params.payload,
            channels,
            delivered_channels: Vec::new(),
            priority: params.priority,
            status: NotificationStatus::Pending,
            retry_count: 0,
            max_retries: self.config.max_retries,
            last_error: None,
            scheduled_for,
            expires_at: params.expires_at,
            created_at: now,
            delivered_at: None,
            is_read: false,
            read_at: None,
        };

        self.store.insert(&notification).await?;

        debug!(
            notification_id = %notification.id,
            user_id = %notification.user_id,
            event_type = %notification.event_type,
            priority = %notification.priority,
            "Notification enqueued"
        );
        Ok(notification.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use staffhub_database::memory::MemoryNotificationStore;

    fn queue() -> (NotificationQueue, Arc<MemoryNotificationStore>) {
        let store = Arc::new(MemoryNotificationStore::new());
        (
            NotificationQueue::new(store.clone(), NotifyConfig::default()),
            store,
        )
    }

    fn params() -> EnqueueParams {
        EnqueueParams {
            user_id: UserId::new(),
            event_type: EventType::ApplicationSubmitted,
            property_id: None,
            title: "New job application".to_string(),
            body: "A candidate applied".to_string(),
            payload: None,
            channels: vec![ChannelKind::InApp],
            priority: NotificationPriority::Normal,
            scheduled_for: None,
            expires_at: None,
        }
    }

    #[tokio::test]
    async fn test_enqueue_persists_pending() {
        let (queue, store) = queue();
        let id = queue.enqueue(params()).await.expect("enqueue");
        let stored = store.get(id).await.unwrap().expect("stored");
        assert_eq!(stored.status, NotificationStatus::Pending);
        assert_eq!(stored.max_retries, 3);
    }

    #[tokio::test]
    async fn test_rejects_empty_channels() {
        let (queue, _) = queue();
        let mut p = params();
        p.channels.clear();
        let err = queue.enqueue(p).await.unwrap_err();
        assert_eq!(err.kind, staffhub_core::error::ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_rejects_past_schedule() {
        let (queue, _) = queue();
        let mut p = params();
        p.scheduled_for = Some(Utc::now() - chrono::Duration::minutes(5));
        assert!(queue.enqueue(p).await.is_err());
    }

    #[tokio::test]
    async fn test_rejects_expiry_before_schedule() {
        let (queue, _) = queue();
        let mut p = params();
        p.scheduled_for = Some(Utc::now() + chrono::Duration::hours(2));
        p.expires_at = Some(Utc::now() + chrono::Duration::hours(1));
        assert!(queue.enqueue(p).await.is_err());
    }
}
