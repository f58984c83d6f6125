//! Notification entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use staffhub_core::types::id::{NotificationId, PropertyId, UserId};

use super::channel::ChannelKind;
use super::event_type::EventType;
use super::priority::NotificationPriority;
use super::status::NotificationStatus;

/// One logical message to one recipient.
///
/// Delivery status, retry bookkeeping, and the delivered-channel set are
/// mutated only by the dispatcher; channel adapters return results and
/// never touch the record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    /// Unique notification identifier.
    pub id: NotificationId,
    /// The recipient user.
    pub user_id: UserId,
    /// Event type that produced this notification.
    pub event_type: EventType,
    /// Property scope, when the event is property-scoped.
    pub property_id: Option<PropertyId>,
    /// Notification headline.
    pub title: String,
    /// Notification body text.
    pub body: String,
    /// Additional structured data.
    pub payload: Option<serde_json::Value>,
    /// Channels this notification must go out on.
    pub channels: Vec<ChannelKind>,
    /// Channels that have already confirmed delivery.
    pub delivered_channels: Vec<ChannelKind>,
    /// Priority level.
    pub priority: NotificationPriority,
    /// Delivery lifecycle state.
    pub status: NotificationStatus,
    /// Delivery attempts consumed so far.
    pub retry_count: u32,
    /// Attempt bound; exceeding it dead-letters the notification.
    pub max_retries: u32,
    /// Most recent delivery error, if any.
    pub last_error: Option<String>,
    /// Earliest dispatch time. Backoff re-queues push this forward.
    pub scheduled_for: DateTime<Utc>,
    /// Hard expiry; past this the notification is never dispatched.
    pub expires_at: Option<DateTime<Utc>>,
    /// When the notification was enqueued.
    pub created_at: DateTime<Utc>,
    /// When all channels confirmed delivery.
    pub delivered_at: Option<DateTime<Utc>>,
    /// Whether the recipient has read this notification.
    pub is_read: bool,
    /// When the notification was read.
    pub read_at: Option<DateTime<Utc>>,
}

impl Notification {
    /// Check whether the notification has expired as of `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|exp| exp <= now).unwrap_or(false)
    }

    /// Channels still awaiting a successful delivery.
    pub fn pending_channels(&self) -> Vec<ChannelKind> {
        self.channels
            .iter()
            .copied()
            .filter(|c| !self.delivered_channels.contains(c))
            .collect()
    }

    /// Whether every requested channel has confirmed delivery.
    pub fn all_channels_delivered(&self) -> bool {
        self.pending_channels().is_empty()
    }
}

/// Outcome of a single adapter invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AttemptOutcome {
    /// The adapter confirmed delivery.
    Success,
    /// The adapter reported a failure.
    Failure {
        /// Error detail from the adapter.
        reason: String,
        /// Whether the failure is worth retrying.
        retryable: bool,
    },
}

/// Ephemeral record of one adapter invocation for one notification/channel
/// pair. Drives the retry decision within a dispatch pass; not persisted
/// beyond the notification's own `retry_count` and `last_error`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryAttempt {
    /// Channel attempted.
    pub channel: ChannelKind,
    /// When the attempt was made.
    pub attempted_at: DateTime<Utc>,
    /// What happened.
    pub outcome: AttemptOutcome,
}
