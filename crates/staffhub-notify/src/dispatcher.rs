//! Dispatcher — drives the notification state machine.
//!
//! One background loop claims the ready set and fans delivery tasks out
//! over a bounded worker pool. Only this component mutates delivery
//! status; adapter failures are folded into notification state and never
//! into the loop's control flow, so one bad notification cannot stall
//! the rest of the batch.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{Semaphore, mpsc, watch};
use tokio::time;
use tracing::{debug, error, info, warn};

use staffhub_core::config::notify::NotifyConfig;
use staffhub_core::result::AppResult;
use staffhub_core::types::id::{NotificationId, UserId};
use staffhub_database::{NotificationStore, StaffDirectory};
use staffhub_entity::notification::model::{AttemptOutcome, DeliveryAttempt};
use staffhub_entity::notification::{ChannelKind, Notification, NotificationStatus};

use crate::adapters::{ChannelAdapter, DeliveryError};
use crate::backoff;

/// Terminal failure signal emitted when a notification dead-letters.
#[derive(Debug, Clone)]
pub struct DeadLetter {
    /// The dead-lettered notification.
    pub notification_id: NotificationId,
    /// Its recipient.
    pub user_id: UserId,
    /// Why delivery ultimately failed.
    pub reason: String,
}

/// Dispatches ready notifications through the channel adapters.
pub struct Dispatcher {
    store: Arc<dyn NotificationStore>,
    directory: Arc<dyn StaffDirectory>,
    adapters: HashMap<ChannelKind, Arc<dyn ChannelAdapter>>,
    config: NotifyConfig,
    workers: Arc<Semaphore>,
    dead_letter_tx: Option<mpsc::UnboundedSender<DeadLetter>>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("adapters", &self.adapters.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Dispatcher {
    /// Create a dispatcher over the given store and adapters.
    pub fn new(
        store: Arc<dyn NotificationStore>,
        directory: Arc<dyn StaffDirectory>,
        config: NotifyConfig,
    ) -> Self {
        Self {
            store,
            directory,
            adapters: HashMap::new(),
            workers: Arc::new(Semaphore::new(config.concurrency)),
            config,
            dead_letter_tx: None,
        }
    }

    /// Register a channel adapter.
    pub fn register(&mut self, adapter: Arc<dyn ChannelAdapter>) {
        let channel = adapter.channel();
        info!(channel = %channel, "Registered channel adapter");
        self.adapters.insert(channel, adapter);
    }

    /// Attach a sink for terminal failure signals.
    pub fn with_dead_letter_sink(mut self, tx: mpsc::UnboundedSender<DeadLetter>) -> Self {
        self.dead_letter_tx = Some(tx);
        self
    }

    /// One dispatch pass: re-queue failed rows whose backoff elapsed,
    /// claim the ready set, and deliver it through the worker pool.
    /// Returns the number of notifications processed.
    pub async fn dispatch_ready(self: &Arc<Self>) -> AppResult<usize> {
        let now = Utc::now();
        let requeued = self.store.requeue_failed(now).await?;
        if requeued > 0 {
            debug!(count = requeued, "Re-queued failed notifications after backoff");
        }

        let claimed = self
            .store
            .claim_ready(now, self.config.dispatch_batch_size)
            .await?;
        if claimed.is_empty() {
            return Ok(0);
        }

        let count = claimed.len();
        debug!(count, "Claimed ready notifications");

        let mut tasks = Vec::with_capacity(count);
        for notification in claimed {
            let permit = self
                .workers
                .clone()
                .acquire_owned()
                .await
                .expect("worker semaphore closed");
            let this = Arc::clone(self);
            tasks.push(tokio::spawn(async move {
                let _permit = permit;
                this.process_one(notification).await;
            }));
        }
        for task in tasks {
            let _ = task.await;
        }
        Ok(count)
    }

    /// Run the dispatcher loop until the cancel signal fires.
    pub async fn run(self: Arc<Self>, mut cancel: watch::Receiver<bool>) {
        info!(
            concurrency = self.config.concurrency,
            poll_interval = self.config.poll_interval_seconds,
            "Dispatcher started"
        );
        let mut interval = time::interval(Duration::from_secs(self.config.poll_interval_seconds));

        loop {
            tokio::select! {
                _ = cancel.changed() => {
                    if *cancel.borrow() {
                        info!("Dispatcher received shutdown signal");
                        break;
                    }
                }
                _ = interval.tick() => {
                    if let Err(e) = self.dispatch_ready().await {
                        error!(error = %e, "Dispatch pass failed");
                    }
                }
            }
        }

        // Drain in-flight delivery tasks before returning.
        let _ = time::timeout(
            Duration::from_secs(30),
            self.workers.acquire_many(self.config.concurrency as u32),
        )
        .await;
        info!("Dispatcher shut down");
    }

    /// Deliver one claimed notification across its pending channels and
    /// write the resulting state back.
    async fn process_one(&self, mut notification: Notification) {
        let now = Utc::now();

        // Claim-to-dispatch race: the expiry may have passed since the
        // ready-set scan.
        if notification.is_expired(now) {
            notification.status = NotificationStatus::Cancelled;
            info!(
                notification_id = %notification.id,
                "Notification expired before dispatch, cancelled"
            );
            self.write_back(&notification).await;
            return;
        }

        let mut attempts: Vec<DeliveryAttempt> = Vec::new();
        for channel in notification.pending_channels() {
            let outcome = self.deliver_channel(&notification, channel).await;
            match &outcome {
                Ok(()) => {
                    notification.delivered_channels.push(channel);
                    attempts.push(DeliveryAttempt {
                        channel,
                        attempted_at: Utc::now(),
                        outcome: AttemptOutcome::Success,
                    });
                }
                Err(e) => {
                    warn!(
                        notification_id = %notification.id,
                        channel = %channel,
                        error = %e,
                        "Channel delivery failed"
                    );
                    attempts.push(DeliveryAttempt {
                        channel,
                        attempted_at: Utc::now(),
                        outcome: AttemptOutcome::Failure {
                            reason: e.to_string(),
                            retryable: e.is_retryable(),
                        },
                    });
                }
            }
        }

        self.apply_attempts(&mut notification, &attempts);
        self.write_back(&notification).await;
    }

    /// Resolve the channel address and invoke the adapter under the hard
    /// timeout.
    async fn deliver_channel(
        &self,
        notification: &Notification,
        channel: ChannelKind,
    ) -> Result<(), DeliveryError> {
        let adapter = self.adapters.get(&channel).ok_or_else(|| {
            DeliveryError::Permanent(format!("No adapter registered for channel '{channel}'"))
        })?;

        let address = self.resolve_address(notification, channel).await?;
        let metadata = serde_json::json!({
            "notification_id": notification.id,
            "event_type": notification.event_type,
            "property_id": notification.property_id,
            "priority": notification.priority,
            "payload": notification.payload,
        });

        match time::timeout(
            Duration::from_secs(self.config.adapter_timeout_seconds),
            adapter.send(&address, &notification.title, &notification.body, &metadata),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(DeliveryError::Transient(format!(
                "Adapter for '{channel}' timed out after {}s",
                self.config.adapter_timeout_seconds
            ))),
        }
    }

    /// Channel-specific recipient address, from the directory for the
    /// outbound channels.
    async fn resolve_address(
        &self,
        notification: &Notification,
        channel: ChannelKind,
    ) -> Result<String, DeliveryError> {
        if channel == ChannelKind::InApp {
            return Ok(notification.user_id.to_string());
        }

        let contact = self
            .directory
            .contact(notification.user_id)
            .await
            .map_err(|e| DeliveryError::Transient(format!("Directory lookup failed: {e}")))?
            .ok_or_else(|| {
                DeliveryError::Permanent(format!("Unknown recipient: {}", notification.user_id))
            })?;

        let address = match channel {
            ChannelKind::Email => contact.email,
            ChannelKind::Sms => contact.phone,
            ChannelKind::Push => contact.push_token,
            ChannelKind::InApp => unreachable!(),
        };
        address.ok_or_else(|| {
            DeliveryError::Permanent(format!(
                "Recipient {} has no {channel} address on file",
                notification.user_id
            ))
        })
    }

    /// Fold a pass's attempt outcomes into the notification state.
    fn apply_attempts(&self, notification: &mut Notification, attempts: &[DeliveryAttempt]) {
        let now = Utc::now();

        let permanent: Option<&str> = attempts.iter().find_map(|a| match &a.outcome {
            AttemptOutcome::Failure { reason, retryable } if !retryable => Some(reason.as_str()),
            _ => None,
        });
        let transient: Option<&str> = attempts.iter().find_map(|a| match &a.outcome {
            AttemptOutcome::Failure { reason, retryable } if *retryable => Some(reason.as_str()),
            _ => None,
        });

        if let Some(reason) = permanent {
            notification.status = NotificationStatus::DeadLettered;
            notification.last_error = Some(reason.to_string());
            self.signal_dead_letter(notification, reason);
            return;
        }

        if let Some(reason) = transient {
            notification.retry_count += 1;
            notification.last_error = Some(reason.to_string());

            if notification.retry_count < notification.max_retries {
                let delay = backoff::delay_with_jitter(notification.retry_count, &self.config);
                notification.status = NotificationStatus::Failed;
                notification.scheduled_for = now
                    + chrono::Duration::from_std(delay).unwrap_or_else(|_| {
                        chrono::Duration::seconds(self.config.backoff_cap_seconds as i64)
                    });
                debug!(
                    notification_id = %notification.id,
                    retry_count = notification.retry_count,
                    next_attempt = %notification.scheduled_for,
                    "Notification failed, retry scheduled"
                );
            } else {
                notification.status = NotificationStatus::DeadLettered;
                self.signal_dead_letter(notification, reason);
            }
            return;
        }

        // No failures left: every requested channel has confirmed.
        notification.status = NotificationStatus::Delivered;
        notification.delivered_at = Some(now);
        debug!(notification_id = %notification.id, "Notification delivered on all channels");
    }

    fn signal_dead_letter(&self, notification: &Notification, reason: &str) {
        error!(
            notification_id = %notification.id,
            user_id = %notification.user_id,
            retry_count = notification.retry_count,
            reason = %reason,
            "Notification dead-lettered"
        );
        if let Some(tx) = &self.dead_letter_tx {
            let _ = tx.send(DeadLetter {
                notification_id: notification.id,
                user_id: notification.user_id,
                reason: reason.to_string(),
            });
        }
    }

    async fn write_back(&self, notification: &Notification) {
        if let Err(e) = self.store.update_delivery(notification).await {
            error!(
                notification_id = %notification.id,
                error = %e,
                "Failed to persist notification delivery state"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use staffhub_core::types::id::PropertyId;
    use staffhub_database::memory::{MemoryDirectory, MemoryNotificationStore};
    use staffhub_entity::notification::{EventType, NotificationPriority};

    fn claimed_notification() -> Notification {
        Notification {
            id: NotificationId::new(),
            user_id: UserId::new(),
            event_type: EventType::DeadlineReminder,
            property_id: Some(PropertyId::new()),
            title: "Onboarding deadline approaching".to_string(),
            body: "I-9 due tomorrow".to_string(),
            payload: None,
            channels: vec![ChannelKind::Email],
            delivered_channels: Vec::new(),
            priority: NotificationPriority::Normal,
            status: NotificationStatus::Sending,
            retry_count: 0,
            max_retries: 3,
            last_error: None,
            scheduled_for: Utc::now(),
            expires_at: None,
            created_at: Utc::now(),
            delivered_at: None,
            is_read: false,
            read_at: None,
        }
    }

    #[tokio::test]
    async fn test_expiry_between_claim_and_dispatch_cancels() {
        let store = Arc::new(MemoryNotificationStore::new());
        let directory = Arc::new(MemoryDirectory::new());
        let dispatcher = Dispatcher::new(store.clone(), directory, NotifyConfig::default());

        // Claimed, but the expiry passed before the worker got to it.
        let mut notification = claimed_notification();
        notification.expires_at = Some(Utc::now() - ChronoDuration::seconds(1));
        store.insert(&notification).await.unwrap();

        dispatcher.process_one(notification.clone()).await;

        let stored = store.get(notification.id).await.unwrap().unwrap();
        assert_eq!(stored.status, NotificationStatus::Cancelled);
        assert_eq!(stored.retry_count, 0, "no adapter was ever invoked");
    }
}
