//! Event fan-out — resolves domain events into per-recipient notifications.

use std::sync::Arc;

use tracing::{debug, info};

use staffhub_core::result::AppResult;
use staffhub_database::StaffDirectory;
use staffhub_entity::event::DomainEvent;

use crate::queue::{EnqueueParams, NotificationQueue};

/// Turns one raised domain event into one enqueued notification per
/// recipient/channel-preference combination.
#[derive(Clone)]
pub struct EventFanout {
    directory: Arc<dyn StaffDirectory>,
    queue: NotificationQueue,
}

impl std::fmt::Debug for EventFanout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventFanout").finish()
    }
}

impl EventFanout {
    /// Create a fan-out over the given directory and queue.
    pub fn new(directory: Arc<dyn StaffDirectory>, queue: NotificationQueue) -> Self {
        Self { directory, queue }
    }

    /// Resolve recipients for a raised event and enqueue a notification
    /// for each. Recipients whose preferences select no channel for this
    /// event are skipped. Returns the number enqueued.
    pub async fn raise_event(&self, event: &DomainEvent) -> AppResult<usize> {
        let recipients = self
            .directory
            .recipients_for(event.property_id, &event.target_roles)
            .await?;

        let body = event.body_text();
        let mut enqueued = 0usize;
        for recipient in recipients {
            let channels = recipient.preferences.channels_for(event.event_type);
            if channels.is_empty() {
                debug!(
                    user_id = %recipient.user_id,
                    event_type = %event.event_type,
                    "Recipient preferences select no channels, skipping"
                );
                continue;
            }

            self.queue
                .enqueue(EnqueueParams {
                    user_id: recipient.user_id,
                    event_type: event.event_type,
                    property_id: Some(event.property_id),
                    title: event.event_type.title().to_string(),
                    body: body.clone(),
                    payload: Some(event.payload.clone()),
                    channels,
                    priority: event.priority,
                    scheduled_for: None,
                    expires_at: None,
                })
                .await?;
            enqueued += 1;
        }

        info!(
            event_type = %event.event_type,
            property_id = %event.property_id,
            recipients = enqueued,
            "Event fanned out"
        );
        Ok(enqueued)
    }
}
