//! Integration tests for the notification pipeline: enqueue → dispatch →
//! retry/backoff → delivered or dead-lettered.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, mpsc};

use staffhub_core::config::notify::NotifyConfig;
use staffhub_core::types::id::{PropertyId, UserId};
use staffhub_database::NotificationStore;
use staffhub_database::memory::{MemoryDirectory, MemoryNotificationStore};
use staffhub_entity::event::DomainEvent;
use staffhub_entity::notification::{
    ChannelKind, EventType, NotificationPriority, NotificationStatus,
};
use staffhub_entity::user::UserRole;
use staffhub_entity::user::profile::{ContactInfo, RecipientProfile};
use staffhub_notify::adapters::{ChannelAdapter, DeliveryError};
use staffhub_notify::dispatcher::{DeadLetter, Dispatcher};
use staffhub_notify::fanout::EventFanout;
use staffhub_notify::queue::{EnqueueParams, NotificationQueue};
use staffhub_notify::service::NotificationReader;
use staffhub_entity::notification::preference::NotificationPreference;

/// Scripted outcome for one mock adapter call.
#[derive(Debug, Clone, Copy)]
enum Scripted {
    Ok,
    Transient,
    Permanent,
}

/// Adapter that replays a script of outcomes, defaulting to success.
#[derive(Debug)]
struct MockAdapter {
    channel: ChannelKind,
    script: Mutex<VecDeque<Scripted>>,
    calls: AtomicUsize,
}

impl MockAdapter {
    fn new(channel: ChannelKind, script: Vec<Scripted>) -> Arc<Self> {
        Arc::new(Self {
            channel,
            script: Mutex::new(script.into()),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChannelAdapter for MockAdapter {
    fn channel(&self) -> ChannelKind {
        self.channel
    }

    async fn send(
        &self,
        _address: &str,
        _subject: &str,
        _body: &str,
        _metadata: &serde_json::Value,
    ) -> Result<(), DeliveryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.script.lock().await.pop_front().unwrap_or(Scripted::Ok) {
            Scripted::Ok => Ok(()),
            Scripted::Transient => Err(DeliveryError::Transient("gateway 503".to_string())),
            Scripted::Permanent => Err(DeliveryError::Permanent("address rejected".to_string())),
        }
    }
}

/// Zero-backoff, single-worker config: retries become eligible
/// immediately and batch processing order is deterministic.
fn fast_config() -> NotifyConfig {
    NotifyConfig {
        backoff_base_seconds: 0,
        backoff_jitter_ms: 0,
        concurrency: 1,
        ..NotifyConfig::default()
    }
}

fn recipient_with_contact(role: UserRole) -> RecipientProfile {
    let user_id = UserId::new();
    RecipientProfile {
        user_id,
        role,
        full_name: "Test User".to_string(),
        contact: ContactInfo {
            email: Some("user@example.com".to_string()),
            phone: Some("+15550100".to_string()),
            push_token: Some("push-token".to_string()),
        },
        preferences: NotificationPreference::default_for_user(user_id),
    }
}

struct Pipeline {
    store: Arc<MemoryNotificationStore>,
    directory: Arc<MemoryDirectory>,
    queue: NotificationQueue,
    dispatcher: Arc<Dispatcher>,
    dead_letters: mpsc::UnboundedReceiver<DeadLetter>,
}

fn pipeline(adapters: Vec<Arc<MockAdapter>>) -> Pipeline {
    let config = fast_config();
    let store = Arc::new(MemoryNotificationStore::new());
    let directory = Arc::new(MemoryDirectory::new());
    let queue = NotificationQueue::new(store.clone(), config.clone());

    let (dead_tx, dead_rx) = mpsc::unbounded_channel();
    let mut dispatcher = Dispatcher::new(store.clone(), directory.clone(), config);
    for adapter in adapters {
        dispatcher.register(adapter);
    }
    let dispatcher = Arc::new(dispatcher.with_dead_letter_sink(dead_tx));

    Pipeline {
        store,
        directory,
        queue,
        dispatcher,
        dead_letters: dead_rx,
    }
}

fn enqueue_params(user_id: UserId, channels: Vec<ChannelKind>) -> EnqueueParams {
    EnqueueParams {
        user_id,
        event_type: EventType::ApplicationSubmitted,
        property_id: Some(PropertyId::new()),
        title: "New job application".to_string(),
        body: "A candidate applied".to_string(),
        payload: Some(serde_json::json!({"application_id": "42"})),
        channels,
        priority: NotificationPriority::High,
        scheduled_for: None,
        expires_at: None,
    }
}

#[tokio::test]
async fn test_transient_email_failures_then_success_delivers() {
    let in_app = MockAdapter::new(ChannelKind::InApp, vec![]);
    let email = MockAdapter::new(
        ChannelKind::Email,
        vec![Scripted::Transient, Scripted::Transient, Scripted::Ok],
    );
    let mut p = pipeline(vec![in_app.clone(), email.clone()]);

    let recipient = recipient_with_contact(UserRole::Manager);
    p.directory.upsert_user(recipient.clone());

    let id = p
        .queue
        .enqueue(enqueue_params(
            recipient.user_id,
            vec![ChannelKind::InApp, ChannelKind::Email],
        ))
        .await
        .expect("enqueue");

    // Pass 1: in-app succeeds, email fails. Pass 2: email fails again.
    // Pass 3: email succeeds.
    for _ in 0..3 {
        p.dispatcher.dispatch_ready().await.expect("dispatch");
    }

    let stored = p.store.get(id).await.unwrap().expect("stored");
    assert_eq!(stored.status, NotificationStatus::Delivered);
    assert_eq!(stored.retry_count, 2);
    assert!(stored.delivered_at.is_some());
    assert_eq!(in_app.calls(), 1, "delivered channels are not re-attempted");
    assert_eq!(email.calls(), 3);
    assert!(p.dead_letters.try_recv().is_err());
}

#[tokio::test]
async fn test_exhausted_retries_dead_letter() {
    let email = MockAdapter::new(
        ChannelKind::Email,
        vec![Scripted::Transient, Scripted::Transient, Scripted::Transient],
    );
    let mut p = pipeline(vec![email.clone()]);

    let recipient = recipient_with_contact(UserRole::Employee);
    p.directory.upsert_user(recipient.clone());

    let id = p
        .queue
        .enqueue(enqueue_params(recipient.user_id, vec![ChannelKind::Email]))
        .await
        .expect("enqueue");

    for _ in 0..4 {
        p.dispatcher.dispatch_ready().await.expect("dispatch");
    }

    let stored = p.store.get(id).await.unwrap().expect("stored");
    assert_eq!(stored.status, NotificationStatus::DeadLettered);
    assert_eq!(
        stored.retry_count, stored.max_retries,
        "retry_count never exceeds the bound"
    );
    assert_eq!(email.calls(), 3);

    let signal = p.dead_letters.try_recv().expect("terminal failure signal");
    assert_eq!(signal.notification_id, id);
}

#[tokio::test]
async fn test_permanent_failure_dead_letters_immediately() {
    let email = MockAdapter::new(ChannelKind::Email, vec![Scripted::Permanent]);
    let mut p = pipeline(vec![email.clone()]);

    let recipient = recipient_with_contact(UserRole::Employee);
    p.directory.upsert_user(recipient.clone());

    let id = p
        .queue
        .enqueue(enqueue_params(recipient.user_id, vec![ChannelKind::Email]))
        .await
        .expect("enqueue");

    p.dispatcher.dispatch_ready().await.expect("dispatch");

    let stored = p.store.get(id).await.unwrap().expect("stored");
    assert_eq!(stored.status, NotificationStatus::DeadLettered);
    assert_eq!(email.calls(), 1, "non-retryable failures are not retried");
    assert!(p.dead_letters.try_recv().is_ok());

    // Later passes leave the terminal state alone.
    p.dispatcher.dispatch_ready().await.expect("dispatch");
    assert_eq!(email.calls(), 1);
}

#[tokio::test]
async fn test_missing_address_is_permanent() {
    let sms = MockAdapter::new(ChannelKind::Sms, vec![]);
    let mut p = pipeline(vec![sms.clone()]);

    let mut recipient = recipient_with_contact(UserRole::Employee);
    recipient.contact.phone = None;
    p.directory.upsert_user(recipient.clone());

    let id = p
        .queue
        .enqueue(enqueue_params(recipient.user_id, vec![ChannelKind::Sms]))
        .await
        .expect("enqueue");

    p.dispatcher.dispatch_ready().await.expect("dispatch");

    let stored = p.store.get(id).await.unwrap().expect("stored");
    assert_eq!(stored.status, NotificationStatus::DeadLettered);
    assert_eq!(sms.calls(), 0, "adapter never invoked without an address");
    assert!(p.dead_letters.try_recv().is_ok());
}

#[tokio::test]
async fn test_one_bad_notification_does_not_block_the_batch() {
    let email = MockAdapter::new(ChannelKind::Email, vec![Scripted::Permanent, Scripted::Ok]);
    let p = pipeline(vec![email.clone()]);

    let poisoned = recipient_with_contact(UserRole::Employee);
    let healthy = recipient_with_contact(UserRole::Employee);
    p.directory.upsert_user(poisoned.clone());
    p.directory.upsert_user(healthy.clone());

    // Urgent sorts first, so its permanent failure runs before the
    // healthy normal-priority notification in the same pass.
    let mut urgent = enqueue_params(poisoned.user_id, vec![ChannelKind::Email]);
    urgent.priority = NotificationPriority::Urgent;
    let poisoned_id = p.queue.enqueue(urgent).await.expect("enqueue");

    let mut normal = enqueue_params(healthy.user_id, vec![ChannelKind::Email]);
    normal.priority = NotificationPriority::Normal;
    let healthy_id = p.queue.enqueue(normal).await.expect("enqueue");

    let processed = p.dispatcher.dispatch_ready().await.expect("dispatch");
    assert_eq!(processed, 2);

    let poisoned_stored = p.store.get(poisoned_id).await.unwrap().unwrap();
    let healthy_stored = p.store.get(healthy_id).await.unwrap().unwrap();
    assert_eq!(poisoned_stored.status, NotificationStatus::DeadLettered);
    assert_eq!(healthy_stored.status, NotificationStatus::Delivered);
}

#[tokio::test]
async fn test_scheduled_notification_waits_for_its_time() {
    let email = MockAdapter::new(ChannelKind::Email, vec![]);
    let p = pipeline(vec![email.clone()]);

    let recipient = recipient_with_contact(UserRole::Employee);
    p.directory.upsert_user(recipient.clone());

    let mut params = enqueue_params(recipient.user_id, vec![ChannelKind::Email]);
    params.scheduled_for = Some(Utc::now() + chrono::Duration::hours(1));
    let id = p.queue.enqueue(params).await.expect("enqueue");

    assert_eq!(p.dispatcher.dispatch_ready().await.expect("dispatch"), 0);
    assert_eq!(email.calls(), 0);
    let stored = p.store.get(id).await.unwrap().unwrap();
    assert_eq!(stored.status, NotificationStatus::Pending);
}

#[tokio::test]
async fn test_fanout_respects_assignments_and_preferences() {
    let p = pipeline(vec![]);
    let property = PropertyId::new();

    let assigned = recipient_with_contact(UserRole::Manager);
    let unassigned = recipient_with_contact(UserRole::Manager);
    let mut muted = recipient_with_contact(UserRole::Manager);
    muted
        .preferences
        .categories
        .get_mut("application")
        .expect("default category")
        .enabled = false;

    p.directory.upsert_user(assigned.clone());
    p.directory.upsert_user(unassigned.clone());
    p.directory.upsert_user(muted.clone());
    p.directory.assign_manager(assigned.user_id, property);
    p.directory.assign_manager(muted.user_id, property);

    let fanout = EventFanout::new(p.directory.clone(), p.queue.clone());
    let enqueued = fanout
        .raise_event(&DomainEvent {
            event_type: EventType::ApplicationSubmitted,
            property_id: property,
            payload: serde_json::json!({"message": "Maria applied for front desk"}),
            target_roles: vec![UserRole::Manager],
            priority: NotificationPriority::Normal,
        })
        .await
        .expect("raise event");

    assert_eq!(enqueued, 1, "only the assigned, unmuted manager is notified");
    let page = p
        .store
        .list_for_user(assigned.user_id, false, 10, None)
        .await
        .unwrap();
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].body, "Maria applied for front desk");
    assert_eq!(page.items[0].channels, vec![ChannelKind::InApp]);
}

#[tokio::test]
async fn test_reader_mark_read_and_unread_count() {
    let p = pipeline(vec![]);
    let recipient = recipient_with_contact(UserRole::Employee);
    p.directory.upsert_user(recipient.clone());

    let id = p
        .queue
        .enqueue(enqueue_params(recipient.user_id, vec![ChannelKind::InApp]))
        .await
        .expect("enqueue");

    let reader = NotificationReader::new(p.store.clone());
    assert_eq!(reader.unread_count(recipient.user_id).await.unwrap(), 1);

    reader.mark_read(id, recipient.user_id).await.expect("mark read");
    reader.mark_read(id, recipient.user_id).await.expect("idempotent");
    assert_eq!(reader.unread_count(recipient.user_id).await.unwrap(), 0);

    let stranger = UserId::new();
    let err = reader.mark_read(id, stranger).await.unwrap_err();
    assert_eq!(err.kind, staffhub_core::error::ErrorKind::NotFound);
}

#[tokio::test]
async fn test_unconfigured_channel_dead_letters() {
    // No adapter registered for email at all.
    let mut p = pipeline(vec![]);
    let recipient = recipient_with_contact(UserRole::Employee);
    p.directory.upsert_user(recipient.clone());

    let id = p
        .queue
        .enqueue(enqueue_params(recipient.user_id, vec![ChannelKind::Email]))
        .await
        .expect("enqueue");

    p.dispatcher.dispatch_ready().await.expect("dispatch");
    let stored = p.store.get(id).await.unwrap().unwrap();
    assert_eq!(stored.status, NotificationStatus::DeadLettered);
    assert!(p.dead_letters.try_recv().is_ok());
}
