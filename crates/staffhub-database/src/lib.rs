//! # staffhub-database
//!
//! Persistence backends for the notification pipeline. Defines the
//! [`NotificationStore`] and [`StaffDirectory`] traits and provides two
//! implementations of each: in-memory (single-node deployments and
//! tests) and PostgreSQL.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use staffhub_core::result::AppResult;
use staffhub_core::types::cursor::{CursorPage, PageCursor};
use staffhub_core::types::id::{NotificationId, PropertyId, UserId};
use staffhub_entity::notification::model::Notification;
use staffhub_entity::user::profile::{ContactInfo, RecipientProfile};
use staffhub_entity::user::role::UserRole;

pub mod connection;
pub mod memory;
pub mod migration;
pub mod postgres;

/// Durable store for notifications.
///
/// Delivery status is mutated exclusively by the dispatcher (via
/// [`claim_ready`](NotificationStore::claim_ready) and
/// [`update_delivery`](NotificationStore::update_delivery)); the read-side
/// methods only touch the read flags.
#[async_trait]
pub trait NotificationStore: Send + Sync + 'static {
    /// Persist a newly enqueued notification.
    async fn insert(&self, notification: &Notification) -> AppResult<()>;

    /// Fetch a notification by id.
    async fn get(&self, id: NotificationId) -> AppResult<Option<Notification>>;

    /// Atomically claim the ready set: pending notifications whose
    /// `scheduled_for` has passed and that have not expired, ordered by
    /// priority descending, `scheduled_for` ascending, then creation
    /// order. Claimed rows are marked `sending` before they are returned.
    async fn claim_ready(&self, now: DateTime<Utc>, limit: u32) -> AppResult<Vec<Notification>>;

    /// Write back a claimed notification's delivery state.
    async fn update_delivery(&self, notification: &Notification) -> AppResult<()>;

    /// Re-queue `failed` notifications whose backoff delay has elapsed.
    /// Returns the number transitioned back to `pending`.
    async fn requeue_failed(&self, now: DateTime<Utc>) -> AppResult<u64>;

    /// List a recipient's notifications, newest first, with keyset
    /// pagination.
    async fn list_for_user(
        &self,
        user_id: UserId,
        unread_only: bool,
        limit: u32,
        cursor: Option<PageCursor>,
    ) -> AppResult<CursorPage<Notification>>;

    /// Mark one notification read. Returns `false` when no notification
    /// with that id belongs to the user.
    async fn mark_read(
        &self,
        id: NotificationId,
        user_id: UserId,
        at: DateTime<Utc>,
    ) -> AppResult<bool>;

    /// Mark all of a user's notifications read. Returns the number updated.
    async fn mark_all_read(&self, user_id: UserId, at: DateTime<Utc>) -> AppResult<u64>;

    /// Count a user's unread notifications.
    async fn count_unread(&self, user_id: UserId) -> AppResult<i64>;

    /// Move pending notifications whose expiry has passed to `expired`.
    /// Returns the number transitioned.
    async fn expire_overdue(&self, now: DateTime<Utc>) -> AppResult<u64>;

    /// Delete terminal notifications older than the cutoff. Returns the
    /// number deleted.
    async fn purge_older_than(&self, cutoff: DateTime<Utc>) -> AppResult<u64>;
}

/// Read-only view of the HR system of record: who exists, what role they
/// hold, and which properties a manager may act on.
#[async_trait]
pub trait StaffDirectory: Send + Sync + 'static {
    /// The set of property ids a manager is assigned to.
    async fn authorized_properties(&self, manager_id: UserId) -> AppResult<HashSet<PropertyId>>;

    /// Users at a property holding one of the given roles. Admins match
    /// regardless of property.
    async fn recipients_for(
        &self,
        property_id: PropertyId,
        roles: &[UserRole],
    ) -> AppResult<Vec<RecipientProfile>>;

    /// Delivery addresses for a user.
    async fn contact(&self, user_id: UserId) -> AppResult<Option<ContactInfo>>;
}
