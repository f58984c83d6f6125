//! In-memory store and directory backends.
//!
//! Used for single-node deployments without PostgreSQL and throughout
//! the test suites. Backed by dashmap so readers and writers on
//! different keys never contend.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use staffhub_core::result::AppResult;
use staffhub_core::types::cursor::{CursorPage, PageCursor};
use staffhub_core::types::id::{NotificationId, PropertyId, UserId};
use staffhub_entity::notification::model::Notification;
use staffhub_entity::notification::status::NotificationStatus;
use staffhub_entity::user::profile::{ContactInfo, RecipientProfile};
use staffhub_entity::user::role::UserRole;

use crate::{NotificationStore, StaffDirectory};

/// In-memory [`NotificationStore`].
#[derive(Debug, Default)]
pub struct MemoryNotificationStore {
    /// Notification id → record.
    notifications: DashMap<NotificationId, Notification>,
    /// Insertion sequence per notification, the creation-order tie-breaker.
    seq: DashMap<NotificationId, u64>,
    /// Next insertion sequence.
    next_seq: AtomicU64,
}

impl MemoryNotificationStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of stored notifications (test helper).
    pub fn len(&self) -> usize {
        self.notifications.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.notifications.is_empty()
    }
}

#[async_trait]
impl NotificationStore for MemoryNotificationStore {
    async fn insert(&self, notification: &Notification) -> AppResult<()> {
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        self.seq.insert(notification.id, seq);
        self.notifications
            .insert(notification.id, notification.clone());
        Ok(())
    }

    async fn get(&self, id: NotificationId) -> AppResult<Option<Notification>> {
        Ok(self.notifications.get(&id).map(|e| e.value().clone()))
    }

    async fn claim_ready(&self, now: DateTime<Utc>, limit: u32) -> AppResult<Vec<Notification>> {
        let mut ready: Vec<(u64, Notification)> = self
            .notifications
            .iter()
            .filter(|e| {
                let n = e.value();
                n.status == NotificationStatus::Pending
                    && n.scheduled_for <= now
                    && !n.is_expired(now)
            })
            .map(|e| {
                let seq = self.seq.get(e.key()).map(|s| *s.value()).unwrap_or(0);
                (seq, e.value().clone())
            })
            .collect();

        ready.sort_by(|(seq_a, a), (seq_b, b)| {
            b.priority
                .cmp(&a.priority)
                .then(a.scheduled_for.cmp(&b.scheduled_for))
                .then(seq_a.cmp(seq_b))
        });
        ready.truncate(limit as usize);

        let mut claimed = Vec::with_capacity(ready.len());
        for (_, candidate) in ready {
            if let Some(mut entry) = self.notifications.get_mut(&candidate.id) {
                // Re-check under the entry lock; another claimer may have won.
                if entry.status == NotificationStatus::Pending {
                    entry.status = NotificationStatus::Sending;
                    claimed.push(entry.clone());
                }
            }
        }
        Ok(claimed)
    }

    async fn update_delivery(&self, notification: &Notification) -> AppResult<()> {
        if let Some(mut entry) = self.notifications.get_mut(&notification.id) {
            *entry = notification.clone();
        }
        Ok(())
    }

    async fn requeue_failed(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let mut requeued = 0;
        for mut entry in self.notifications.iter_mut() {
            if entry.status == NotificationStatus::Failed && entry.scheduled_for <= now {
                entry.status = NotificationStatus::Pending;
                requeued += 1;
            }
        }
        Ok(requeued)
    }

    async fn list_for_user(
        &self,
        user_id: UserId,
        unread_only: bool,
        limit: u32,
        cursor: Option<PageCursor>,
    ) -> AppResult<CursorPage<Notification>> {
        let mut items: Vec<Notification> = self
            .notifications
            .iter()
            .filter(|e| {
                let n = e.value();
                n.user_id == user_id && (!unread_only || !n.is_read)
            })
            .map(|e| e.value().clone())
            .collect();

        items.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then(b.id.into_uuid().cmp(&a.id.into_uuid()))
        });

        if let Some(cursor) = cursor {
            items.retain(|n| {
                n.created_at < cursor.created_at
                    || (n.created_at == cursor.created_at && n.id.into_uuid() < cursor.id)
            });
        }

        let has_more = items.len() > limit as usize;
        items.truncate(limit as usize);
        let next_cursor = if has_more {
            items.last().map(|n| {
                PageCursor {
                    created_at: n.created_at,
                    id: n.id.into_uuid(),
                }
                .encode()
            })
        } else {
            None
        };

        Ok(CursorPage { items, next_cursor })
    }

    async fn mark_read(
        &self,
        id: NotificationId,
        user_id: UserId,
        at: DateTime<Utc>,
    ) -> AppResult<bool> {
        match self.notifications.get_mut(&id) {
            Some(mut entry) if entry.user_id == user_id => {
                if !entry.is_read {
                    entry.is_read = true;
                    entry.read_at = Some(at);
                }
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn mark_all_read(&self, user_id: UserId, at: DateTime<Utc>) -> AppResult<u64> {
        let mut updated = 0;
        for mut entry in self.notifications.iter_mut() {
            if entry.user_id == user_id && !entry.is_read {
                entry.is_read = true;
                entry.read_at = Some(at);
                updated += 1;
            }
        }
        Ok(updated)
    }

    async fn count_unread(&self, user_id: UserId) -> AppResult<i64> {
        Ok(self
            .notifications
            .iter()
            .filter(|e| e.value().user_id == user_id && !e.value().is_read)
            .count() as i64)
    }

    async fn expire_overdue(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let mut expired = 0;
        for mut entry in self.notifications.iter_mut() {
            if entry.status == NotificationStatus::Pending && entry.is_expired(now) {
                entry.status = NotificationStatus::Expired;
                expired += 1;
            }
        }
        Ok(expired)
    }

    async fn purge_older_than(&self, cutoff: DateTime<Utc>) -> AppResult<u64> {
        let stale: Vec<NotificationId> = self
            .notifications
            .iter()
            .filter(|e| e.value().status.is_terminal() && e.value().created_at < cutoff)
            .map(|e| *e.key())
            .collect();

        for id in &stale {
            self.notifications.remove(id);
            self.seq.remove(id);
        }
        Ok(stale.len() as u64)
    }
}

/// In-memory [`StaffDirectory`].
///
/// The mutation helpers stand in for the HR CRUD surface that owns this
/// data in production.
#[derive(Debug, Default)]
pub struct MemoryDirectory {
    /// User id → profile.
    users: DashMap<UserId, RecipientProfile>,
    /// Manager id → assigned property ids.
    assignments: DashMap<UserId, HashSet<PropertyId>>,
    /// Property id → employee user ids.
    staff: DashMap<PropertyId, HashSet<UserId>>,
}

impl MemoryDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a user profile.
    pub fn upsert_user(&self, profile: RecipientProfile) {
        self.users.insert(profile.user_id, profile);
    }

    /// Assign a manager to a property.
    pub fn assign_manager(&self, manager_id: UserId, property_id: PropertyId) {
        self.assignments
            .entry(manager_id)
            .or_default()
            .insert(property_id);
    }

    /// Revoke a manager's assignment to a property.
    pub fn revoke_manager(&self, manager_id: UserId, property_id: PropertyId) {
        if let Some(mut props) = self.assignments.get_mut(&manager_id) {
            props.remove(&property_id);
        }
    }

    /// Place an employee at a property.
    pub fn add_staff(&self, property_id: PropertyId, user_id: UserId) {
        self.staff.entry(property_id).or_default().insert(user_id);
    }
}

#[async_trait]
impl StaffDirectory for MemoryDirectory {
    async fn authorized_properties(&self, manager_id: UserId) -> AppResult<HashSet<PropertyId>> {
        Ok(self
            .assignments
            .get(&manager_id)
            .map(|e| e.value().clone())
            .unwrap_or_default())
    }

    async fn recipients_for(
        &self,
        property_id: PropertyId,
        roles: &[UserRole],
    ) -> AppResult<Vec<RecipientProfile>> {
        let mut out = Vec::new();
        for entry in self.users.iter() {
            let profile = entry.value();
            if !roles.contains(&profile.role) {
                continue;
            }
            let at_property = match profile.role {
                UserRole::Admin => true,
                UserRole::Manager => self
                    .assignments
                    .get(&profile.user_id)
                    .map(|p| p.contains(&property_id))
                    .unwrap_or(false),
                UserRole::Employee => self
                    .staff
                    .get(&property_id)
                    .map(|s| s.contains(&profile.user_id))
                    .unwrap_or(false),
            };
            if at_property {
                out.push(profile.clone());
            }
        }
        Ok(out)
    }

    async fn contact(&self, user_id: UserId) -> AppResult<Option<ContactInfo>> {
        Ok(self.users.get(&user_id).map(|e| e.value().contact.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use staffhub_entity::notification::channel::ChannelKind;
    use staffhub_entity::notification::event_type::EventType;
    use staffhub_entity::notification::preference::NotificationPreference;
    use staffhub_entity::notification::priority::NotificationPriority;
    use staffhub_entity::user::profile::ContactInfo;

    fn make_notification(user_id: UserId, priority: NotificationPriority) -> Notification {
        Notification {
            id: NotificationId::new(),
            user_id,
            event_type: EventType::ApplicationSubmitted,
            property_id: None,
            title: "New job application".to_string(),
            body: "A candidate applied".to_string(),
            payload: None,
            channels: vec![ChannelKind::InApp],
            delivered_channels: Vec::new(),
            priority,
            status: NotificationStatus::Pending,
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
    async fn test_claim_orders_by_priority_then_schedule() {
        let store = MemoryNotificationStore::new();
        let user = UserId::new();

        let low = make_notification(user, NotificationPriority::Low);
        let urgent = make_notification(user, NotificationPriority::Urgent);
        let normal = make_notification(user, NotificationPriority::Normal);
        for n in [&low, &urgent, &normal] {
            store.insert(n).await.unwrap();
        }

        let claimed = store.claim_ready(Utc::now(), 10).await.unwrap();
        let ids: Vec<_> = claimed.iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![urgent.id, normal.id, low.id]);
        for n in &claimed {
            assert_eq!(n.status, NotificationStatus::Sending);
        }
    }

    #[tokio::test]
    async fn test_claim_skips_future_and_expired() {
        let store = MemoryNotificationStore::new();
        let user = UserId::new();
        let now = Utc::now();

        let mut future = make_notification(user, NotificationPriority::Normal);
        future.scheduled_for = now + chrono::Duration::hours(1);
        let mut expired = make_notification(user, NotificationPriority::Normal);
        expired.expires_at = Some(now - chrono::Duration::seconds(1));
        let due = make_notification(user, NotificationPriority::Normal);

        for n in [&future, &expired, &due] {
            store.insert(n).await.unwrap();
        }

        let claimed = store.claim_ready(now, 10).await.unwrap();
        assert_eq!(claimed.len(), 1);
        assert_eq!(claimed[0].id, due.id);
    }

    #[tokio::test]
    async fn test_claim_is_fair_within_priority_band() {
        let store = MemoryNotificationStore::new();
        let user = UserId::new();
        let at = Utc::now();

        let mut first = make_notification(user, NotificationPriority::Normal);
        first.scheduled_for = at;
        let mut second = make_notification(user, NotificationPriority::Normal);
        second.scheduled_for = at;

        store.insert(&first).await.unwrap();
        store.insert(&second).await.unwrap();

        let claimed = store.claim_ready(Utc::now(), 10).await.unwrap();
        assert_eq!(claimed[0].id, first.id, "creation order breaks ties");
        assert_eq!(claimed[1].id, second.id);
    }

    #[tokio::test]
    async fn test_mark_read_idempotent_and_owner_checked() {
        let store = MemoryNotificationStore::new();
        let owner = UserId::new();
        let stranger = UserId::new();
        let n = make_notification(owner, NotificationPriority::Normal);
        store.insert(&n).await.unwrap();

        assert!(store.mark_read(n.id, owner, Utc::now()).await.unwrap());
        assert!(store.mark_read(n.id, owner, Utc::now()).await.unwrap());
        assert!(!store.mark_read(n.id, stranger, Utc::now()).await.unwrap());
        assert_eq!(store.count_unread(owner).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_list_paginates_with_cursor() {
        let store = MemoryNotificationStore::new();
        let user = UserId::new();
        for _ in 0..5 {
            store
                .insert(&make_notification(user, NotificationPriority::Normal))
                .await
                .unwrap();
        }

        let first = store.list_for_user(user, false, 2, None).await.unwrap();
        assert_eq!(first.items.len(), 2);
        let cursor = PageCursor::decode(first.next_cursor.as_deref().unwrap()).unwrap();

        let second = store
            .list_for_user(user, false, 10, Some(cursor))
            .await
            .unwrap();
        assert_eq!(second.items.len(), 3);
        assert!(second.next_cursor.is_none());

        let first_ids: HashSet<_> = first.items.iter().map(|n| n.id).collect();
        assert!(second.items.iter().all(|n| !first_ids.contains(&n.id)));
    }

    #[tokio::test]
    async fn test_expire_overdue() {
        let store = MemoryNotificationStore::new();
        let mut n = make_notification(UserId::new(), NotificationPriority::Normal);
        n.expires_at = Some(Utc::now() - chrono::Duration::minutes(1));
        store.insert(&n).await.unwrap();

        assert_eq!(store.expire_overdue(Utc::now()).await.unwrap(), 1);
        let stored = store.get(n.id).await.unwrap().unwrap();
        assert_eq!(stored.status, NotificationStatus::Expired);
    }

    fn make_profile(role: UserRole) -> RecipientProfile {
        let user_id = UserId::new();
        RecipientProfile {
            user_id,
            role,
            full_name: "Test User".to_string(),
            contact: ContactInfo::default(),
            preferences: NotificationPreference::default_for_user(user_id),
        }
    }

    #[tokio::test]
    async fn test_directory_resolves_recipients_by_role() {
        let dir = MemoryDirectory::new();
        let property = PropertyId::new();

        let manager = make_profile(UserRole::Manager);
        let other_manager = make_profile(UserRole::Manager);
        let employee = make_profile(UserRole::Employee);
        let admin = make_profile(UserRole::Admin);
        for p in [&manager, &other_manager, &employee, &admin] {
            dir.upsert_user(p.clone());
        }
        dir.assign_manager(manager.user_id, property);
        dir.add_staff(property, employee.user_id);

        let managers = dir
            .recipients_for(property, &[UserRole::Manager])
            .await
            .unwrap();
        assert_eq!(managers.len(), 1);
        assert_eq!(managers[0].user_id, manager.user_id);

        let everyone = dir
            .recipients_for(property, &[UserRole::Manager, UserRole::Employee, UserRole::Admin])
            .await
            .unwrap();
        assert_eq!(everyone.len(), 3);
    }
}
