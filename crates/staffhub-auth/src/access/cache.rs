//! Per-manager property-access cache.
//!
//! Holds each manager's authorized property set, refreshed from the
//! staff directory when stale. Entries are sharded per manager id
//! (dashmap), so one manager's refresh never blocks another's lookup.
//!
//! Failure policy: a refresh failure falls back to the last-known-good
//! entry and is reported via `warn!` — access is never silently widened
//! and never silently dropped to zero. A refresh failure with no prior
//! entry is a `StaleAccess` error.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::{debug, warn};

use staffhub_core::config::access::AccessConfig;
use staffhub_core::error::AppError;
use staffhub_core::result::AppResult;
use staffhub_core::types::id::{PropertyId, UserId};
use staffhub_database::StaffDirectory;

/// One manager's cached property set.
#[derive(Debug, Clone)]
struct AccessEntry {
    /// Authorized property ids at fetch time.
    properties: HashSet<PropertyId>,
    /// When the entry was fetched from the directory.
    fetched_at: DateTime<Utc>,
}

/// Cache of manager → authorized property set.
pub struct AccessCache {
    directory: Arc<dyn StaffDirectory>,
    entries: DashMap<UserId, AccessEntry>,
    ttl: chrono::Duration,
    refresh_timeout: Duration,
}

impl std::fmt::Debug for AccessCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessCache")
            .field("entries", &self.entries.len())
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl AccessCache {
    /// Create a cache over the given directory.
    pub fn new(directory: Arc<dyn StaffDirectory>, config: &AccessConfig) -> Self {
        Self {
            directory,
            entries: DashMap::new(),
            ttl: chrono::Duration::seconds(config.ttl_seconds as i64),
            refresh_timeout: Duration::from_secs(config.refresh_timeout_seconds),
        }
    }

    /// The property set a manager may act on.
    ///
    /// Fresh entries answer in O(1); stale or missing entries refresh
    /// synchronously from the directory. Admin callers should not reach
    /// this — they bypass the cache entirely at the authorization site.
    pub async fn authorized_properties(
        &self,
        manager_id: UserId,
    ) -> AppResult<HashSet<PropertyId>> {
        if let Some(entry) = self.entries.get(&manager_id) {
            if Utc::now() - entry.fetched_at < self.ttl {
                return Ok(entry.properties.clone());
            }
        }
        self.refresh(manager_id).await
    }

    /// Drop a manager's entry so the next lookup refreshes.
    ///
    /// Called by the assignment-management collaborator whenever a
    /// manager's property assignments change. Existing room
    /// subscriptions are not revoked; only new subscription attempts
    /// see the change.
    pub fn invalidate(&self, manager_id: UserId) {
        self.entries.remove(&manager_id);
        debug!(manager_id = %manager_id, "Access cache entry invalidated");
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    async fn refresh(&self, manager_id: UserId) -> AppResult<HashSet<PropertyId>> {
        let fetched = tokio::time::timeout(
            self.refresh_timeout,
            self.directory.authorized_properties(manager_id),
        )
        .await
        .map_err(|_| AppError::stale_access("Directory refresh timed out"))
        .and_then(|r| r);

        match fetched {
            Ok(properties) => {
                self.entries.insert(
                    manager_id,
                    AccessEntry {
                        properties: properties.clone(),
                        fetched_at: Utc::now(),
                    },
                );
                Ok(properties)
            }
            Err(e) => {
                // Fail open to the last-known-good entry; stale data beats
                // locking every manager out on a directory hiccup.
                if let Some(entry) = self.entries.get(&manager_id) {
                    warn!(
                        manager_id = %manager_id,
                        error = %e,
                        stale_for = %(Utc::now() - entry.fetched_at),
                        "Access refresh failed, serving last-known-good entry"
                    );
                    return Ok(entry.properties.clone());
                }
                Err(AppError::stale_access(format!(
                    "Access refresh failed for manager {manager_id} with no cached entry: {e}"
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use staffhub_entity::user::UserRole;
    use staffhub_entity::user::profile::{ContactInfo, RecipientProfile};

    /// Directory that counts fetches and can be switched into failure mode.
    #[derive(Debug, Default)]
    struct ScriptedDirectory {
        properties: DashMap<UserId, HashSet<PropertyId>>,
        fetches: AtomicUsize,
        failing: AtomicBool,
    }

    impl ScriptedDirectory {
        fn grant(&self, manager: UserId, property: PropertyId) {
            self.properties.entry(manager).or_default().insert(property);
        }

        fn set_failing(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }

        fn fetch_count(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl StaffDirectory for ScriptedDirectory {
        async fn authorized_properties(
            &self,
            manager_id: UserId,
        ) -> AppResult<HashSet<PropertyId>> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if self.failing.load(Ordering::SeqCst) {
                return Err(AppError::database("directory unavailable"));
            }
            Ok(self
                .properties
                .get(&manager_id)
                .map(|e| e.value().clone())
                .unwrap_or_default())
        }

        async fn recipients_for(
            &self,
            _property_id: PropertyId,
            _roles: &[UserRole],
        ) -> AppResult<Vec<RecipientProfile>> {
            Ok(Vec::new())
        }

        async fn contact(&self, _user_id: UserId) -> AppResult<Option<ContactInfo>> {
            Ok(None)
        }
    }

    fn cache_with_ttl(directory: Arc<ScriptedDirectory>, ttl_seconds: u64) -> AccessCache {
        AccessCache::new(
            directory,
            &AccessConfig {
                ttl_seconds,
                refresh_timeout_seconds: 5,
            },
        )
    }

    #[tokio::test]
    async fn test_fresh_entry_skips_directory() {
        let dir = Arc::new(ScriptedDirectory::default());
        let manager = UserId::new();
        let property = PropertyId::new();
        dir.grant(manager, property);

        let cache = cache_with_ttl(dir.clone(), 300);
        let first = cache.authorized_properties(manager).await.unwrap();
        let second = cache.authorized_properties(manager).await.unwrap();

        assert!(first.contains(&property));
        assert_eq!(first, second);
        assert_eq!(dir.fetch_count(), 1, "second lookup served from cache");
    }

    #[tokio::test]
    async fn test_stale_entry_refreshes() {
        let dir = Arc::new(ScriptedDirectory::default());
        let manager = UserId::new();
        dir.grant(manager, PropertyId::new());

        // ttl 0 makes every entry immediately stale.
        let cache = cache_with_ttl(dir.clone(), 0);
        cache.authorized_properties(manager).await.unwrap();
        cache.authorized_properties(manager).await.unwrap();
        assert_eq!(dir.fetch_count(), 2);
    }

    #[tokio::test]
    async fn test_invalidate_forces_refresh() {
        let dir = Arc::new(ScriptedDirectory::default());
        let manager = UserId::new();
        let property_a = PropertyId::new();
        dir.grant(manager, property_a);

        let cache = cache_with_ttl(dir.clone(), 300);
        assert!(
            cache
                .authorized_properties(manager)
                .await
                .unwrap()
                .contains(&property_a)
        );

        // Assignment revoked upstream; collaborator invalidates.
        dir.properties.remove(&manager);
        cache.invalidate(manager);

        let after = cache.authorized_properties(manager).await.unwrap();
        assert!(!after.contains(&property_a));
        assert_eq!(dir.fetch_count(), 2);
    }

    #[tokio::test]
    async fn test_fail_open_to_last_known_good() {
        let dir = Arc::new(ScriptedDirectory::default());
        let manager = UserId::new();
        let property = PropertyId::new();
        dir.grant(manager, property);

        let cache = cache_with_ttl(dir.clone(), 0);
        cache.authorized_properties(manager).await.unwrap();

        dir.set_failing(true);
        let stale = cache.authorized_properties(manager).await.unwrap();
        assert!(stale.contains(&property), "stale entry served on failure");
    }

    #[tokio::test]
    async fn test_refresh_failure_without_entry_errors() {
        let dir = Arc::new(ScriptedDirectory::default());
        dir.set_failing(true);

        let cache = cache_with_ttl(dir, 300);
        let err = cache.authorized_properties(UserId::new()).await.unwrap_err();
        assert_eq!(err.kind, staffhub_core::error::ErrorKind::StaleAccess);
    }
}
