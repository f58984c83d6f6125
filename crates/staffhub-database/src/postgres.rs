//! PostgreSQL store and directory backends.

use std::collections::{HashMap, HashSet};
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use staffhub_core::error::{AppError, ErrorKind};
use staffhub_core::result::AppResult;
use staffhub_core::types::cursor::{CursorPage, PageCursor};
use staffhub_core::types::id::{NotificationId, PropertyId, UserId};
use staffhub_entity::notification::event_type::EventType;
use staffhub_entity::notification::model::Notification;
use staffhub_entity::notification::preference::{ChannelPreference, NotificationPreference};
use staffhub_entity::notification::priority::NotificationPriority;
use staffhub_entity::notification::status::NotificationStatus;
use staffhub_entity::user::profile::{ContactInfo, RecipientProfile};
use staffhub_entity::user::role::UserRole;

use crate::{NotificationStore, StaffDirectory};

/// PostgreSQL-backed [`NotificationStore`].
#[derive(Debug, Clone)]
pub struct PgNotificationStore {
    pool: PgPool,
}

impl PgNotificationStore {
    /// Create a new store over an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Sort rank persisted alongside the textual priority so the ready-set
/// scan can order in SQL.
fn priority_rank(priority: NotificationPriority) -> i16 {
    match priority {
        NotificationPriority::Low => 0,
        NotificationPriority::Normal => 1,
        NotificationPriority::High => 2,
        NotificationPriority::Urgent => 3,
    }
}

/// Raw row shape; enums and channel lists are stored as text/JSONB.
#[derive(Debug, sqlx::FromRow)]
struct NotificationRow {
    id: Uuid,
    user_id: Uuid,
    event_type: String,
    property_id: Option<Uuid>,
    title: String,
    body: String,
    payload: Option<serde_json::Value>,
    channels: serde_json::Value,
    delivered_channels: serde_json::Value,
    priority: String,
    status: String,
    retry_count: i32,
    max_retries: i32,
    last_error: Option<String>,
    scheduled_for: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    delivered_at: Option<DateTime<Utc>>,
    is_read: bool,
    read_at: Option<DateTime<Utc>>,
}

impl TryFrom<NotificationRow> for Notification {
    type Error = AppError;

    fn try_from(row: NotificationRow) -> Result<Self, Self::Error> {
        Ok(Notification {
            id: NotificationId::from_uuid(row.id),
            user_id: UserId::from_uuid(row.user_id),
            event_type: EventType::from_str(&row.event_type)?,
            property_id: row.property_id.map(PropertyId::from_uuid),
            title: row.title,
            body: row.body,
            payload: row.payload,
            channels: serde_json::from_value(row.channels)?,
            delivered_channels: serde_json::from_value(row.delivered_channels)?,
            priority: NotificationPriority::from_str_value(&row.priority),
            status: NotificationStatus::from_str(&row.status)?,
            retry_count: row.retry_count.max(0) as u32,
            max_retries: row.max_retries.max(0) as u32,
            last_error: row.last_error,
            scheduled_for: row.scheduled_for,
            expires_at: row.expires_at,
            created_at: row.created_at,
            delivered_at: row.delivered_at,
            is_read: row.is_read,
            read_at: row.read_at,
        })
    }
}

const SELECT_COLUMNS: &str = "id, user_id, event_type, property_id, title, body, payload, \
     channels, delivered_channels, priority, status, retry_count, max_retries, last_error, \
     scheduled_for, expires_at, created_at, delivered_at, is_read, read_at";

fn db_err(context: &str, e: sqlx::Error) -> AppError {
    AppError::with_source(ErrorKind::Database, context.to_string(), e)
}

#[async_trait]
impl NotificationStore for PgNotificationStore {
    async fn insert(&self, n: &Notification) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO notifications \
             (id, user_id, event_type, property_id, title, body, payload, channels, \
              delivered_channels, priority, priority_rank, status, retry_count, max_retries, \
              last_error, scheduled_for, expires_at, created_at, delivered_at, is_read, read_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, \
                     $18, $19, $20, $21)",
        )
        .bind(n.id.into_uuid())
        .bind(n.user_id.into_uuid())
        .bind(n.event_type.as_str())
        .bind(n.property_id.map(|p| p.into_uuid()))
        .bind(&n.title)
        .bind(&n.body)
        .bind(&n.payload)
        .bind(serde_json::to_value(&n.channels)?)
        .bind(serde_json::to_value(&n.delivered_channels)?)
        .bind(n.priority.as_str())
        .bind(priority_rank(n.priority))
        .bind(n.status.as_str())
        .bind(n.retry_count as i32)
        .bind(n.max_retries as i32)
        .bind(&n.last_error)
        .bind(n.scheduled_for)
        .bind(n.expires_at)
        .bind(n.created_at)
        .bind(n.delivered_at)
        .bind(n.is_read)
        .bind(n.read_at)
        .execute(&self.pool)
        .await
        .map_err(|e| db_err("Failed to insert notification", e))?;
        Ok(())
    }

    async fn get(&self, id: NotificationId) -> AppResult<Option<Notification>> {
        let row = sqlx::query_as::<_, NotificationRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM notifications WHERE id = $1"
        ))
        .bind(id.into_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_err("Failed to fetch notification", e))?;

        row.map(Notification::try_from).transpose()
    }

    async fn claim_ready(&self, now: DateTime<Utc>, limit: u32) -> AppResult<Vec<Notification>> {
        let rows = sqlx::query_as::<_, NotificationRow>(&format!(
            "UPDATE notifications SET status = 'sending' \
             WHERE id IN ( \
                 SELECT id FROM notifications \
                 WHERE status = 'pending' AND scheduled_for <= $1 \
                   AND (expires_at IS NULL OR expires_at > $1) \
                 ORDER BY priority_rank DESC, scheduled_for ASC, created_at ASC, id ASC \
                 LIMIT $2 \
                 FOR UPDATE SKIP LOCKED \
             ) \
             RETURNING {SELECT_COLUMNS}"
        ))
        .bind(now)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_err("Failed to claim ready notifications", e))?;

        let mut claimed: Vec<Notification> = rows
            .into_iter()
            .map(Notification::try_from)
            .collect::<AppResult<_>>()?;

        // RETURNING does not preserve the subquery's order.
        claimed.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then(a.scheduled_for.cmp(&b.scheduled_for))
                .then(a.created_at.cmp(&b.created_at))
        });
        Ok(claimed)
    }

    async fn update_delivery(&self, n: &Notification) -> AppResult<()> {
        sqlx::query(
            "UPDATE notifications SET status = $2, retry_count = $3, last_error = $4, \
             scheduled_for = $5, delivered_channels = $6, delivered_at = $7 \
             WHERE id = $1",
        )
        .bind(n.id.into_uuid())
        .bind(n.status.as_str())
        .bind(n.retry_count as i32)
        .bind(&n.last_error)
        .bind(n.scheduled_for)
        .bind(serde_json::to_value(&n.delivered_channels)?)
        .bind(n.delivered_at)
        .execute(&self.pool)
        .await
        .map_err(|e| db_err("Failed to update notification delivery state", e))?;
        Ok(())
    }

    async fn requeue_failed(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE notifications SET status = 'pending' \
             WHERE status = 'failed' AND scheduled_for <= $1",
        )
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| db_err("Failed to re-queue failed notifications", e))?;
        Ok(result.rows_affected())
    }

    async fn list_for_user(
        &self,
        user_id: UserId,
        unread_only: bool,
        limit: u32,
        cursor: Option<PageCursor>,
    ) -> AppResult<CursorPage<Notification>> {
        let rows = match cursor {
            Some(cursor) => {
                sqlx::query_as::<_, NotificationRow>(&format!(
                    "SELECT {SELECT_COLUMNS} FROM notifications \
                     WHERE user_id = $1 AND ($2 = FALSE OR is_read = FALSE) \
                       AND (created_at, id) < ($3, $4) \
                     ORDER BY created_at DESC, id DESC LIMIT $5"
                ))
                .bind(user_id.into_uuid())
                .bind(unread_only)
                .bind(cursor.created_at)
                .bind(cursor.id)
                .bind(limit as i64 + 1)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query_as::<_, NotificationRow>(&format!(
                    "SELECT {SELECT_COLUMNS} FROM notifications \
                     WHERE user_id = $1 AND ($2 = FALSE OR is_read = FALSE) \
                     ORDER BY created_at DESC, id DESC LIMIT $3"
                ))
                .bind(user_id.into_uuid())
                .bind(unread_only)
                .bind(limit as i64 + 1)
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(|e| db_err("Failed to list notifications", e))?;

        let mut items: Vec<Notification> = rows
            .into_iter()
            .map(Notification::try_from)
            .collect::<AppResult<_>>()?;

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
        let result = sqlx::query(
            "UPDATE notifications SET is_read = TRUE, read_at = COALESCE(read_at, $3) \
             WHERE id = $1 AND user_id = $2",
        )
        .bind(id.into_uuid())
        .bind(user_id.into_uuid())
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(|e| db_err("Failed to mark notification read", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn mark_all_read(&self, user_id: UserId, at: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = TRUE, read_at = $2 \
             WHERE user_id = $1 AND is_read = FALSE",
        )
        .bind(user_id.into_uuid())
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(|e| db_err("Failed to mark all notifications read", e))?;
        Ok(result.rows_affected())
    }

    async fn count_unread(&self, user_id: UserId) -> AppResult<i64> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND is_read = FALSE",
        )
        .bind(user_id.into_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_err("Failed to count unread notifications", e))
    }

    async fn expire_overdue(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE notifications SET status = 'expired' \
             WHERE status = 'pending' AND expires_at IS NOT NULL AND expires_at <= $1",
        )
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| db_err("Failed to expire overdue notifications", e))?;
        Ok(result.rows_affected())
    }

    async fn purge_older_than(&self, cutoff: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query(
            "DELETE FROM notifications \
             WHERE created_at < $1 \
               AND status IN ('delivered', 'dead_lettered', 'cancelled', 'expired')",
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await
        .map_err(|e| db_err("Failed to purge old notifications", e))?;
        Ok(result.rows_affected())
    }
}

/// PostgreSQL-backed [`StaffDirectory`].
#[derive(Debug, Clone)]
pub struct PgDirectory {
    pool: PgPool,
}

impl PgDirectory {
    /// Create a new directory over an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    role: UserRole,
    full_name: String,
    email: Option<String>,
    phone: Option<String>,
    push_token: Option<String>,
    preferences: serde_json::Value,
}

impl UserRow {
    fn into_profile(self) -> RecipientProfile {
        let user_id = UserId::from_uuid(self.id);
        let categories: HashMap<String, ChannelPreference> =
            serde_json::from_value(self.preferences).unwrap_or_default();
        let preferences = if categories.is_empty() {
            NotificationPreference::default_for_user(user_id)
        } else {
            NotificationPreference {
                user_id,
                categories,
                updated_at: None,
            }
        };
        RecipientProfile {
            user_id,
            role: self.role,
            full_name: self.full_name,
            contact: ContactInfo {
                email: self.email,
                phone: self.phone,
                push_token: self.push_token,
            },
            preferences,
        }
    }
}

#[async_trait]
impl StaffDirectory for PgDirectory {
    async fn authorized_properties(&self, manager_id: UserId) -> AppResult<HashSet<PropertyId>> {
        let rows: Vec<Uuid> = sqlx::query_scalar(
            "SELECT property_id FROM property_assignments WHERE manager_id = $1",
        )
        .bind(manager_id.into_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_err("Failed to fetch property assignments", e))?;

        Ok(rows.into_iter().map(PropertyId::from_uuid).collect())
    }

    async fn recipients_for(
        &self,
        property_id: PropertyId,
        roles: &[UserRole],
    ) -> AppResult<Vec<RecipientProfile>> {
        let role_names: Vec<String> = roles.iter().map(|r| r.as_str().to_string()).collect();

        let rows = sqlx::query_as::<_, UserRow>(
            "SELECT u.id, u.role, u.full_name, u.email, u.phone, u.push_token, u.preferences \
             FROM users u \
             WHERE u.role::text = ANY($2) \
               AND (u.role = 'admin' \
                    OR (u.role = 'manager' AND EXISTS ( \
                        SELECT 1 FROM property_assignments pa \
                        WHERE pa.manager_id = u.id AND pa.property_id = $1)) \
                    OR (u.role = 'employee' AND EXISTS ( \
                        SELECT 1 FROM property_staff ps \
                        WHERE ps.user_id = u.id AND ps.property_id = $1)))",
        )
        .bind(property_id.into_uuid())
        .bind(&role_names)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_err("Failed to resolve event recipients", e))?;

        Ok(rows.into_iter().map(UserRow::into_profile).collect())
    }

    async fn contact(&self, user_id: UserId) -> AppResult<Option<ContactInfo>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, role, full_name, email, phone, push_token, preferences \
             FROM users WHERE id = $1",
        )
        .bind(user_id.into_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_err("Failed to fetch user contact info", e))?;

        Ok(row.map(|r| r.into_profile().contact))
    }
}
