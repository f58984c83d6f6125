//! Read-side notification handlers.

use axum::Json;
use axum::extract::{Path, Query, State};
use uuid::Uuid;

use staffhub_core::types::cursor::CursorPage;
use staffhub_core::types::id::NotificationId;
use staffhub_entity::notification::Notification;

use crate::dto::request::ListNotificationsQuery;
use crate::dto::response::{ApiResponse, CountResponse};
use crate::error::ApiError;
use crate::extractors::AuthUser;
use crate::state::AppState;

/// GET /api/notifications
pub async fn list_notifications(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(query): Query<ListNotificationsQuery>,
) -> Result<Json<ApiResponse<CursorPage<Notification>>>, ApiError> {
    let page = state
        .reader
        .list_notifications(
            user.user_id,
            query.unread_only,
            query.limit,
            query.cursor.as_deref(),
        )
        .await?;
    Ok(Json(ApiResponse::ok(page)))
}

/// GET /api/notifications/unread-count
pub async fn unread_count(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<ApiResponse<CountResponse>>, ApiError> {
    let count = state.reader.unread_count(user.user_id).await?;
    Ok(Json(ApiResponse::ok(CountResponse { count })))
}

/// PUT /api/notifications/{id}/read
pub async fn mark_read(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state
        .reader
        .mark_read(NotificationId::from_uuid(id), user.user_id)
        .await?;
    Ok(Json(
        serde_json::json!({ "success": true, "data": { "message": "Marked as read" } }),
    ))
}

/// PUT /api/notifications/read-all
pub async fn mark_all_read(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<serde_json::Value>, ApiError> {
    let marked = state.reader.mark_all_read(user.user_id).await?;
    Ok(Json(
        serde_json::json!({ "success": true, "data": { "marked": marked } }),
    ))
}
