//! Access-cache invalidation hook for the assignment-management
//! collaborator.

use axum::Json;
use axum::extract::{Path, State};
use uuid::Uuid;

use staffhub_core::error::AppError;
use staffhub_core::types::id::UserId;

use crate::error::ApiError;
use crate::extractors::AuthUser;
use crate::state::AppState;

/// POST /api/access/{manager_id}/invalidate
///
/// Called whenever a manager's property assignments change. Live room
/// subscriptions are unaffected; the next subscription attempt sees
/// fresh data.
pub async fn invalidate_access(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(manager_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if !user.role.is_admin() {
        return Err(AppError::authorization("Only service accounts may invalidate access").into());
    }

    state.access.invalidate(UserId::from_uuid(manager_id));
    Ok(Json(
        serde_json::json!({ "success": true, "data": { "message": "Invalidated" } }),
    ))
}
