//! Inbound domain events from workflow collaborators.

use std::str::FromStr;

use axum::Json;
use axum::extract::State;
use validator::Validate;

use staffhub_core::error::AppError;
use staffhub_core::types::id::PropertyId;
use staffhub_entity::event::DomainEvent;
use staffhub_entity::notification::{EventType, NotificationPriority};
use staffhub_entity::user::UserRole;

use crate::dto::request::RaiseEventRequest;
use crate::dto::response::{ApiResponse, FanoutResponse};
use crate::error::ApiError;
use crate::extractors::AuthUser;
use crate::state::AppState;

/// POST /api/events — raise a domain event for fan-out.
///
/// Reserved for workflow collaborators (application review, onboarding
/// completion), which authenticate with admin-role service credentials.
pub async fn raise_event(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(request): Json<RaiseEventRequest>,
) -> Result<Json<ApiResponse<FanoutResponse>>, ApiError> {
    if !user.role.is_admin() {
        return Err(AppError::authorization("Only service accounts may raise events").into());
    }
    request
        .validate()
        .map_err(|e| AppError::validation(format!("Invalid event request: {e}")))?;

    let event_type = EventType::from_str(&request.event_type)?;
    let target_roles = request
        .target_roles
        .iter()
        .map(|r| r.parse::<UserRole>())
        .collect::<Result<Vec<_>, _>>()?;
    let priority = request
        .priority
        .as_deref()
        .map(NotificationPriority::from_str_value)
        .unwrap_or_default();

    let event = DomainEvent {
        event_type,
        property_id: PropertyId::from_uuid(request.property_id),
        payload: request.payload,
        target_roles,
        priority,
    };

    let enqueued = state.fanout.raise_event(&event).await?;
    Ok(Json(ApiResponse::ok(FanoutResponse { enqueued })))
}
