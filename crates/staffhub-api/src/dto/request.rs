//! Inbound request DTOs.

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Body of `POST /api/events` — a domain event raised by a workflow
/// collaborator.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RaiseEventRequest {
    /// Event type (must be in the closed set).
    #[validate(length(min = 1))]
    pub event_type: String,
    /// Property the event concerns.
    pub property_id: Uuid,
    /// Opaque structured payload forwarded to recipients.
    #[serde(default)]
    pub payload: serde_json::Value,
    /// Roles to notify.
    #[validate(length(min = 1, message = "at least one target role is required"))]
    pub target_roles: Vec<String>,
    /// Priority for the resulting notifications (defaults to normal).
    pub priority: Option<String>,
}

/// Query parameters for `GET /api/notifications`.
#[derive(Debug, Clone, Deserialize)]
pub struct ListNotificationsQuery {
    /// Only unread notifications.
    #[serde(default)]
    pub unread_only: bool,
    /// Page size (clamped server-side).
    pub limit: Option<u32>,
    /// Opaque cursor from a previous page.
    pub cursor: Option<String>,
}

/// Query parameter for the WebSocket upgrade.
#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// Handshake JWT.
    pub token: String,
}
