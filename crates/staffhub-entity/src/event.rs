//! Domain events raised by workflow collaborators.

use serde::{Deserialize, Serialize};

use staffhub_core::types::id::PropertyId;

use crate::notification::event_type::EventType;
use crate::notification::priority::NotificationPriority;
use crate::user::role::UserRole;

/// An event raised by a workflow collaborator (application review,
/// onboarding completion, assignment management).
///
/// The notification pipeline resolves this into one enqueued
/// notification per recipient/channel-preference combination.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainEvent {
    /// What happened.
    pub event_type: EventType,
    /// The property the event concerns.
    pub property_id: PropertyId,
    /// Opaque structured payload forwarded to recipients.
    pub payload: serde_json::Value,
    /// Roles that should be notified.
    pub target_roles: Vec<UserRole>,
    /// Priority for the resulting notifications.
    #[serde(default)]
    pub priority: NotificationPriority,
}

impl DomainEvent {
    /// Human-readable body for the resulting notifications.
    ///
    /// Uses the payload's `"message"` field when present, otherwise the
    /// event type's default headline.
    pub fn body_text(&self) -> String {
        self.payload
            .get("message")
            .and_then(|v| v.as_str())
            .unwrap_or(self.event_type.title())
            .to_string()
    }
}
