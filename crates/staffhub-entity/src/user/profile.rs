//! Recipient profile as returned by the staff directory collaborator.

use serde::{Deserialize, Serialize};

use staffhub_core::types::id::UserId;

use crate::notification::preference::NotificationPreference;
use crate::user::role::UserRole;

/// Delivery addresses for a single user.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContactInfo {
    /// Email address, if on file.
    pub email: Option<String>,
    /// Mobile number in E.164 form, if on file.
    pub phone: Option<String>,
    /// Push registration token, if the user has a registered device.
    pub push_token: Option<String>,
}

/// Everything the notification pipeline needs to know about a recipient.
///
/// Resolved from the staff directory when an event fans out; the pipeline
/// never queries user records directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipientProfile {
    /// The user's identifier.
    pub user_id: UserId,
    /// The user's role.
    pub role: UserRole,
    /// Display name.
    pub full_name: String,
    /// Delivery addresses.
    pub contact: ContactInfo,
    /// Per-category channel preferences.
    pub preferences: NotificationPreference,
}
