//! Per-user notification delivery preferences.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use staffhub_core::types::id::UserId;

use super::channel::ChannelKind;
use super::event_type::EventType;

/// Preference settings for a single event category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelPreference {
    /// Whether this category is enabled at all.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Deliver to the recipient's personal room.
    #[serde(default = "default_true")]
    pub in_app: bool,
    /// Deliver via email.
    #[serde(default)]
    pub email: bool,
    /// Deliver via SMS.
    #[serde(default)]
    pub sms: bool,
    /// Deliver via mobile push.
    #[serde(default)]
    pub push: bool,
}

impl ChannelPreference {
    /// Channels selected by this preference, empty when disabled.
    pub fn channels(&self) -> Vec<ChannelKind> {
        if !self.enabled {
            return Vec::new();
        }
        let mut out = Vec::new();
        if self.in_app {
            out.push(ChannelKind::InApp);
        }
        if self.email {
            out.push(ChannelKind::Email);
        }
        if self.sms {
            out.push(ChannelKind::Sms);
        }
        if self.push {
            out.push(ChannelKind::Push);
        }
        out
    }
}

impl Default for ChannelPreference {
    fn default() -> Self {
        Self {
            enabled: true,
            in_app: true,
            email: false,
            sms: false,
            push: false,
        }
    }
}

/// Per-user notification delivery preferences, keyed by event category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationPreference {
    /// The user these preferences belong to.
    pub user_id: UserId,
    /// Category name → preference.
    pub categories: HashMap<String, ChannelPreference>,
    /// When preferences were last updated.
    pub updated_at: Option<DateTime<Utc>>,
}

impl NotificationPreference {
    /// Create default preferences for a user.
    pub fn default_for_user(user_id: UserId) -> Self {
        let mut categories = HashMap::new();
        for category in ["application", "deadline", "onboarding", "system"] {
            categories.insert(category.to_string(), ChannelPreference::default());
        }
        // System alerts go out on email too by default.
        if let Some(system) = categories.get_mut("system") {
            system.email = true;
        }
        Self {
            user_id,
            categories,
            updated_at: Some(Utc::now()),
        }
    }

    /// Channels to use for a given event type, falling back to the
    /// category default when the user has no explicit entry.
    pub fn channels_for(&self, event_type: EventType) -> Vec<ChannelKind> {
        self.categories
            .get(event_type.category())
            .cloned()
            .unwrap_or_default()
            .channels()
    }
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_channels() {
        let prefs = NotificationPreference::default_for_user(UserId::new());
        assert_eq!(
            prefs.channels_for(EventType::ApplicationSubmitted),
            vec![ChannelKind::InApp]
        );
        assert_eq!(
            prefs.channels_for(EventType::SystemAlert),
            vec![ChannelKind::InApp, ChannelKind::Email]
        );
    }

    #[test]
    fn test_disabled_category_selects_nothing() {
        let mut prefs = NotificationPreference::default_for_user(UserId::new());
        prefs
            .categories
            .get_mut("deadline")
            .expect("default category")
            .enabled = false;
        assert!(prefs.channels_for(EventType::DeadlineReminder).is_empty());
    }
}
