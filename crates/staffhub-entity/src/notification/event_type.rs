//! Closed enumeration of notification-worthy domain events.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Event types the notification pipeline understands.
///
/// This is a closed set; workflow collaborators raising anything else
/// get a validation error at the API boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// A candidate submitted a job application for a property.
    ApplicationSubmitted,
    /// A manager approved an application.
    ApplicationApproved,
    /// A manager rejected an application.
    ApplicationRejected,
    /// An onboarding deadline is approaching.
    DeadlineReminder,
    /// A new hire finished all onboarding steps.
    OnboardingComplete,
    /// Platform-level alert raised by operators.
    SystemAlert,
}

impl EventType {
    /// Return the event type as a snake_case string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ApplicationSubmitted => "application_submitted",
            Self::ApplicationApproved => "application_approved",
            Self::ApplicationRejected => "application_rejected",
            Self::DeadlineReminder => "deadline_reminder",
            Self::OnboardingComplete => "onboarding_complete",
            Self::SystemAlert => "system_alert",
        }
    }

    /// Preference category this event falls under.
    pub fn category(&self) -> &'static str {
        match self {
            Self::ApplicationSubmitted | Self::ApplicationApproved | Self::ApplicationRejected => {
                "application"
            }
            Self::DeadlineReminder => "deadline",
            Self::OnboardingComplete => "onboarding",
            Self::SystemAlert => "system",
        }
    }

    /// Default notification headline for this event.
    pub fn title(&self) -> &'static str {
        match self {
            Self::ApplicationSubmitted => "New job application",
            Self::ApplicationApproved => "Application approved",
            Self::ApplicationRejected => "Application rejected",
            Self::DeadlineReminder => "Onboarding deadline approaching",
            Self::OnboardingComplete => "Onboarding complete",
            Self::SystemAlert => "System alert",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EventType {
    type Err = staffhub_core::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "application_submitted" => Ok(Self::ApplicationSubmitted),
            "application_approved" => Ok(Self::ApplicationApproved),
            "application_rejected" => Ok(Self::ApplicationRejected),
            "deadline_reminder" => Ok(Self::DeadlineReminder),
            "onboarding_complete" => Ok(Self::OnboardingComplete),
            "system_alert" => Ok(Self::SystemAlert),
            _ => Err(staffhub_core::AppError::validation(format!(
                "Unknown event type: '{s}'"
            ))),
        }
    }
}
