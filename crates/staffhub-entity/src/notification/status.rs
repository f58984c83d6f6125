//! Notification delivery status state machine.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Delivery lifecycle state of a notification.
///
/// Legal transitions:
///
/// ```text
/// pending ──► sending ──► delivered
///    │            │
///    │            └─► failed ──► pending   (retry after backoff)
///    │                   │
///    │                   └─────► dead_lettered
///    └──► cancelled | expired
/// ```
///
/// `failed → pending` is the one sanctioned re-queue loop; everything
/// else only moves forward, and the four terminal states never leave.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationStatus {
    /// Waiting for dispatch (possibly scheduled in the future).
    Pending,
    /// Claimed by the dispatcher; delivery in progress.
    Sending,
    /// Every requested channel confirmed success.
    Delivered,
    /// At least one channel failed transiently; awaiting re-queue.
    Failed,
    /// Retries exhausted or a permanent failure occurred. Terminal.
    DeadLettered,
    /// Expired before dispatch could begin. Terminal.
    Cancelled,
    /// Expired while still pending, marked by the retention sweep. Terminal.
    Expired,
}

impl NotificationStatus {
    /// Whether this status permits a transition to `next`.
    pub fn can_transition_to(&self, next: NotificationStatus) -> bool {
        use NotificationStatus::*;
        matches!(
            (self, next),
            (Pending, Sending)
                | (Pending, Cancelled)
                | (Pending, Expired)
                | (Sending, Delivered)
                | (Sending, Failed)
                | (Sending, DeadLettered)
                | (Failed, Pending)
                | (Failed, DeadLettered)
        )
    }

    /// Whether this status is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Delivered | Self::DeadLettered | Self::Cancelled | Self::Expired
        )
    }

    /// Return the status as a snake_case string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Sending => "sending",
            Self::Delivered => "delivered",
            Self::Failed => "failed",
            Self::DeadLettered => "dead_lettered",
            Self::Cancelled => "cancelled",
            Self::Expired => "expired",
        }
    }
}

impl fmt::Display for NotificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for NotificationStatus {
    type Err = staffhub_core::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "sending" => Ok(Self::Sending),
            "delivered" => Ok(Self::Delivered),
            "failed" => Ok(Self::Failed),
            "dead_lettered" => Ok(Self::DeadLettered),
            "cancelled" => Ok(Self::Cancelled),
            "expired" => Ok(Self::Expired),
            _ => Err(staffhub_core::AppError::validation(format!(
                "Unknown notification status: '{s}'"
            ))),
        }
    }
}
