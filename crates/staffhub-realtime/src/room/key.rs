//! Room key — a named broadcast scope.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use staffhub_core::error::AppError;
use staffhub_core::types::id::{PropertyId, UserId};

/// A named fan-out scope for broadcast events.
///
/// Wire form: `"global"`, `"property:{uuid}"`, `"user:{uuid}"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum RoomKey {
    /// Platform-wide room, admin subscribers only.
    Global,
    /// Per-property room; managers restricted to authorized properties.
    Property(PropertyId),
    /// A user's personal room; in-app notifications land here.
    User(UserId),
}

impl fmt::Display for RoomKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Global => write!(f, "global"),
            Self::Property(id) => write!(f, "property:{id}"),
            Self::User(id) => write!(f, "user:{id}"),
        }
    }
}

impl FromStr for RoomKey {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "global" {
            return Ok(Self::Global);
        }
        if let Some(id) = s.strip_prefix("property:") {
            return id
                .parse()
                .map(Self::Property)
                .map_err(|_| AppError::validation(format!("Invalid property room key: '{s}'")));
        }
        if let Some(id) = s.strip_prefix("user:") {
            return id
                .parse()
                .map(Self::User)
                .map_err(|_| AppError::validation(format!("Invalid user room key: '{s}'")));
        }
        Err(AppError::validation(format!("Unknown room key: '{s}'")))
    }
}

impl TryFrom<String> for RoomKey {
    type Error = AppError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<RoomKey> for String {
    fn from(key: RoomKey) -> String {
        key.to_string()
    }
}
