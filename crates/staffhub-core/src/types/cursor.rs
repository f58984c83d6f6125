//! Keyset cursor pagination for list endpoints.
//!
//! Cursors are opaque to clients: a base64url encoding of the last-seen
//! `created_at` timestamp (microseconds) and row id. Listing walks
//! `created_at DESC, id DESC`, so a cursor marks the exclusive upper
//! bound of the next page.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::result::AppResult;

/// Default page size for cursor listings.
const DEFAULT_LIMIT: u32 = 25;
/// Maximum page size for cursor listings.
const MAX_LIMIT: u32 = 100;

/// Decoded position within a keyset listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCursor {
    /// `created_at` of the last item on the previous page.
    pub created_at: DateTime<Utc>,
    /// Id of the last item on the previous page (tie-breaker).
    pub id: Uuid,
}

impl PageCursor {
    /// Encode into the opaque client-facing form.
    pub fn encode(&self) -> String {
        let raw = format!("{}:{}", self.created_at.timestamp_micros(), self.id);
        URL_SAFE_NO_PAD.encode(raw)
    }

    /// Decode a client-supplied cursor string.
    pub fn decode(token: &str) -> AppResult<Self> {
        let bytes = URL_SAFE_NO_PAD
            .decode(token)
            .map_err(|_| AppError::validation("Malformed pagination cursor"))?;
        let raw = String::from_utf8(bytes)
            .map_err(|_| AppError::validation("Malformed pagination cursor"))?;

        let (micros, id) = raw
            .split_once(':')
            .ok_or_else(|| AppError::validation("Malformed pagination cursor"))?;

        let micros: i64 = micros
            .parse()
            .map_err(|_| AppError::validation("Malformed pagination cursor"))?;
        let created_at = DateTime::from_timestamp_micros(micros)
            .ok_or_else(|| AppError::validation("Malformed pagination cursor"))?;
        let id = Uuid::parse_str(id)
            .map_err(|_| AppError::validation("Malformed pagination cursor"))?;

        Ok(Self { created_at, id })
    }
}

/// One page of a cursor listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CursorPage<T: Serialize> {
    /// The items on this page, newest first.
    pub items: Vec<T>,
    /// Cursor for the next page, absent when this page is the last.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

/// Clamp a client-supplied page limit to the allowed range.
pub fn clamp_limit(limit: Option<u32>) -> u32 {
    limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_roundtrip() {
        let cursor = PageCursor {
            created_at: Utc::now(),
            id: Uuid::new_v4(),
        };
        let token = cursor.encode();
        let decoded = PageCursor::decode(&token).expect("decode");
        assert_eq!(
            decoded.created_at.timestamp_micros(),
            cursor.created_at.timestamp_micros()
        );
        assert_eq!(decoded.id, cursor.id);
    }

    #[test]
    fn test_cursor_rejects_garbage() {
        assert!(PageCursor::decode("not-a-cursor!!").is_err());
        assert!(PageCursor::decode("").is_err());
    }

    #[test]
    fn test_clamp_limit() {
        assert_eq!(clamp_limit(None), 25);
        assert_eq!(clamp_limit(Some(0)), 1);
        assert_eq!(clamp_limit(Some(500)), 100);
    }
}
