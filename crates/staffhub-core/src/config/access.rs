//! Property-access cache configuration.

use serde::{Deserialize, Serialize};

/// Settings for the per-manager property-access cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessConfig {
    /// Seconds before a cached property set is considered stale.
    #[serde(default = "default_ttl")]
    pub ttl_seconds: u64,
    /// Hard timeout in seconds for a directory refresh call.
    #[serde(default = "default_refresh_timeout")]
    pub refresh_timeout_seconds: u64,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: default_ttl(),
            refresh_timeout_seconds: default_refresh_timeout(),
        }
    }
}

fn default_ttl() -> u64 {
    300
}

fn default_refresh_timeout() -> u64 {
    5
}
