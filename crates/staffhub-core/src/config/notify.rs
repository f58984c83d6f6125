//! Notification queue and dispatcher configuration.

use serde::{Deserialize, Serialize};

/// Notification dispatcher configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Whether the dispatcher loop runs in this process.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Maximum delivery attempts before a notification is dead-lettered.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Base backoff delay in seconds (doubled per retry).
    #[serde(default = "default_backoff_base")]
    pub backoff_base_seconds: u64,
    /// Upper bound on the backoff delay in seconds.
    #[serde(default = "default_backoff_cap")]
    pub backoff_cap_seconds: u64,
    /// Maximum random jitter added to each backoff delay, in milliseconds.
    #[serde(default = "default_jitter")]
    pub backoff_jitter_ms: u64,
    /// Hard timeout in seconds for a single adapter call.
    #[serde(default = "default_adapter_timeout")]
    pub adapter_timeout_seconds: u64,
    /// Maximum notifications claimed per dispatch pass.
    #[serde(default = "default_batch_size")]
    pub dispatch_batch_size: u32,
    /// Number of concurrent delivery tasks.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Interval in seconds between dispatcher polls.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u64,
    /// Days after which read or terminal notifications are purged.
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
    /// When set, an in-app broadcast that reaches zero live connections
    /// counts as a transient failure instead of a delivery.
    #[serde(default)]
    pub in_app_requires_listener: bool,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_retries: default_max_retries(),
            backoff_base_seconds: default_backoff_base(),
            backoff_cap_seconds: default_backoff_cap(),
            backoff_jitter_ms: default_jitter(),
            adapter_timeout_seconds: default_adapter_timeout(),
            dispatch_batch_size: default_batch_size(),
            concurrency: default_concurrency(),
            poll_interval_seconds: default_poll_interval(),
            retention_days: default_retention_days(),
            in_app_requires_listener: false,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_max_retries() -> u32 {
    3
}

fn default_backoff_base() -> u64 {
    5
}

fn default_backoff_cap() -> u64 {
    300
}

fn default_jitter() -> u64 {
    1000
}

fn default_adapter_timeout() -> u64 {
    10
}

fn default_batch_size() -> u32 {
    100
}

fn default_concurrency() -> usize {
    8
}

fn default_poll_interval() -> u64 {
    5
}

fn default_retention_days() -> u32 {
    30
}
