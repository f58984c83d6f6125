//! Real-time connection engine configuration.

use serde::{Deserialize, Serialize};

/// Real-time connection engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// Maximum concurrent connections per user.
    #[serde(default = "default_max_connections_per_user")]
    pub max_connections_per_user: usize,
    /// Per-connection outbound message buffer size.
    #[serde(default = "default_channel_buffer")]
    pub channel_buffer_size: usize,
    /// Seconds without a heartbeat before a connection is swept.
    #[serde(default = "default_heartbeat_timeout")]
    pub heartbeat_timeout_seconds: u64,
    /// Interval in seconds between heartbeat sweeps.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_seconds: u64,
    /// Maximum room subscriptions per connection.
    #[serde(default = "default_max_subscriptions")]
    pub max_subscriptions_per_connection: usize,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            max_connections_per_user: default_max_connections_per_user(),
            channel_buffer_size: default_channel_buffer(),
            heartbeat_timeout_seconds: default_heartbeat_timeout(),
            sweep_interval_seconds: default_sweep_interval(),
            max_subscriptions_per_connection: default_max_subscriptions(),
        }
    }
}

fn default_max_connections_per_user() -> usize {
    5
}

fn default_channel_buffer() -> usize {
    256
}

fn default_heartbeat_timeout() -> u64 {
    60
}

fn default_sweep_interval() -> u64 {
    15
}

fn default_max_subscriptions() -> usize {
    50
}
