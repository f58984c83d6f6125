//! Delivery provider configuration for the outbound channel adapters.

use serde::{Deserialize, Serialize};

/// Settings for all outbound delivery providers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdaptersConfig {
    /// Email provider settings.
    #[serde(default)]
    pub email: EmailAdapterConfig,
    /// SMS gateway settings.
    #[serde(default)]
    pub sms: SmsAdapterConfig,
    /// Push gateway settings.
    #[serde(default)]
    pub push: PushAdapterConfig,
}

/// Email delivery provider (HTTP API) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailAdapterConfig {
    /// Provider API base URL.
    #[serde(default)]
    pub base_url: String,
    /// Provider API key.
    #[serde(default)]
    pub api_key: String,
    /// From address for outbound mail.
    #[serde(default = "default_from_address")]
    pub from_address: String,
}

/// SMS gateway (HTTP API) settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SmsAdapterConfig {
    /// Gateway API base URL.
    #[serde(default)]
    pub base_url: String,
    /// Gateway API key.
    #[serde(default)]
    pub api_key: String,
    /// Sender number or alphanumeric id.
    #[serde(default)]
    pub sender_id: String,
}

/// Push gateway (HTTP API) settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PushAdapterConfig {
    /// Gateway API base URL.
    #[serde(default)]
    pub base_url: String,
    /// Gateway API key.
    #[serde(default)]
    pub api_key: String,
}

impl Default for EmailAdapterConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_key: String::new(),
            from_address: default_from_address(),
        }
    }
}

fn default_from_address() -> String {
    "no-reply@staffhub.local".to_string()
}
