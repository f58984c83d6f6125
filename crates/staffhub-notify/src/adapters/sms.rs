//! SMS adapter — HTTP gateway.

use async_trait::async_trait;
use tracing::debug;

use staffhub_core::config::adapters::SmsAdapterConfig;
use staffhub_entity::notification::ChannelKind;

use super::{ChannelAdapter, DeliveryError};

/// Sends SMS through the configured HTTP gateway.
#[derive(Debug)]
pub struct SmsAdapter {
    client: reqwest::Client,
    config: SmsAdapterConfig,
}

impl SmsAdapter {
    /// Create an SMS adapter from configuration.
    pub fn new(config: SmsAdapterConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }
}

#[async_trait]
impl ChannelAdapter for SmsAdapter {
    fn channel(&self) -> ChannelKind {
        ChannelKind::Sms
    }

    async fn send(
        &self,
        address: &str,
        _subject: &str,
        body: &str,
        _metadata: &serde_json::Value,
    ) -> Result<(), DeliveryError> {
        if self.config.base_url.is_empty() {
            debug!(to = %address, "SMS gateway not configured, skipping send");
            return Ok(());
        }

        let response = self
            .client
            .post(format!("{}/sms", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .json(&serde_json::json!({
                "from": self.config.sender_id,
                "to": address,
                "body": body,
            }))
            .send()
            .await
            .map_err(|e| DeliveryError::Transient(format!("SMS gateway unreachable: {e}")))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let detail = response.text().await.unwrap_or_default();
        if status.is_client_error() {
            Err(DeliveryError::Permanent(format!(
                "SMS gateway rejected message ({status}): {detail}"
            )))
        } else {
            Err(DeliveryError::Transient(format!(
                "SMS gateway error ({status}): {detail}"
            )))
        }
    }
}
