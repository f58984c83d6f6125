//! Email adapter — HTTP delivery provider.

use async_trait::async_trait;
use tracing::debug;

use staffhub_core::config::adapters::EmailAdapterConfig;
use staffhub_entity::notification::ChannelKind;

use super::{ChannelAdapter, DeliveryError};

/// Sends email through the configured HTTP provider.
#[derive(Debug)]
pub struct EmailAdapter {
    client: reqwest::Client,
    config: EmailAdapterConfig,
}

impl EmailAdapter {
    /// Create an email adapter from configuration.
    pub fn new(config: EmailAdapterConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }
}

#[async_trait]
impl ChannelAdapter for EmailAdapter {
    fn channel(&self) -> ChannelKind {
        ChannelKind::Email
    }

    async fn send(
        &self,
        address: &str,
        subject: &str,
        body: &str,
        _metadata: &serde_json::Value,
    ) -> Result<(), DeliveryError> {
        if self.config.base_url.is_empty() {
            debug!(to = %address, "Email provider not configured, skipping send");
            return Ok(());
        }

        let response = self
            .client
            .post(format!("{}/messages", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .json(&serde_json::json!({
                "from": self.config.from_address,
                "to": address,
                "subject": subject,
                "text": body,
            }))
            .send()
            .await
            .map_err(|e| DeliveryError::Transient(format!("Email provider unreachable: {e}")))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let detail = response.text().await.unwrap_or_default();
        if status.is_client_error() {
            Err(DeliveryError::Permanent(format!(
                "Email provider rejected message ({status}): {detail}"
            )))
        } else {
            Err(DeliveryError::Transient(format!(
                "Email provider error ({status}): {detail}"
            )))
        }
    }
}
