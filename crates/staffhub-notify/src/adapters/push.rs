//! Push adapter — HTTP gateway.

use async_trait::async_trait;
use tracing::debug;

use staffhub_core::config::adapters::PushAdapterConfig;
use staffhub_entity::notification::ChannelKind;

use super::{ChannelAdapter, DeliveryError};

/// Sends mobile push notifications through the configured HTTP gateway.
#[derive(Debug)]
pub struct PushAdapter {
    client: reqwest::Client,
    config: PushAdapterConfig,
}

impl PushAdapter {
    /// Create a push adapter from configuration.
    pub fn new(config: PushAdapterConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }
}

#[async_trait]
impl ChannelAdapter for PushAdapter {
    fn channel(&self) -> ChannelKind {
        ChannelKind::Push
    }

    async fn send(
        &self,
        address: &str,
        subject: &str,
        body: &str,
        metadata: &serde_json::Value,
    ) -> Result<(), DeliveryError> {
        if self.config.base_url.is_empty() {
            debug!("Push gateway not configured, skipping send");
            return Ok(());
        }

        let response = self
            .client
            .post(format!("{}/push", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .json(&serde_json::json!({
                "token": address,
                "title": subject,
                "body": body,
                "data": metadata,
            }))
            .send()
            .await
            .map_err(|e| DeliveryError::Transient(format!("Push gateway unreachable: {e}")))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let detail = response.text().await.unwrap_or_default();
        if status.is_client_error() {
            Err(DeliveryError::Permanent(format!(
                "Push gateway rejected message ({status}): {detail}"
            )))
        } else {
            Err(DeliveryError::Transient(format!(
                "Push gateway error ({status}): {detail}"
            )))
        }
    }
}
