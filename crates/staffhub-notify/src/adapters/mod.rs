//! Channel adapter seam and implementations.
//!
//! Each adapter owns one delivery medium. Adapters report success or a
//! typed failure back to the dispatcher; they never mutate notification
//! state themselves.

use async_trait::async_trait;

use staffhub_entity::notification::ChannelKind;

pub mod email;
pub mod in_app;
pub mod push;
pub mod sms;

pub use email::EmailAdapter;
pub use in_app::InAppAdapter;
pub use push::PushAdapter;
pub use sms::SmsAdapter;

/// Error from one adapter invocation.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    /// Transient failure — worth retrying with backoff.
    #[error("Transient delivery failure: {0}")]
    Transient(String),

    /// Permanent failure (invalid address, rejected payload) — never
    /// retried, the notification dead-letters immediately.
    #[error("Permanent delivery failure: {0}")]
    Permanent(String),
}

impl DeliveryError {
    /// Whether the dispatcher should retry after this failure.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

/// One delivery medium.
#[async_trait]
pub trait ChannelAdapter: Send + Sync + std::fmt::Debug {
    /// The channel this adapter serves.
    fn channel(&self) -> ChannelKind;

    /// Deliver one message to one recipient address.
    ///
    /// `address` is channel-specific: an email address, an E.164 number,
    /// a push token, or the recipient's user id for in-app delivery.
    async fn send(
        &self,
        address: &str,
        subject: &str,
        body: &str,
        metadata: &serde_json::Value,
    ) -> Result<(), DeliveryError>;
}
