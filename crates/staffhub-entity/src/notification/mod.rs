//! Notification domain types.

pub mod channel;
pub mod event_type;
pub mod model;
pub mod preference;
pub mod priority;
pub mod status;

pub use channel::ChannelKind;
pub use event_type::EventType;
pub use model::{AttemptOutcome, DeliveryAttempt, Notification};
pub use preference::{ChannelPreference, NotificationPreference};
pub use priority::NotificationPriority;
pub use status::NotificationStatus;
