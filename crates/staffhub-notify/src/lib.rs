//! # staffhub-notify
//!
//! Notification pipeline for Suzuki StaffHub:
//!
//! - Queue with synchronous validation on enqueue
//! - Dispatcher with a bounded worker pool, exponential backoff with
//!   jitter, and a dead-letter path
//! - Channel adapters: in-app (room broadcast), email, SMS, push
//! - Event fan-out resolving recipients and channel preferences
//! - Read-side service for dashboards (list, unread count, mark read)
//! - Cron-scheduled retention cleanup

pub mod adapters;
pub mod backoff;
pub mod dispatcher;
pub mod fanout;
pub mod queue;
pub mod scheduler;
pub mod service;

pub use dispatcher::{DeadLetter, Dispatcher};
pub use fanout::EventFanout;
pub use queue::{EnqueueParams, NotificationQueue};
pub use service::NotificationReader;
