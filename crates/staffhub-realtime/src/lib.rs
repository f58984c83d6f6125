//! # staffhub-realtime
//!
//! Real-time engine for Suzuki StaffHub. Provides:
//!
//! - Connection registry with JWT-verified registration
//! - Property-scoped rooms with an access-cache-gated subscribe path
//! - O(room size) broadcast fan-out with per-connection ordering
//! - Heartbeat tracking and a background sweep for dead connections

pub mod connection;
pub mod message;
pub mod metrics;
pub mod room;

pub use connection::manager::ConnectionManager;
pub use connection::sweeper::run_sweeper;
pub use message::types::{InboundMessage, OutboundMessage};
pub use metrics::EngineMetrics;
pub use room::key::RoomKey;
pub use room::registry::RoomRegistry;
