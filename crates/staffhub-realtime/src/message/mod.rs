//! Wire message type definitions.

pub mod types;

pub use types::{InboundMessage, OutboundMessage};
