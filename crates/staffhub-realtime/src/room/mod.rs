//! Room (broadcast scope) types and registry.

pub mod key;
pub mod registry;
pub mod room;
pub mod subscription;

pub use key::RoomKey;
pub use registry::RoomRegistry;
