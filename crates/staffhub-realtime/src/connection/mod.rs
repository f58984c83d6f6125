//! Connection lifecycle: handles, pool, manager, heartbeat sweep.

pub mod handle;
pub mod manager;
pub mod pool;
pub mod sweeper;

pub use handle::{ConnectionHandle, ConnectionId};
pub use manager::ConnectionManager;
