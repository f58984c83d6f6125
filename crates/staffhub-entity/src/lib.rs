//! # staffhub-entity
//!
//! Domain entity models and enums for Suzuki StaffHub: users and roles,
//! notifications with their delivery state machine, channel and priority
//! enums, per-user delivery preferences, and the domain events raised by
//! workflow collaborators.

pub mod event;
pub mod notification;
pub mod user;

pub use event::DomainEvent;
pub use notification::model::Notification;
pub use user::role::UserRole;
