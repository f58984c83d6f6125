//! # staffhub-api
//!
//! HTTP and WebSocket surface for the StaffHub notification core:
//!
//! - `GET /ws` — authenticated WebSocket upgrade into the real-time engine
//! - `GET /api/notifications` — read-side listing with cursor pagination
//! - `POST /api/events` — inbound domain events from workflow collaborators
//! - `POST /api/access/{manager_id}/invalidate` — assignment-change hook

pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod router;
pub mod state;

pub use router::build_router;
pub use state::AppState;
