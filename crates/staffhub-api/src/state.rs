//! Shared application state threaded through every handler.

use std::sync::Arc;

use staffhub_auth::access::cache::AccessCache;
use staffhub_auth::jwt::verifier::TokenVerifier;
use staffhub_notify::fanout::EventFanout;
use staffhub_notify::service::NotificationReader;
use staffhub_realtime::connection::manager::ConnectionManager;
use staffhub_realtime::metrics::EngineMetrics;

/// Application state for the HTTP surface.
#[derive(Clone)]
pub struct AppState {
    /// Handshake credential verifier.
    pub verifier: Arc<TokenVerifier>,
    /// Property-access cache.
    pub access: Arc<AccessCache>,
    /// Real-time connection manager.
    pub connections: Arc<ConnectionManager>,
    /// Engine metrics.
    pub metrics: Arc<EngineMetrics>,
    /// Event fan-out for collaborator-raised events.
    pub fanout: EventFanout,
    /// Read-side notification service.
    pub reader: NotificationReader,
}
