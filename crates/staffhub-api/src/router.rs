//! Route definitions for the StaffHub notification core.
//!
//! REST routes are organized by domain and mounted under `/api`; the
//! WebSocket upgrade lives at `/ws`. The router receives `AppState` and
//! passes it to all handlers via Axum's `State` extractor.

use axum::{
    Router,
    routing::{get, post, put},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Build the complete Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .merge(notification_routes())
        .merge(event_routes())
        .merge(health_routes());

    let ws_routes = Router::new().route("/ws", get(handlers::ws::ws_upgrade));

    Router::new()
        .nest("/api", api_routes)
        .merge(ws_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Read-side notification endpoints.
fn notification_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/notifications",
            get(handlers::notifications::list_notifications),
        )
        .route(
            "/notifications/unread-count",
            get(handlers::notifications::unread_count),
        )
        .route(
            "/notifications/{id}/read",
            put(handlers::notifications::mark_read),
        )
        .route(
            "/notifications/read-all",
            put(handlers::notifications::mark_all_read),
        )
}

/// Collaborator-facing endpoints.
fn event_routes() -> Router<AppState> {
    Router::new()
        .route("/events", post(handlers::events::raise_event))
        .route(
            "/access/{manager_id}/invalidate",
            post(handlers::access::invalidate_access),
        )
}

/// Health endpoint.
fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health::health))
}
