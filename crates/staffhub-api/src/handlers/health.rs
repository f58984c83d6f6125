//! Health and engine metrics.

use axum::Json;
use axum::extract::State;

use crate::state::AppState;

/// GET /api/health
pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let metrics = state.metrics.snapshot();
    Json(serde_json::json!({
        "status": "ok",
        "connections": state.connections.connection_count(),
        "users_online": state.connections.user_count(),
        "rooms": state.connections.rooms().room_count(),
        "metrics": metrics,
    }))
}
