//! WebSocket upgrade handler.

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{info, warn};

use staffhub_realtime::connection::handle::ConnectionId;

use crate::dto::request::WsQuery;
use crate::error::ApiError;
use crate::state::AppState;

/// GET /ws?token={jwt} — WebSocket upgrade.
///
/// The credential is verified during registration, before any frame is
/// exchanged; a bad token rejects the handshake with 401.
pub async fn ws_upgrade(
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
) -> Result<Response, ApiError> {
    let (handle, outbound_rx) = state.connections.register(&query.token)?;
    let conn_id = handle.id;

    Ok(ws.on_upgrade(move |socket| pump(state, conn_id, outbound_rx, socket)))
}

/// Bridges one established socket with the connection manager: one task
/// drains the outbound buffer into the socket, the current task feeds
/// inbound frames to the engine.
async fn pump(
    state: AppState,
    conn_id: ConnectionId,
    mut outbound_rx: mpsc::Receiver<String>,
    socket: WebSocket,
) {
    let (mut ws_tx, mut ws_rx) = socket.split();

    let outbound_task = tokio::spawn(async move {
        while let Some(frame) = outbound_rx.recv().await {
            if ws_tx.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
    });

    info!(conn_id = %conn_id, "WebSocket connection established");

    while let Some(result) = ws_rx.next().await {
        match result {
            Ok(Message::Text(text)) => {
                state.connections.handle_inbound(&conn_id, &text).await;
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                warn!(conn_id = %conn_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    outbound_task.abort();
    state.connections.disconnect(&conn_id);
    info!(conn_id = %conn_id, "WebSocket connection closed");
}
