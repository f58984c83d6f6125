//! Background heartbeat sweep.
//!
//! Connections refresh their heartbeat on every `heartbeat` control
//! frame; this task periodically disconnects any connection whose last
//! heartbeat is older than the configured timeout, vacating all its
//! room memberships.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::time;
use tracing::{debug, info, warn};

use crate::connection::manager::ConnectionManager;
use crate::metrics::EngineMetrics;

/// Run the heartbeat sweep until the cancel signal fires.
pub async fn run_sweeper(
    manager: Arc<ConnectionManager>,
    metrics: Arc<EngineMetrics>,
    mut cancel: watch::Receiver<bool>,
) {
    let config = manager.config().clone();
    let timeout = chrono::Duration::seconds(config.heartbeat_timeout_seconds as i64);
    let mut interval = time::interval(Duration::from_secs(config.sweep_interval_seconds));

    info!(
        timeout_seconds = config.heartbeat_timeout_seconds,
        sweep_interval_seconds = config.sweep_interval_seconds,
        "Heartbeat sweep started"
    );

    loop {
        tokio::select! {
            _ = cancel.changed() => {
                if *cancel.borrow() {
                    info!("Heartbeat sweep received shutdown signal");
                    break;
                }
            }
            _ = interval.tick() => {
                sweep_once(&manager, &metrics, timeout).await;
            }
        }
    }
}

/// One sweep pass over the pool.
pub async fn sweep_once(
    manager: &ConnectionManager,
    metrics: &EngineMetrics,
    timeout: chrono::Duration,
) -> usize {
    let now = Utc::now();
    let mut swept = 0usize;

    for handle in manager.pool().all_connections() {
        let idle = now - handle.last_heartbeat().await;
        if idle > timeout {
            warn!(
                conn_id = %handle.id,
                user_id = %handle.user_id,
                idle_seconds = idle.num_seconds(),
                "Heartbeat timeout, disconnecting"
            );
            manager.disconnect(&handle.id);
            metrics.connection_swept();
            swept += 1;
        }
    }

    if swept > 0 {
        debug!(count = swept, "Heartbeat sweep disconnected stale connections");
    }
    swept
}
