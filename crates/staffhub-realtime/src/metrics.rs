//! Engine metrics — cheap atomic counters exposed on the health surface.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Counters for the real-time engine.
#[derive(Debug, Default)]
pub struct EngineMetrics {
    /// Total connections accepted since start.
    connections_total: AtomicU64,
    /// Currently open connections.
    connections_active: AtomicU64,
    /// Messages pushed to connections.
    messages_sent: AtomicU64,
    /// Broadcast invocations.
    broadcasts: AtomicU64,
    /// Connections dropped by the heartbeat sweep.
    swept_connections: AtomicU64,
}

/// Point-in-time metrics snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    /// Total connections accepted since start.
    pub connections_total: u64,
    /// Currently open connections.
    pub connections_active: u64,
    /// Messages pushed to connections.
    pub messages_sent: u64,
    /// Broadcast invocations.
    pub broadcasts: u64,
    /// Connections dropped by the heartbeat sweep.
    pub swept_connections: u64,
}

impl EngineMetrics {
    /// Create zeroed metrics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new connection.
    pub fn connection_opened(&self) {
        self.connections_total.fetch_add(1, Ordering::Relaxed);
        self.connections_active.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a disconnection.
    pub fn connection_closed(&self) {
        self.connections_active.fetch_sub(1, Ordering::Relaxed);
    }

    /// Record messages pushed to connections.
    pub fn messages_sent(&self, count: u64) {
        self.messages_sent.fetch_add(count, Ordering::Relaxed);
    }

    /// Record a broadcast invocation.
    pub fn broadcast(&self) {
        self.broadcasts.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a heartbeat-sweep disconnect.
    pub fn connection_swept(&self) {
        self.swept_connections.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a point-in-time snapshot.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            connections_total: self.connections_total.load(Ordering::Relaxed),
            connections_active: self.connections_active.load(Ordering::Relaxed),
            messages_sent: self.messages_sent.load(Ordering::Relaxed),
            broadcasts: self.broadcasts.load(Ordering::Relaxed),
            swept_connections: self.swept_connections.load(Ordering::Relaxed),
        }
    }
}
