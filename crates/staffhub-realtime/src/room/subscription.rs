//! Subscription tracking — which connections belong to which rooms.

use std::collections::HashSet;

use dashmap::DashMap;

use crate::connection::handle::ConnectionId;

use super::key::RoomKey;

/// Tracks connection-to-room membership (reverse index).
///
/// Lets unregistration vacate every room a connection belongs to in one
/// pass instead of scanning all rooms.
#[derive(Debug, Default)]
pub struct SubscriptionTracker {
    /// Connection ID → set of room keys.
    conn_to_rooms: DashMap<ConnectionId, HashSet<RoomKey>>,
}

impl SubscriptionTracker {
    /// Creates a new subscription tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a membership.
    pub fn add(&self, conn_id: ConnectionId, room: RoomKey) {
        self.conn_to_rooms.entry(conn_id).or_default().insert(room);
    }

    /// Removes a membership.
    pub fn remove(&self, conn_id: ConnectionId, room: &RoomKey) {
        if let Some(mut rooms) = self.conn_to_rooms.get_mut(&conn_id) {
            rooms.remove(room);
        }
    }

    /// Returns all rooms a connection belongs to.
    pub fn rooms_of(&self, conn_id: ConnectionId) -> HashSet<RoomKey> {
        self.conn_to_rooms
            .get(&conn_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    /// Returns the number of rooms a connection belongs to.
    pub fn count(&self, conn_id: ConnectionId) -> usize {
        self.conn_to_rooms
            .get(&conn_id)
            .map(|entry| entry.value().len())
            .unwrap_or(0)
    }

    /// Removes all memberships for a connection, returning the rooms left.
    pub fn remove_all(&self, conn_id: ConnectionId) -> HashSet<RoomKey> {
        self.conn_to_rooms
            .remove(&conn_id)
            .map(|(_, rooms)| rooms)
            .unwrap_or_default()
    }
}
