//! Room registry — manages all rooms and memberships.

use dashmap::DashMap;

use crate::connection::handle::ConnectionId;

use super::key::RoomKey;
use super::room::Room;
use super::subscription::SubscriptionTracker;

/// Registry of all active rooms.
///
/// Rooms are created lazily on first join and removed when the last
/// member leaves. Membership lookups are O(room size) via the room map;
/// teardown is O(rooms joined) via the reverse index.
#[derive(Debug, Default)]
pub struct RoomRegistry {
    /// Room key → room.
    rooms: DashMap<RoomKey, Room>,
    /// Reverse index: connection → rooms.
    subscriptions: SubscriptionTracker,
}

impl RoomRegistry {
    /// Creates a new room registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a connection to a room, creating the room if absent.
    pub fn join(&self, room: RoomKey, conn_id: ConnectionId) {
        self.rooms
            .entry(room)
            .or_insert_with(|| Room::new(room))
            .join(conn_id);
        self.subscriptions.add(conn_id, room);
    }

    /// Removes a connection from a room; deletes the room when it empties.
    ///
    /// A leave for a room the connection never joined is a no-op.
    pub fn leave(&self, room: RoomKey, conn_id: ConnectionId) {
        if let Some(mut entry) = self.rooms.get_mut(&room) {
            entry.leave(conn_id);
            if entry.is_empty() {
                drop(entry);
                self.rooms.remove(&room);
            }
        }
        self.subscriptions.remove(conn_id, &room);
    }

    /// Removes a connection from every room it belongs to in one pass.
    pub fn leave_all(&self, conn_id: ConnectionId) {
        let rooms = self.subscriptions.remove_all(conn_id);
        for room in &rooms {
            if let Some(mut entry) = self.rooms.get_mut(room) {
                entry.leave(conn_id);
                if entry.is_empty() {
                    drop(entry);
                    self.rooms.remove(room);
                }
            }
        }
    }

    /// Returns all member connection IDs of a room.
    pub fn members(&self, room: &RoomKey) -> Vec<ConnectionId> {
        self.rooms
            .get(room)
            .map(|r| r.member_ids())
            .unwrap_or_default()
    }

    /// Returns whether a connection is in a room.
    pub fn is_member(&self, room: &RoomKey, conn_id: ConnectionId) -> bool {
        self.rooms
            .get(room)
            .map(|r| r.members.contains(&conn_id))
            .unwrap_or(false)
    }

    /// Returns the number of rooms a connection belongs to.
    pub fn subscription_count(&self, conn_id: ConnectionId) -> usize {
        self.subscriptions.count(conn_id)
    }

    /// Returns member count for a room.
    pub fn member_count(&self, room: &RoomKey) -> usize {
        self.rooms.get(room).map(|r| r.member_count()).unwrap_or(0)
    }

    /// Returns total number of active rooms.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_room_created_lazily_and_removed_when_empty() {
        let registry = RoomRegistry::new();
        let room = RoomKey::Global;
        let conn = Uuid::new_v4();

        assert_eq!(registry.room_count(), 0);
        registry.join(room, conn);
        assert_eq!(registry.room_count(), 1);
        assert_eq!(registry.member_count(&room), 1);

        registry.leave(room, conn);
        assert_eq!(registry.room_count(), 0);
    }

    #[test]
    fn test_leave_unjoined_room_is_noop() {
        let registry = RoomRegistry::new();
        registry.leave(RoomKey::Global, Uuid::new_v4());
        assert_eq!(registry.room_count(), 0);
    }

    #[test]
    fn test_leave_all_vacates_every_room() {
        let registry = RoomRegistry::new();
        let conn = Uuid::new_v4();
        let other = Uuid::new_v4();
        let property = RoomKey::Property(staffhub_core::types::id::PropertyId::new());

        registry.join(RoomKey::Global, conn);
        registry.join(property, conn);
        registry.join(property, other);

        registry.leave_all(conn);
        assert_eq!(registry.subscription_count(conn), 0);
        assert!(!registry.is_member(&property, conn));
        assert!(registry.is_member(&property, other), "others untouched");
        assert_eq!(registry.room_count(), 1, "global room dropped");
    }
}
