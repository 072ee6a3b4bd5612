//! Connection registry for room subscriptions.
//!
//! Tracks which live connections receive a room's broadcasts. The mapping is
//! kept in both directions: room → connections (for broadcast) and
//! connection → rooms (for cleanup on disconnect).
//!
//! Subscriptions are independent of roster membership. A player who rejoins
//! under the same name from a new connection leaves the old connection
//! subscribed until it leaves, is kicked, or disconnects.
//!
//! Both directions use ordered sets so broadcast fan-out is deterministic.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use unveil_proto::{ConnectionId, RoomId};

/// Registry for tracking connections and room subscriptions.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    /// Connection ID → rooms it is subscribed to
    connections: BTreeMap<ConnectionId, BTreeSet<RoomId>>,
    /// Room ID → subscribed connection IDs
    room_subscriptions: HashMap<RoomId, BTreeSet<ConnectionId>>,
}

impl ConnectionRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new connection.
    ///
    /// Returns `false` if the connection is already registered.
    pub fn register(&mut self, connection_id: ConnectionId) -> bool {
        if self.connections.contains_key(&connection_id) {
            return false;
        }

        self.connections.insert(connection_id, BTreeSet::new());
        true
    }

    /// Unregister a connection and drop all its subscriptions.
    ///
    /// Returns the rooms it was subscribed to, or `None` if it was unknown.
    pub fn unregister(&mut self, connection_id: ConnectionId) -> Option<BTreeSet<RoomId>> {
        let rooms = self.connections.remove(&connection_id)?;

        for room_id in &rooms {
            self.drop_subscriber(room_id, connection_id);
        }

        Some(rooms)
    }

    /// Check if a connection is registered.
    pub fn is_registered(&self, connection_id: ConnectionId) -> bool {
        self.connections.contains_key(&connection_id)
    }

    /// Subscribe a connection to a room.
    ///
    /// Returns `false` if the connection is not registered.
    pub fn subscribe(&mut self, connection_id: ConnectionId, room_id: &str) -> bool {
        let Some(rooms) = self.connections.get_mut(&connection_id) else {
            return false;
        };

        rooms.insert(room_id.to_string());
        self.room_subscriptions.entry(room_id.to_string()).or_default().insert(connection_id);
        true
    }

    /// Unsubscribe a connection from a room.
    ///
    /// Returns `true` if the connection was subscribed.
    pub fn unsubscribe(&mut self, connection_id: ConnectionId, room_id: &str) -> bool {
        let removed =
            self.connections.get_mut(&connection_id).is_some_and(|rooms| rooms.remove(room_id));

        if removed {
            self.drop_subscriber(room_id, connection_id);
        }
        removed
    }

    /// Unsubscribe every connection from a room.
    ///
    /// Returns the connections that were subscribed.
    pub fn close_room(&mut self, room_id: &str) -> Vec<ConnectionId> {
        let subscribers = self.room_subscriptions.remove(room_id).unwrap_or_default();

        for connection_id in &subscribers {
            if let Some(rooms) = self.connections.get_mut(connection_id) {
                rooms.remove(room_id);
            }
        }

        subscribers.into_iter().collect()
    }

    /// Check if a connection is subscribed to a room.
    pub fn is_subscribed(&self, connection_id: ConnectionId, room_id: &str) -> bool {
        self.room_subscriptions.get(room_id).is_some_and(|s| s.contains(&connection_id))
    }

    /// All connections subscribed to a room, in ascending id order.
    pub fn connections_in_room(&self, room_id: &str) -> impl Iterator<Item = ConnectionId> + '_ {
        self.room_subscriptions.get(room_id).into_iter().flat_map(|s| s.iter().copied())
    }

    /// Total number of registered connections.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    fn drop_subscriber(&mut self, room_id: &str, connection_id: ConnectionId) {
        if let Some(subscribers) = self.room_subscriptions.get_mut(room_id) {
            subscribers.remove(&connection_id);
            if subscribers.is_empty() {
                self.room_subscriptions.remove(room_id);
            }
        }
    }
}
