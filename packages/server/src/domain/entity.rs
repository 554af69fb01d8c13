//! Entities

use std::collections::BTreeSet;

use serde::Serialize;

use super::{ConnectionId, RoomId, Timestamp};

/// A live channel between one participant and the relay.
///
/// Exists only while the underlying WebSocket is open.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Connection {
    pub id: ConnectionId,
    /// Room the connection is currently in, if any (at most one)
    pub room: Option<RoomId>,
    pub connected_at: Timestamp,
}

impl Connection {
    pub fn new(id: ConnectionId, connected_at: Timestamp) -> Self {
        Self {
            id,
            room: None,
            connected_at,
        }
    }
}

/// A named group of connections.
///
/// Created implicitly by the first join and dropped by the registry as soon as
/// its member set becomes empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Room {
    pub id: RoomId,
    pub members: BTreeSet<ConnectionId>,
    pub created_at: Timestamp,
}

impl Room {
    pub fn new(id: RoomId, created_at: Timestamp) -> Self {
        Self {
            id,
            members: BTreeSet::new(),
            created_at,
        }
    }

    /// Add a member. Returns `false` if it was already present.
    pub fn add_member(&mut self, id: ConnectionId) -> bool {
        self.members.insert(id)
    }

    /// Remove a member. Returns `false` if it was not present.
    pub fn remove_member(&mut self, id: &ConnectionId) -> bool {
        self.members.remove(id)
    }

    pub fn contains(&self, id: &ConnectionId) -> bool {
        self.members.contains(id)
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Every member except `id`
    pub fn others(&self, id: &ConnectionId) -> Vec<ConnectionId> {
        self.members.iter().filter(|m| *m != id).cloned().collect()
    }
}

/// A connection leaving a room, and who is still in it.
#[derive(Debug, Clone, PartialEq)]
pub struct Departure {
    pub room_id: RoomId,
    /// Members left behind. Empty means the room was reclaimed.
    pub remaining: Vec<ConnectionId>,
}

/// Result of a join in the registry.
#[derive(Debug, Clone, PartialEq)]
pub enum JoinOutcome {
    /// The connection was already a member of this room; nothing changed.
    AlreadyMember,
    /// The connection is still in another room; nothing changed.
    InOtherRoom(RoomId),
    /// Members present before the join
    Joined { others: Vec<ConnectionId> },
}
