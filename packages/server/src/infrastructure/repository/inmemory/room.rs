//! InMemory Room Repository 実装
//!
//! ドメイン層が定義する RoomRepository trait の具体的な実装。
//! 接続とルームの 2 つの HashMap を 1 つの Mutex で保護し、
//! 全ての更新を単一ライターで直列化します。
//!
//! ## 不変条件
//!
//! - 接続の `room` が `Some(r)` ⇔ ルーム `r` の `members` にその接続が含まれる
//! - `rooms` に空のルームは残らない

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{
    Connection, ConnectionId, Departure, JoinOutcome, RepositoryError, Room, RoomId,
    RoomRepository, Timestamp,
};

#[derive(Default)]
struct Registry {
    connections: HashMap<ConnectionId, Connection>,
    rooms: HashMap<RoomId, Room>,
}

impl Registry {
    /// Take `id` out of `room_id`, dropping the room once it is empty.
    fn detach(&mut self, id: &ConnectionId, room_id: &RoomId) -> Departure {
        let remaining = match self.rooms.get_mut(room_id) {
            Some(room) => {
                room.remove_member(id);
                room.members.iter().cloned().collect()
            }
            None => Vec::new(),
        };
        if remaining.is_empty() && self.rooms.remove(room_id).is_some() {
            tracing::debug!("Room '{}' is empty and was reclaimed", room_id);
        }
        Departure {
            room_id: room_id.clone(),
            remaining,
        }
    }
}

/// インメモリ Room Repository 実装
#[derive(Default)]
pub struct InMemoryRoomRepository {
    registry: Mutex<Registry>,
}

impl InMemoryRoomRepository {
    /// 新しい InMemoryRoomRepository を作成
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RoomRepository for InMemoryRoomRepository {
    async fn add_connection(&self, connection: Connection) -> Result<(), RepositoryError> {
        let mut registry = self.registry.lock().await;
        if registry.connections.contains_key(&connection.id) {
            return Err(RepositoryError::DuplicateConnection(
                connection.id.into_string(),
            ));
        }
        registry
            .connections
            .insert(connection.id.clone(), connection);
        Ok(())
    }

    async fn remove_connection(&self, id: &ConnectionId) -> Result<Connection, RepositoryError> {
        let mut registry = self.registry.lock().await;
        let connection = registry
            .connections
            .remove(id)
            .ok_or_else(|| RepositoryError::ConnectionNotFound(id.as_str().to_string()))?;
        if let Some(room_id) = &connection.room {
            registry.detach(id, room_id);
        }
        Ok(connection)
    }

    async fn join_room(
        &self,
        id: &ConnectionId,
        room_id: RoomId,
        now: Timestamp,
    ) -> Result<JoinOutcome, RepositoryError> {
        let mut registry = self.registry.lock().await;
        let current = registry
            .connections
            .get(id)
            .ok_or_else(|| RepositoryError::ConnectionNotFound(id.as_str().to_string()))?
            .room
            .clone();

        match current {
            Some(current) if current == room_id => return Ok(JoinOutcome::AlreadyMember),
            Some(current) => return Ok(JoinOutcome::InOtherRoom(current)),
            None => {}
        }

        let room = registry
            .rooms
            .entry(room_id.clone())
            .or_insert_with(|| Room::new(room_id.clone(), now));
        let others = room.others(id);
        room.add_member(id.clone());

        if let Some(connection) = registry.connections.get_mut(id) {
            connection.room = Some(room_id);
        }

        Ok(JoinOutcome::Joined { others })
    }

    async fn leave_room(
        &self,
        id: &ConnectionId,
        room_id: &RoomId,
    ) -> Result<Option<Departure>, RepositoryError> {
        let mut registry = self.registry.lock().await;
        let connection = registry
            .connections
            .get_mut(id)
            .ok_or_else(|| RepositoryError::ConnectionNotFound(id.as_str().to_string()))?;

        if connection.room.as_ref() != Some(room_id) {
            return Ok(None);
        }
        connection.room = None;

        Ok(Some(registry.detach(id, room_id)))
    }

    async fn is_connected(&self, id: &ConnectionId) -> bool {
        let registry = self.registry.lock().await;
        registry.connections.contains_key(id)
    }

    async fn share_room(&self, a: &ConnectionId, b: &ConnectionId) -> bool {
        let registry = self.registry.lock().await;
        let room_of = |id: &ConnectionId| registry.connections.get(id).and_then(|c| c.room.clone());
        match (room_of(a), room_of(b)) {
            (Some(room_a), Some(room_b)) => room_a == room_b,
            _ => false,
        }
    }

    async fn get_all_connection_ids(&self) -> Vec<ConnectionId> {
        let registry = self.registry.lock().await;
        registry.connections.keys().cloned().collect()
    }

    async fn get_connection(&self, id: &ConnectionId) -> Option<Connection> {
        let registry = self.registry.lock().await;
        registry.connections.get(id).cloned()
    }

    async fn get_rooms(&self) -> Vec<Room> {
        let registry = self.registry.lock().await;
        let mut rooms: Vec<Room> = registry.rooms.values().cloned().collect();
        rooms.sort_by(|a, b| a.id.cmp(&b.id));
        rooms
    }

    async fn get_room(&self, room_id: &RoomId) -> Option<Room> {
        let registry = self.registry.lock().await;
        registry.rooms.get(room_id).cloned()
    }
}
