//! UseCase: ルーム詳細取得
//!
//! ルームとメンバーの接続情報（接続時刻）をまとめて返します。

use std::sync::Arc;

use crate::domain::{Connection, Room, RoomId, RoomRepository};

use super::error::GetRoomDetailError;

/// ルームとそのメンバー
#[derive(Debug, Clone, PartialEq)]
pub struct RoomDetail {
    pub room: Room,
    /// ID 順
    pub members: Vec<Connection>,
}

/// ルーム詳細取得のユースケース
pub struct GetRoomDetailUseCase {
    repository: Arc<dyn RoomRepository>,
}

impl GetRoomDetailUseCase {
    pub fn new(repository: Arc<dyn RoomRepository>) -> Self {
        Self { repository }
    }

    pub async fn execute(&self, room_id: &RoomId) -> Result<RoomDetail, GetRoomDetailError> {
        let room = self
            .repository
            .get_room(room_id)
            .await
            .ok_or(GetRoomDetailError::RoomNotFound)?;

        let mut members = Vec::with_capacity(room.members.len());
        for member in &room.members {
            // 取得の間に切断された接続は飛ばす
            if let Some(connection) = self.repository.get_connection(member).await {
                members.push(connection);
            }
        }

        Ok(RoomDetail { room, members })
    }
}
