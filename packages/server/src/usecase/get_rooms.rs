//! UseCase: ルーム一覧取得

use std::sync::Arc;

use crate::domain::{Room, RoomRepository};

/// ルーム一覧取得のユースケース
pub struct GetRoomsUseCase {
    repository: Arc<dyn RoomRepository>,
}

impl GetRoomsUseCase {
    pub fn new(repository: Arc<dyn RoomRepository>) -> Self {
        Self { repository }
    }

    /// 存在する全てのルームを ID 順で返す
    pub async fn execute(&self) -> Vec<Room> {
        self.repository.get_rooms().await
    }

    /// 接続数とルーム数
    pub async fn counts(&self) -> (usize, usize) {
        let connections = self.repository.get_all_connection_ids().await.len();
        let rooms = self.repository.get_rooms().await.len();
        (connections, rooms)
    }
}
