//! UseCase: ルーム退出処理
//!
//! 接続は維持したままルームから外し、残ったメンバーに `user-disconnected` を送ります。
//! クライアントが通話を終えたとき（`leave-room`）に使われます。

use std::sync::Arc;

use crate::domain::{ConnectionId, MessagePusher, RoomId, RoomRepository};

use super::{error::LeaveRoomError, join_room::notify_departure};

/// ルーム退出のユースケース
pub struct LeaveRoomUseCase {
    repository: Arc<dyn RoomRepository>,
    message_pusher: Arc<dyn MessagePusher>,
}

impl LeaveRoomUseCase {
    pub fn new(
        repository: Arc<dyn RoomRepository>,
        message_pusher: Arc<dyn MessagePusher>,
    ) -> Self {
        Self {
            repository,
            message_pusher,
        }
    }

    /// ルーム退出を実行
    ///
    /// 指定ルームに所属していなければ何もしない。
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<ConnectionId>)` - `user-disconnected` を送ったメンバー
    pub async fn execute(
        &self,
        connection_id: &ConnectionId,
        room_id: &RoomId,
    ) -> Result<Vec<ConnectionId>, LeaveRoomError> {
        let departure = self
            .repository
            .leave_room(connection_id, room_id)
            .await
            .map_err(|_| LeaveRoomError::ConnectionNotFound(connection_id.as_str().to_string()))?;

        let Some(departure) = departure else {
            tracing::debug!("'{}' is not in room '{}', ignoring leave", connection_id, room_id);
            return Ok(Vec::new());
        };

        let notified = departure.remaining.clone();
        notify_departure(self.message_pusher.as_ref(), connection_id, departure).await;
        Ok(notified)
    }
}
