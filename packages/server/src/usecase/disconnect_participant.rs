//! UseCase: 参加者切断処理
//!
//! WebSocket が閉じたときに呼ばれ、接続を台帳から削除します。
//! `user-disconnected` はルームに関係なく、残っている全ての接続に送ります。

use std::sync::Arc;

use rendezvous_shared::protocol::ServerMessage;

use crate::domain::{ConnectionId, MessagePusher, RoomRepository};

use super::{encode, error::DisconnectError};

/// 参加者切断のユースケース
pub struct DisconnectParticipantUseCase {
    /// Repository（データアクセス層の抽象化）
    repository: Arc<dyn RoomRepository>,
    /// MessagePusher（メッセージ通知の抽象化）
    message_pusher: Arc<dyn MessagePusher>,
}

impl DisconnectParticipantUseCase {
    /// 新しい DisconnectParticipantUseCase を作成
    pub fn new(
        repository: Arc<dyn RoomRepository>,
        message_pusher: Arc<dyn MessagePusher>,
    ) -> Self {
        Self {
            repository,
            message_pusher,
        }
    }

    /// 参加者切断を実行
    ///
    /// # Arguments
    ///
    /// * `connection_id` - 切断する接続の ID
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<ConnectionId>)` - `user-disconnected` を送った接続
    /// * `Err(DisconnectError)` - 接続が存在しない（何も変更しない）
    pub async fn execute(
        &self,
        connection_id: &ConnectionId,
    ) -> Result<Vec<ConnectionId>, DisconnectError> {
        // 1. Repository から削除（所属ルームからも外れる）
        let removed = self
            .repository
            .remove_connection(connection_id)
            .await
            .map_err(|_| DisconnectError::ConnectionNotFound(connection_id.as_str().to_string()))?;

        // 2. MessagePusher から登録解除
        self.message_pusher.unregister_client(connection_id).await;

        match &removed.room {
            Some(room_id) => tracing::info!("'{}' disconnected from room '{}'", connection_id, room_id),
            None => tracing::info!("'{}' disconnected", connection_id),
        }

        // 3. 残っている全ての接続に通知
        let targets = self.repository.get_all_connection_ids().await;
        if targets.is_empty() {
            return Ok(targets);
        }

        let message = ServerMessage::UserDisconnected {
            peer_id: connection_id.as_str().to_string(),
        };
        if let Some(json) = encode(&message)
            && let Err(e) = self.message_pusher.broadcast(targets.clone(), &json).await
        {
            tracing::warn!("Failed to broadcast user-disconnected: {}", e);
        }

        Ok(targets)
    }
}
