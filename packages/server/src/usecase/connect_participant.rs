//! UseCase: 参加者接続処理
//!
//! 新しい WebSocket 接続に ID を割り当て、どのルームにも所属しない状態で登録します。
//! 登録直後に `welcome` で割り当てた ID をクライアントに伝えます。

use std::sync::Arc;

use rendezvous_shared::{protocol::ServerMessage, time::Clock};

use crate::domain::{
    Connection, ConnectionId, MessagePusher, PusherChannel, RoomRepository, Timestamp,
};

use super::{encode, error::ConnectError};

/// 参加者接続のユースケース
pub struct ConnectParticipantUseCase {
    /// Repository（データアクセス層の抽象化）
    repository: Arc<dyn RoomRepository>,
    /// MessagePusher（メッセージ通知の抽象化）
    message_pusher: Arc<dyn MessagePusher>,
    clock: Arc<dyn Clock>,
}

impl ConnectParticipantUseCase {
    /// 新しい ConnectParticipantUseCase を作成
    pub fn new(
        repository: Arc<dyn RoomRepository>,
        message_pusher: Arc<dyn MessagePusher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repository,
            message_pusher,
            clock,
        }
    }

    /// 参加者接続を実行
    ///
    /// # Arguments
    ///
    /// * `sender` - クライアントへのメッセージ送信用チャンネル
    ///
    /// # Returns
    ///
    /// * `Ok((ConnectionId, Timestamp))` - 割り当てた ID と接続時刻
    /// * `Err(ConnectError)` - 接続失敗
    pub async fn execute(
        &self,
        sender: PusherChannel,
    ) -> Result<(ConnectionId, Timestamp), ConnectError> {
        self.execute_with_id(ConnectionId::generate(), sender).await
    }

    async fn execute_with_id(
        &self,
        connection_id: ConnectionId,
        sender: PusherChannel,
    ) -> Result<(ConnectionId, Timestamp), ConnectError> {
        let connected_at = Timestamp::new(self.clock.now_millis());

        // 1. Repository に接続を追加
        self.repository
            .add_connection(Connection::new(connection_id.clone(), connected_at))
            .await
            .map_err(|_| ConnectError::DuplicateConnectionId(connection_id.as_str().to_string()))?;

        // 2. MessagePusher にクライアントを登録
        self.message_pusher
            .register_client(connection_id.clone(), sender)
            .await;

        // 3. 割り当てた ID を通知
        let welcome = ServerMessage::Welcome {
            peer_id: connection_id.as_str().to_string(),
        };
        if let Some(json) = encode(&welcome)
            && let Err(e) = self.message_pusher.push_to(&connection_id, &json).await
        {
            tracing::warn!("Failed to send welcome to '{}': {}", connection_id, e);
        }

        Ok((connection_id, connected_at))
    }
}
