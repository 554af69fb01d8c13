//! UseCase layer
//!
//! ルーム台帳（RoomRepository）と送信手段（MessagePusher）を組み合わせて、
//! リレーの各操作を実装します。

mod connect_participant;
mod disconnect_participant;
mod error;
mod get_room_detail;
mod get_rooms;
mod join_room;
mod leave_room;
mod relay_signal;

pub use connect_participant::ConnectParticipantUseCase;
pub use disconnect_participant::DisconnectParticipantUseCase;
pub use error::{ConnectError, DisconnectError, GetRoomDetailError, JoinRoomError, LeaveRoomError};
pub use get_room_detail::{GetRoomDetailUseCase, RoomDetail};
pub use get_rooms::GetRoomsUseCase;
pub use join_room::JoinRoomUseCase;
pub use leave_room::LeaveRoomUseCase;
pub use relay_signal::{RelayOutcome, RelaySignalUseCase};

use rendezvous_shared::protocol::ServerMessage;

/// ServerMessage を JSON 文字列に変換
///
/// 変換に失敗した場合はログを出して `None` を返す（送信は行わない）。
pub(crate) fn encode(message: &ServerMessage) -> Option<String> {
    match serde_json::to_string(message) {
        Ok(json) => Some(json),
        Err(e) => {
            tracing::error!("Failed to serialize {:?}: {}", message, e);
            None
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use rendezvous_shared::protocol::ServerMessage;
    use tokio::sync::mpsc;

    use crate::{
        domain::{Connection, ConnectionId, MessagePusher, RoomId, RoomRepository, Timestamp},
        infrastructure::{message_pusher::WebSocketMessagePusher, repository::InMemoryRoomRepository},
    };

    pub fn id(value: &str) -> ConnectionId {
        ConnectionId::new(value.to_string()).unwrap()
    }

    pub fn room(value: &str) -> RoomId {
        RoomId::new(value.to_string()).unwrap()
    }

    /// 登録済みクライアントの受信側
    pub struct Inbox(mpsc::UnboundedReceiver<String>);

    impl Inbox {
        /// 届いているメッセージを全て取り出す
        pub fn drain(&mut self) -> Vec<ServerMessage> {
            let mut messages = Vec::new();
            while let Ok(json) = self.0.try_recv() {
                messages.push(serde_json::from_str(&json).unwrap());
            }
            messages
        }
    }

    pub fn create_test_repository() -> Arc<InMemoryRoomRepository> {
        Arc::new(InMemoryRoomRepository::new())
    }

    pub fn create_test_message_pusher() -> Arc<WebSocketMessagePusher> {
        Arc::new(WebSocketMessagePusher::new())
    }

    /// 接続を台帳と MessagePusher の両方に登録する
    pub async fn connect(
        repository: &InMemoryRoomRepository,
        message_pusher: &WebSocketMessagePusher,
        value: &str,
    ) -> Inbox {
        let (tx, rx) = mpsc::unbounded_channel();
        repository
            .add_connection(Connection::new(id(value), Timestamp::new(1000)))
            .await
            .unwrap();
        message_pusher.register_client(id(value), tx).await;
        Inbox(rx)
    }

    pub async fn join(repository: &InMemoryRoomRepository, value: &str, room_id: &str) {
        repository
            .join_room(&id(value), room(room_id), Timestamp::new(1000))
            .await
            .unwrap();
    }
}
