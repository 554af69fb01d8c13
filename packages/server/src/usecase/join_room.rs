//! UseCase: ルーム参加処理
//!
//! 接続をルームに参加させ、既にいるメンバーにだけ `user-connected` を送ります。
//! 同じルームへの重複参加は何もせず、通知も行いません。
//! 別のルームに所属したままの参加は拒否し、元のルームには手を触れません。

use std::sync::Arc;

use rendezvous_shared::{protocol::ServerMessage, time::Clock};

use crate::domain::{
    ConnectionId, Departure, JoinOutcome, MessagePusher, RoomId, RoomRepository, Timestamp,
};

use super::{encode, error::JoinRoomError};

/// ルーム参加のユースケース
pub struct JoinRoomUseCase {
    repository: Arc<dyn RoomRepository>,
    message_pusher: Arc<dyn MessagePusher>,
    clock: Arc<dyn Clock>,
}

impl JoinRoomUseCase {
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

    /// ルーム参加を実行
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<ConnectionId>)` - `user-connected` を送ったメンバー
    /// * `Err(JoinRoomError)` - 接続が存在しない、または別のルームに所属している
    pub async fn execute(
        &self,
        connection_id: &ConnectionId,
        room_id: RoomId,
    ) -> Result<Vec<ConnectionId>, JoinRoomError> {
        let now = Timestamp::new(self.clock.now_millis());
        let outcome = self
            .repository
            .join_room(connection_id, room_id.clone(), now)
            .await
            .map_err(|_| JoinRoomError::ConnectionNotFound(connection_id.as_str().to_string()))?;

        let others = match outcome {
            JoinOutcome::AlreadyMember => {
                tracing::debug!("'{}' is already in room '{}'", connection_id, room_id);
                return Ok(Vec::new());
            }
            JoinOutcome::InOtherRoom(current) => {
                tracing::debug!(
                    "'{}' asked to join '{}' while in '{}'",
                    connection_id,
                    room_id,
                    current
                );
                return Err(JoinRoomError::AlreadyInOtherRoom(current.into_string()));
            }
            JoinOutcome::Joined { others } => others,
        };

        tracing::info!("'{}' joined room '{}'", connection_id, room_id);

        let connected = ServerMessage::UserConnected {
            peer_id: connection_id.as_str().to_string(),
        };
        if !others.is_empty()
            && let Some(json) = encode(&connected)
            && let Err(e) = self.message_pusher.broadcast(others.clone(), &json).await
        {
            tracing::warn!("Failed to broadcast user-connected: {}", e);
        }

        Ok(others)
    }
}

/// ルームに残ったメンバーへ `user-disconnected` を送る
pub(super) async fn notify_departure(
    message_pusher: &dyn MessagePusher,
    connection_id: &ConnectionId,
    departure: Departure,
) {
    tracing::info!("'{}' left room '{}'", connection_id, departure.room_id);
    if departure.remaining.is_empty() {
        return;
    }
    let left = ServerMessage::UserDisconnected {
        peer_id: connection_id.as_str().to_string(),
    };
    if let Some(json) = encode(&left)
        && let Err(e) = message_pusher.broadcast(departure.remaining, &json).await
    {
        tracing::warn!("Failed to broadcast user-disconnected: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::MockMessagePusher,
        usecase::test_support::{
            connect, create_test_message_pusher, create_test_repository, id, join, room,
        },
    };
    use rendezvous_shared::time::FixedClock;

    #[tokio::test]
    async fn test_second_member_triggers_one_notification() {
        // テスト項目: 2 人目の参加で 1 人目にだけ user-connected が 1 通届く
        // given (前提条件):
        let repository = create_test_repository();
        let pusher = create_test_message_pusher();
        let mut inbox_a = connect(&repository, &pusher, "a").await;
        let mut inbox_b = connect(&repository, &pusher, "b").await;
        let usecase =
            JoinRoomUseCase::new(repository.clone(), pusher.clone(), Arc::new(FixedClock::new(0)));
        usecase.execute(&id("a"), room("alpha")).await.unwrap();

        // when (操作):
        let notified = usecase.execute(&id("b"), room("alpha")).await.unwrap();

        // then (期待する結果):
        assert_eq!(notified, vec![id("a")]);
        assert_eq!(
            inbox_a.drain(),
            vec![ServerMessage::UserConnected {
                peer_id: "b".to_string()
            }]
        );
        assert!(inbox_b.drain().is_empty());
    }

    #[tokio::test]
    async fn test_first_member_notifies_nobody() {
        // テスト項目: 最初の参加者は誰にも通知しない
        // given (前提条件):
        let repository = create_test_repository();
        let mut message_pusher = MockMessagePusher::new();
        message_pusher.expect_broadcast().never();
        let usecase = JoinRoomUseCase::new(
            repository.clone(),
            Arc::new(message_pusher),
            Arc::new(FixedClock::new(0)),
        );
        let pusher = create_test_message_pusher();
        let _inbox = connect(&repository, &pusher, "a").await;

        // when (操作):
        let notified = usecase.execute(&id("a"), room("alpha")).await.unwrap();

        // then (期待する結果):
        assert!(notified.is_empty());
    }

    #[tokio::test]
    async fn test_other_rooms_are_not_notified() {
        // テスト項目: 別のルームのメンバーには通知されない
        // given (前提条件):
        let repository = create_test_repository();
        let pusher = create_test_message_pusher();
        let mut inbox_a = connect(&repository, &pusher, "a").await;
        let _inbox_b = connect(&repository, &pusher, "b").await;
        join(&repository, "a", "alpha").await;
        let usecase =
            JoinRoomUseCase::new(repository.clone(), pusher.clone(), Arc::new(FixedClock::new(0)));

        // when (操作):
        let notified = usecase.execute(&id("b"), room("beta")).await.unwrap();

        // then (期待する結果):
        assert!(notified.is_empty());
        assert!(inbox_a.drain().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_join_sends_nothing() {
        // テスト項目: 同じルームへの重複参加では通知が再送されない
        // given (前提条件):
        let repository = create_test_repository();
        let pusher = create_test_message_pusher();
        let mut inbox_a = connect(&repository, &pusher, "a").await;
        let _inbox_b = connect(&repository, &pusher, "b").await;
        let usecase =
            JoinRoomUseCase::new(repository.clone(), pusher.clone(), Arc::new(FixedClock::new(0)));
        usecase.execute(&id("a"), room("alpha")).await.unwrap();
        usecase.execute(&id("b"), room("alpha")).await.unwrap();
        inbox_a.drain();

        // when (操作):
        let notified = usecase.execute(&id("b"), room("alpha")).await.unwrap();

        // then (期待する結果):
        assert!(notified.is_empty());
        assert!(inbox_a.drain().is_empty());
        assert_eq!(
            repository.get_room(&room("alpha")).await.unwrap().members.len(),
            2
        );
    }

    #[tokio::test]
    async fn test_join_while_in_other_room_is_rejected() {
        // テスト項目: 別ルームに所属したままの参加は拒否され、元のルームのメンバーには何も届かない
        // given (前提条件):
        let repository = create_test_repository();
        let pusher = create_test_message_pusher();
        let mut inbox_a = connect(&repository, &pusher, "a").await;
        let mut inbox_b = connect(&repository, &pusher, "b").await;
        join(&repository, "b", "alpha").await;
        join(&repository, "a", "alpha").await;
        let usecase =
            JoinRoomUseCase::new(repository.clone(), pusher.clone(), Arc::new(FixedClock::new(0)));

        // when (操作):
        let result = usecase.execute(&id("a"), room("beta")).await;

        // then (期待する結果):
        assert_eq!(
            result,
            Err(JoinRoomError::AlreadyInOtherRoom("alpha".to_string()))
        );
        let alpha = repository.get_room(&room("alpha")).await.unwrap();
        assert!(alpha.contains(&id("a")));
        assert!(alpha.contains(&id("b")));
        assert!(repository.get_room(&room("beta")).await.is_none());
        assert!(inbox_a.drain().is_empty());
        assert!(inbox_b.drain().is_empty());
    }

    #[tokio::test]
    async fn test_join_unknown_connection() {
        // テスト項目: 存在しない接続の参加はエラーになる
        // given (前提条件):
        let usecase = JoinRoomUseCase::new(
            create_test_repository(),
            create_test_message_pusher(),
            Arc::new(FixedClock::new(0)),
        );

        // when (操作):
        let result = usecase.execute(&id("ghost"), room("alpha")).await;

        // then (期待する結果):
        assert_eq!(
            result,
            Err(JoinRoomError::ConnectionNotFound("ghost".to_string()))
        );
        assert!(usecase.repository.get_rooms().await.is_empty());
    }
}
