//! UseCase: シグナル中継処理
//!
//! offer / answer / ice-candidate を宛先の接続にだけ転送します。
//! ペイロードは中身を見ずにそのまま渡し、`from` に送信元の接続 ID を付けます。
//!
//! 宛先が存在しない、または送信元と同じルームにいない場合は黙って破棄します。
//! 送信元にエラーは返しません。

use std::sync::Arc;

use rendezvous_shared::protocol::{ServerMessage, SignalKind};
use serde_json::Value;

use crate::domain::{ConnectionId, MessagePusher, RoomRepository};

use super::encode;

/// 中継の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayOutcome {
    Delivered,
    Dropped,
}

/// シグナル中継のユースケース
pub struct RelaySignalUseCase {
    repository: Arc<dyn RoomRepository>,
    message_pusher: Arc<dyn MessagePusher>,
}

impl RelaySignalUseCase {
    pub fn new(
        repository: Arc<dyn RoomRepository>,
        message_pusher: Arc<dyn MessagePusher>,
    ) -> Self {
        Self {
            repository,
            message_pusher,
        }
    }

    /// シグナルを中継
    ///
    /// # Arguments
    ///
    /// * `from` - 送信元の接続 ID
    /// * `kind` - シグナルの種類
    /// * `to` - クライアントが指定した宛先（未検証）
    /// * `payload` - 転送する中身
    pub async fn execute(
        &self,
        from: &ConnectionId,
        kind: SignalKind,
        to: String,
        payload: Value,
    ) -> RelayOutcome {
        let Ok(target) = ConnectionId::new(to) else {
            tracing::debug!("Dropping {} from '{}': empty target", kind, from);
            return RelayOutcome::Dropped;
        };

        if !self.repository.is_connected(&target).await {
            tracing::debug!("Dropping {} from '{}': '{}' is not connected", kind, from, target);
            return RelayOutcome::Dropped;
        }

        if !self.repository.share_room(from, &target).await {
            tracing::debug!(
                "Dropping {} from '{}': '{}' is not in the same room",
                kind,
                from,
                target
            );
            return RelayOutcome::Dropped;
        }

        let message = ServerMessage::relayed(kind, from.as_str().to_string(), payload);
        let Some(json) = encode(&message) else {
            return RelayOutcome::Dropped;
        };

        match self.message_pusher.push_to(&target, &json).await {
            Ok(()) => {
                tracing::debug!("Relayed {} '{}' -> '{}'", kind, from, target);
                RelayOutcome::Delivered
            }
            Err(e) => {
                tracing::debug!("Dropping {} from '{}': {}", kind, from, e);
                RelayOutcome::Dropped
            }
        }
    }
}
