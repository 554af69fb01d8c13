//! Repository trait 定義
//!
//! ドメイン層が必要とするルーム台帳（接続とルーム所属）のインターフェースを定義します。
//! 具体的な実装は Infrastructure 層が提供します（依存性の逆転）。
//!
//! 各メソッドは 1 回の呼び出しで完結する操作として実装しなければなりません。
//! join と disconnect が競合しても所属情報が失われないよう、実装側で排他制御を行います。

use async_trait::async_trait;

use super::{Connection, ConnectionId, Departure, JoinOutcome, RepositoryError, Room, RoomId, Timestamp};

/// Room Repository trait
///
/// UseCase 層はこの trait に依存し、Infrastructure 層の具体的な実装には依存しない。
#[async_trait]
pub trait RoomRepository: Send + Sync {
    /// 接続を登録（どのルームにも所属しない状態）
    async fn add_connection(&self, connection: Connection) -> Result<(), RepositoryError>;

    /// 接続を削除し、所属していたルームからも外す
    ///
    /// ルームが空になった場合はルームも削除する。削除した接続を返す。
    async fn remove_connection(&self, id: &ConnectionId) -> Result<Connection, RepositoryError>;

    /// 接続をルームに参加させる
    ///
    /// ルームが存在しなければ `now` を作成時刻として作成する。
    /// 別のルームに所属していた場合はそちらから移動する。
    async fn join_room(
        &self,
        id: &ConnectionId,
        room_id: RoomId,
        now: Timestamp,
    ) -> Result<JoinOutcome, RepositoryError>;

    /// 接続をルームから外す
    ///
    /// そのルームに所属していなければ `Ok(None)`。
    async fn leave_room(
        &self,
        id: &ConnectionId,
        room_id: &RoomId,
    ) -> Result<Option<Departure>, RepositoryError>;

    /// 接続が存在するか
    async fn is_connected(&self, id: &ConnectionId) -> bool;

    /// 2 つの接続が同じルームに所属しているか
    async fn share_room(&self, a: &ConnectionId, b: &ConnectionId) -> bool;

    /// 接続中の全ての接続 ID を取得
    async fn get_all_connection_ids(&self) -> Vec<ConnectionId>;

    /// 接続を取得
    async fn get_connection(&self, id: &ConnectionId) -> Option<Connection>;

    /// 存在する全てのルームを取得
    async fn get_rooms(&self) -> Vec<Room>;

    /// ルームを取得
    async fn get_room(&self, room_id: &RoomId) -> Option<Room>;
}
