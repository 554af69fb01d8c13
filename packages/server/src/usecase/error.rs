//! UseCase errors

use thiserror::Error;

/// 接続処理のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectError {
    #[error("Connection ID '{0}' is already registered")]
    DuplicateConnectionId(String),
}

/// ルーム参加処理のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JoinRoomError {
    #[error("Connection '{0}' not found")]
    ConnectionNotFound(String),
    #[error("Already in room '{0}'; leave it before joining another")]
    AlreadyInOtherRoom(String),
}

/// ルーム退出処理のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LeaveRoomError {
    #[error("Connection '{0}' not found")]
    ConnectionNotFound(String),
}

/// 切断処理のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DisconnectError {
    #[error("Connection '{0}' not found")]
    ConnectionNotFound(String),
}

/// ルーム詳細取得のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GetRoomDetailError {
    #[error("Room not found")]
    RoomNotFound,
}
