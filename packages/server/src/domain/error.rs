//! Domain errors

use thiserror::Error;

/// Value object validation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueObjectError {
    #[error("Room ID must not be empty")]
    EmptyRoomId,

    #[error("Connection ID must not be empty")]
    EmptyConnectionId,
}

/// Room registry errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    #[error("Connection '{0}' is already registered")]
    DuplicateConnection(String),

    #[error("Connection '{0}' not found")]
    ConnectionNotFound(String),
}

/// Outbound message errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessagePushError {
    #[error("Client '{0}' not found")]
    ClientNotFound(String),

    #[error("Failed to push message: {0}")]
    PushFailed(String),
}
