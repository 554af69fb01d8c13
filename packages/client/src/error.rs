//! Error types for the Rendezvous client.

use thiserror::Error;

/// Connection-level errors
#[derive(Debug, Error)]
pub enum ClientError {
    /// The relay URL cannot be used; retrying will not help
    #[error("Invalid relay URL '{0}'")]
    InvalidUrl(String),

    /// Connection error
    #[error("Connection error: {0}")]
    ConnectionError(String),
}

/// Local media acquisition failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MediaError {
    #[error("Permission to use camera and microphone was denied")]
    PermissionDenied,

    #[error("Media device error: {0}")]
    Device(String),
}

/// Session description or candidate handling failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NegotiationError {
    #[error("Failed to create peer connection: {0}")]
    PeerConnection(String),

    #[error("Failed to create session description: {0}")]
    CreateDescription(String),

    #[error("Failed to apply session description: {0}")]
    ApplyDescription(String),

    #[error("Failed to add ICE candidate: {0}")]
    AddCandidate(String),

    #[error("Malformed signaling payload: {0}")]
    MalformedPayload(String),
}

/// Errors reported back to whoever issued an agent command
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AgentError {
    #[error("Please enter a room ID")]
    EmptyRoomId,

    #[error("A call is already in progress ({0})")]
    CallInProgress(String),

    #[error(transparent)]
    Media(#[from] MediaError),

    #[error(transparent)]
    Negotiation(#[from] NegotiationError),

    #[error("Agent is not running")]
    Stopped,
}
