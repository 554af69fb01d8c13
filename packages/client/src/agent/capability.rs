//! External capabilities the agent depends on.
//!
//! The agent never touches a camera, a peer-connection stack or a socket
//! directly. Each of those sits behind one of these traits so the state
//! machine can be driven by fakes in tests and by webrtc-rs in the binary.

use std::{any::Any, sync::Arc};

use async_trait::async_trait;
use rendezvous_shared::protocol::ClientMessage;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::error::{MediaError, NegotiationError};

use super::negotiation::AgentEvent;

/// Camera and microphone access
#[async_trait]
pub trait MediaDevices: Send + Sync {
    /// Acquire a local stream with audio and video
    async fn get_user_media(&self) -> Result<Arc<dyn MediaStream>, MediaError>;
}

/// A local media stream
pub trait MediaStream: Send + Sync {
    fn id(&self) -> String;

    /// Kinds of the tracks in the stream (`"audio"`, `"video"`)
    fn track_kinds(&self) -> Vec<String>;

    /// Stop every track. Calling it again has no effect.
    fn stop(&self);

    fn is_stopped(&self) -> bool;

    /// Lets a peer-connection adapter reach its own concrete stream type
    fn as_any(&self) -> &dyn Any;
}

/// Connection state reported by a peer connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerConnectionState {
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

/// A track the remote peer sends
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTrack {
    pub id: String,
    pub kind: String,
}

/// Asynchronous notifications from a peer connection
#[derive(Debug, Clone, PartialEq)]
pub enum PeerEvent {
    /// A local ICE candidate was gathered (browser `RTCIceCandidateInit` JSON)
    LocalCandidate(Value),
    RemoteTrack(RemoteTrack),
    ConnectionStateChanged(PeerConnectionState),
}

/// Where a peer connection reports its events.
///
/// Events are tagged with the session they belong to, so events from a
/// connection that has already been replaced are discarded by the agent.
/// The sender is weak: a live peer connection does not keep the agent's
/// queue open after every handle is gone.
#[derive(Debug, Clone)]
pub struct PeerEventSender {
    generation: u64,
    tx: mpsc::WeakUnboundedSender<AgentEvent>,
}

impl PeerEventSender {
    pub(crate) fn new(generation: u64, tx: mpsc::WeakUnboundedSender<AgentEvent>) -> Self {
        Self { generation, tx }
    }

    /// Returns `false` once the agent has stopped
    pub fn send(&self, event: PeerEvent) -> bool {
        let Some(tx) = self.tx.upgrade() else {
            return false;
        };
        tx.send(AgentEvent::Peer {
            generation: self.generation,
            event,
        })
        .is_ok()
    }
}

/// One peer connection. Session descriptions and candidates are browser-style JSON.
#[async_trait]
pub trait PeerConnection: Send + Sync {
    async fn create_offer(&self) -> Result<Value, NegotiationError>;

    async fn create_answer(&self) -> Result<Value, NegotiationError>;

    async fn set_local_description(&self, description: Value) -> Result<(), NegotiationError>;

    async fn set_remote_description(&self, description: Value) -> Result<(), NegotiationError>;

    async fn add_ice_candidate(&self, candidate: Value) -> Result<(), NegotiationError>;

    async fn close(&self);
}

/// Builds peer connections bound to a local stream
#[async_trait]
pub trait PeerConnectionFactory: Send + Sync {
    /// `local` is `None` when answering without local media
    async fn create(
        &self,
        local: Option<Arc<dyn MediaStream>>,
        events: PeerEventSender,
    ) -> Result<Arc<dyn PeerConnection>, NegotiationError>;
}

/// Outbound path to the relay. Best-effort: no acknowledgment.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SignalSink: Send + Sync {
    async fn send(&self, message: ClientMessage);
}

/// SignalSink backed by a channel drained by the WebSocket writer
pub struct ChannelSignalSink {
    tx: mpsc::UnboundedSender<ClientMessage>,
}

impl ChannelSignalSink {
    pub fn new(tx: mpsc::UnboundedSender<ClientMessage>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl SignalSink for ChannelSignalSink {
    async fn send(&self, message: ClientMessage) {
        if self.tx.send(message).is_err() {
            tracing::debug!("Signal channel closed, dropping message");
        }
    }
}
