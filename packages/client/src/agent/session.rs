//! The local view of one call.

use std::sync::Arc;

use super::capability::{MediaStream, PeerConnection, RemoteTrack};

/// One negotiation with one remote peer.
///
/// Created when a call starts or an offer arrives, dropped when the call ends.
pub struct PeerSession {
    /// Tags peer events that belong to this session
    pub generation: u64,
    pub room_id: Option<String>,
    pub local_stream: Option<Arc<dyn MediaStream>>,
    pub remote_peer: Option<String>,
    pub peer_connection: Option<Arc<dyn PeerConnection>>,
    /// Accumulated as the remote tracks arrive
    pub remote_tracks: Vec<RemoteTrack>,
}

impl PeerSession {
    pub fn new(generation: u64) -> Self {
        Self {
            generation,
            room_id: None,
            local_stream: None,
            remote_peer: None,
            peer_connection: None,
            remote_tracks: Vec::new(),
        }
    }

    /// Close the current peer connection, keeping media and room
    pub async fn reset_peer(&mut self) {
        if let Some(pc) = self.peer_connection.take() {
            pc.close().await;
        }
        self.remote_peer = None;
        self.remote_tracks.clear();
    }

    /// Release everything the session holds
    pub async fn teardown(mut self) {
        self.reset_peer().await;
        if let Some(stream) = self.local_stream.take() {
            stream.stop();
        }
    }
}
