//! Peer connections backed by webrtc-rs.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use webrtc::{
    api::{
        API, APIBuilder, interceptor_registry::register_default_interceptors,
        media_engine::MediaEngine,
    },
    ice_transport::{
        ice_candidate::{RTCIceCandidate, RTCIceCandidateInit},
        ice_server::RTCIceServer,
    },
    interceptor::registry::Registry,
    peer_connection::{
        RTCPeerConnection, configuration::RTCConfiguration,
        peer_connection_state::RTCPeerConnectionState,
        sdp::session_description::RTCSessionDescription,
    },
    rtp_transceiver::{
        RTCRtpTransceiverInit, rtp_codec::RTPCodecType,
        rtp_transceiver_direction::RTCRtpTransceiverDirection,
    },
    track::track_local::TrackLocal,
};

use crate::{
    agent::{
        MediaStream, PeerConnection, PeerConnectionFactory, PeerConnectionState, PeerEvent,
        PeerEventSender, RemoteTrack,
    },
    error::NegotiationError,
};

use super::media::SyntheticStream;

pub const DEFAULT_STUN_SERVER: &str = "stun:stun.l.google.com:19302";

impl From<RTCPeerConnectionState> for PeerConnectionState {
    fn from(state: RTCPeerConnectionState) -> Self {
        match state {
            RTCPeerConnectionState::Connecting => PeerConnectionState::Connecting,
            RTCPeerConnectionState::Connected => PeerConnectionState::Connected,
            RTCPeerConnectionState::Disconnected => PeerConnectionState::Disconnected,
            RTCPeerConnectionState::Failed => PeerConnectionState::Failed,
            RTCPeerConnectionState::Closed => PeerConnectionState::Closed,
            _ => PeerConnectionState::New,
        }
    }
}

/// Builds webrtc-rs peer connections with the given ICE servers
#[derive(Debug, Clone)]
pub struct WebRtcPeerConnectionFactory {
    ice_servers: Vec<String>,
}

impl WebRtcPeerConnectionFactory {
    /// An empty list means host candidates only
    pub fn new(ice_servers: Vec<String>) -> Self {
        Self { ice_servers }
    }

    fn configuration(&self) -> RTCConfiguration {
        let ice_servers = if self.ice_servers.is_empty() {
            Vec::new()
        } else {
            vec![RTCIceServer {
                urls: self.ice_servers.clone(),
                ..Default::default()
            }]
        };
        RTCConfiguration {
            ice_servers,
            ..Default::default()
        }
    }
}

impl Default for WebRtcPeerConnectionFactory {
    fn default() -> Self {
        Self::new(vec![DEFAULT_STUN_SERVER.to_string()])
    }
}

fn build_api() -> Result<API, webrtc::Error> {
    let mut media_engine = MediaEngine::default();
    media_engine.register_default_codecs()?;

    let mut registry = Registry::new();
    registry = register_default_interceptors(registry, &mut media_engine)?;

    Ok(APIBuilder::new()
        .with_media_engine(media_engine)
        .with_interceptor_registry(registry)
        .build())
}

fn peer_error(e: webrtc::Error) -> NegotiationError {
    NegotiationError::PeerConnection(e.to_string())
}

#[async_trait]
impl PeerConnectionFactory for WebRtcPeerConnectionFactory {
    async fn create(
        &self,
        local: Option<Arc<dyn MediaStream>>,
        events: PeerEventSender,
    ) -> Result<Arc<dyn PeerConnection>, NegotiationError> {
        let api = build_api().map_err(peer_error)?;
        let pc = Arc::new(
            api.new_peer_connection(self.configuration())
                .await
                .map_err(peer_error)?,
        );
        forward_events(&pc, events);

        // Without local media the remote offer decides the transceivers
        if let Some(stream) = local {
            let tracks = stream
                .as_any()
                .downcast_ref::<SyntheticStream>()
                .map(SyntheticStream::tracks);
            match tracks {
                Some(tracks) => {
                    for track in tracks {
                        let sender = pc
                            .add_track(track as Arc<dyn TrackLocal + Send + Sync>)
                            .await
                            .map_err(peer_error)?;
                        // RTCP has to be read for the interceptors to run
                        tokio::spawn(async move {
                            let mut buf = vec![0u8; 1500];
                            while sender.read(&mut buf).await.is_ok() {}
                        });
                    }
                }
                None => {
                    tracing::warn!(
                        "Stream {} has no webrtc tracks, negotiating receive-only",
                        stream.id()
                    );
                    for kind in [RTPCodecType::Audio, RTPCodecType::Video] {
                        pc.add_transceiver_from_kind(
                            kind,
                            Some(RTCRtpTransceiverInit {
                                direction: RTCRtpTransceiverDirection::Recvonly,
                                send_encodings: vec![],
                            }),
                        )
                        .await
                        .map_err(peer_error)?;
                    }
                }
            }
        }

        Ok(Arc::new(WebRtcPeerConnection { inner: pc }))
    }
}

/// Report candidates, remote tracks and state changes to the agent
fn forward_events(pc: &RTCPeerConnection, events: PeerEventSender) {
    let candidate_events = events.clone();
    pc.on_ice_candidate(Box::new(move |candidate: Option<RTCIceCandidate>| {
        let events = candidate_events.clone();
        Box::pin(async move {
            // None marks the end of gathering
            let Some(candidate) = candidate else {
                return;
            };
            let json = candidate
                .to_json()
                .map_err(|e| e.to_string())
                .and_then(|init| serde_json::to_value(init).map_err(|e| e.to_string()));
            match json {
                Ok(json) => {
                    events.send(PeerEvent::LocalCandidate(json));
                }
                Err(e) => tracing::warn!("Failed to serialize local ICE candidate: {}", e),
            }
        })
    }));

    let state_events = events.clone();
    pc.on_peer_connection_state_change(Box::new(move |state: RTCPeerConnectionState| {
        let events = state_events.clone();
        tracing::debug!("webrtc peer connection state: {}", state);
        Box::pin(async move {
            if state != RTCPeerConnectionState::Unspecified {
                events.send(PeerEvent::ConnectionStateChanged(state.into()));
            }
        })
    }));

    pc.on_track(Box::new(move |track, _receiver, _transceiver| {
        let events = events.clone();
        Box::pin(async move {
            let remote = RemoteTrack {
                id: track.id(),
                kind: track.kind().to_string(),
            };
            tracing::debug!(
                "Remote {} track {} ({})",
                remote.kind,
                remote.id,
                track.codec().capability.mime_type
            );
            events.send(PeerEvent::RemoteTrack(remote));
            // Nothing is rendered, but packets still have to be consumed
            tokio::spawn(async move { while track.read_rtp().await.is_ok() {} });
        })
    }));
}

/// An `RTCPeerConnection` speaking browser-style JSON descriptions and candidates
pub struct WebRtcPeerConnection {
    inner: Arc<RTCPeerConnection>,
}

fn description_to_json(description: RTCSessionDescription) -> Result<Value, NegotiationError> {
    serde_json::to_value(description).map_err(|e| NegotiationError::CreateDescription(e.to_string()))
}

fn description_from_json(description: Value) -> Result<RTCSessionDescription, NegotiationError> {
    serde_json::from_value(description).map_err(|e| NegotiationError::MalformedPayload(e.to_string()))
}

#[async_trait]
impl PeerConnection for WebRtcPeerConnection {
    async fn create_offer(&self) -> Result<Value, NegotiationError> {
        let offer = self
            .inner
            .create_offer(None)
            .await
            .map_err(|e| NegotiationError::CreateDescription(e.to_string()))?;
        description_to_json(offer)
    }

    async fn create_answer(&self) -> Result<Value, NegotiationError> {
        let answer = self
            .inner
            .create_answer(None)
            .await
            .map_err(|e| NegotiationError::CreateDescription(e.to_string()))?;
        description_to_json(answer)
    }

    async fn set_local_description(&self, description: Value) -> Result<(), NegotiationError> {
        let description = description_from_json(description)?;
        self.inner
            .set_local_description(description)
            .await
            .map_err(|e| NegotiationError::ApplyDescription(e.to_string()))
    }

    async fn set_remote_description(&self, description: Value) -> Result<(), NegotiationError> {
        let description = description_from_json(description)?;
        self.inner
            .set_remote_description(description)
            .await
            .map_err(|e| NegotiationError::ApplyDescription(e.to_string()))
    }

    async fn add_ice_candidate(&self, candidate: Value) -> Result<(), NegotiationError> {
        let candidate: RTCIceCandidateInit = serde_json::from_value(candidate)
            .map_err(|e| NegotiationError::MalformedPayload(e.to_string()))?;
        self.inner
            .add_ice_candidate(candidate)
            .await
            .map_err(|e| NegotiationError::AddCandidate(e.to_string()))
    }

    async fn close(&self) {
        if let Err(e) = self.inner.close().await {
            tracing::warn!("Error closing peer connection: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentEvent;
    use serde_json::json;
    use tokio::sync::mpsc;

    async fn create(
        local: Option<Arc<dyn MediaStream>>,
    ) -> (
        Arc<dyn PeerConnection>,
        (mpsc::UnboundedSender<AgentEvent>, mpsc::UnboundedReceiver<AgentEvent>),
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        let factory = WebRtcPeerConnectionFactory::new(Vec::new());
        let pc = factory
            .create(local, PeerEventSender::new(1, tx.downgrade()))
            .await
            .unwrap();
        (pc, (tx, rx))
    }

    #[test]
    fn test_state_conversion() {
        // テスト項目: webrtc の接続状態がエージェントの接続状態に変換される
        // given (前提条件):
        let states = [
            RTCPeerConnectionState::New,
            RTCPeerConnectionState::Connected,
            RTCPeerConnectionState::Disconnected,
            RTCPeerConnectionState::Failed,
        ];

        // when (操作):
        let converted: Vec<PeerConnectionState> = states.into_iter().map(Into::into).collect();

        // then (期待する結果):
        assert_eq!(
            converted,
            vec![
                PeerConnectionState::New,
                PeerConnectionState::Connected,
                PeerConnectionState::Disconnected,
                PeerConnectionState::Failed,
            ]
        );
    }

    #[test]
    fn test_default_factory_uses_public_stun() {
        // テスト項目: 既定のファクトリは公開 STUN サーバーを使う
        // given (前提条件):
        let factory = WebRtcPeerConnectionFactory::default();

        // when (操作):
        let config = factory.configuration();

        // then (期待する結果):
        assert_eq!(config.ice_servers.len(), 1);
        assert_eq!(config.ice_servers[0].urls, vec![DEFAULT_STUN_SERVER]);
    }

    #[tokio::test]
    async fn test_offer_carries_local_tracks() {
        // テスト項目: ローカルストリーム付きの offer には音声と映像のメディア記述が含まれる
        // given (前提条件):
        let (pc, _events) = create(Some(Arc::new(SyntheticStream::new()))).await;

        // when (操作):
        let offer = pc.create_offer().await.unwrap();

        // then (期待する結果):
        assert_eq!(offer["type"], "offer");
        let sdp = offer["sdp"].as_str().unwrap();
        assert!(sdp.contains("m=audio"));
        assert!(sdp.contains("m=video"));
        pc.close().await;
    }

    #[tokio::test]
    async fn test_offer_answer_exchange() {
        // テスト項目: 2 つの接続間で offer と answer を交換できる
        // given (前提条件):
        let (caller, _caller_events) = create(Some(Arc::new(SyntheticStream::new()))).await;
        let (callee, _callee_events) = create(None).await;

        // when (操作):
        let offer = caller.create_offer().await.unwrap();
        caller.set_local_description(offer.clone()).await.unwrap();
        callee.set_remote_description(offer).await.unwrap();
        let answer = callee.create_answer().await.unwrap();
        callee.set_local_description(answer.clone()).await.unwrap();
        let result = caller.set_remote_description(answer.clone()).await;

        // then (期待する結果):
        assert_eq!(result, Ok(()));
        assert_eq!(answer["type"], "answer");
        caller.close().await;
        callee.close().await;
    }

    #[tokio::test]
    async fn test_malformed_description_is_rejected() {
        // テスト項目: 形式が不正なセッション記述はエラーになる
        // given (前提条件):
        let (pc, _events) = create(None).await;

        // when (操作):
        let result = pc.set_remote_description(json!({"sdp": 42})).await;

        // then (期待する結果):
        assert!(matches!(result, Err(NegotiationError::MalformedPayload(_))));
        pc.close().await;
    }

    #[tokio::test]
    async fn test_malformed_candidate_is_rejected() {
        // テスト項目: 形式が不正な ICE candidate はエラーになる
        // given (前提条件):
        let (pc, _events) = create(None).await;

        // when (操作):
        let result = pc.add_ice_candidate(json!("not a candidate")).await;

        // then (期待する結果):
        assert!(matches!(result, Err(NegotiationError::MalformedPayload(_))));
        pc.close().await;
    }
}
