//! End-to-end calls between two agents through an in-process relay.
//!
//! The relay and the signaling path are real. Most tests use a loopback
//! transport that reports "connected" as soon as both descriptions are
//! applied, so they do not depend on the host's network interfaces.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use rendezvous_client::{
    agent::{
        AgentHandle, MediaStream, NegotiationState, PeerConnection, PeerConnectionFactory,
        PeerConnectionState, PeerEvent, PeerEventSender, RemoteTrack,
    },
    cli::RelayLink,
    error::NegotiationError,
    rtc::{SyntheticMediaDevices, WebRtcPeerConnectionFactory},
};
use rendezvous_server::{
    infrastructure::{message_pusher::WebSocketMessagePusher, repository::InMemoryRoomRepository},
    ui::{AppState, Server},
};
use rendezvous_shared::time::SystemClock;
use serde_json::{Value, json};

const CALL_TIMEOUT: Duration = Duration::from_secs(5);

async fn start_relay() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let state = AppState::new(
        Arc::new(InMemoryRoomRepository::new()),
        Arc::new(WebSocketMessagePusher::new()),
        Arc::new(SystemClock),
    );
    tokio::spawn(async move {
        Server::new(state).serve(listener).await.unwrap();
    });
    format!("ws://{}/ws", addr)
}

/// Transport that connects once both descriptions are in place
struct LoopbackPeerConnection {
    events: PeerEventSender,
    local_set: AtomicBool,
    remote_set: AtomicBool,
    candidates: Arc<AtomicUsize>,
}

impl LoopbackPeerConnection {
    fn connect_if_ready(&self) {
        if self.local_set.load(Ordering::SeqCst) && self.remote_set.load(Ordering::SeqCst) {
            self.events.send(PeerEvent::LocalCandidate(json!({
                "candidate": "candidate:1 1 udp 2130706431 127.0.0.1 9 typ host",
                "sdpMid": "0",
                "sdpMLineIndex": 0
            })));
            self.events.send(PeerEvent::RemoteTrack(RemoteTrack {
                id: "loopback-video".to_string(),
                kind: "video".to_string(),
            }));
            self.events
                .send(PeerEvent::ConnectionStateChanged(PeerConnectionState::Connected));
        }
    }
}

#[async_trait]
impl PeerConnection for LoopbackPeerConnection {
    async fn create_offer(&self) -> Result<Value, NegotiationError> {
        Ok(json!({"type": "offer", "sdp": "v=0 loopback-offer"}))
    }

    async fn create_answer(&self) -> Result<Value, NegotiationError> {
        Ok(json!({"type": "answer", "sdp": "v=0 loopback-answer"}))
    }

    async fn set_local_description(&self, _description: Value) -> Result<(), NegotiationError> {
        self.local_set.store(true, Ordering::SeqCst);
        self.connect_if_ready();
        Ok(())
    }

    async fn set_remote_description(&self, _description: Value) -> Result<(), NegotiationError> {
        self.remote_set.store(true, Ordering::SeqCst);
        self.connect_if_ready();
        Ok(())
    }

    async fn add_ice_candidate(&self, _candidate: Value) -> Result<(), NegotiationError> {
        self.candidates.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&self) {}
}

#[derive(Default)]
struct LoopbackFactory {
    /// Remote candidates applied across every connection
    candidates: Arc<AtomicUsize>,
}

#[async_trait]
impl PeerConnectionFactory for LoopbackFactory {
    async fn create(
        &self,
        _local: Option<Arc<dyn MediaStream>>,
        events: PeerEventSender,
    ) -> Result<Arc<dyn PeerConnection>, NegotiationError> {
        Ok(Arc::new(LoopbackPeerConnection {
            events,
            local_set: AtomicBool::new(false),
            remote_set: AtomicBool::new(false),
            candidates: self.candidates.clone(),
        }))
    }
}

async fn connect(url: &str, factory: Arc<dyn PeerConnectionFactory>) -> RelayLink {
    RelayLink::connect(url, Arc::new(SyntheticMediaDevices::new()), factory, |_| {})
        .await
        .unwrap()
}

async fn loopback(url: &str) -> (RelayLink, Arc<LoopbackFactory>) {
    let factory = Arc::new(LoopbackFactory::default());
    (connect(url, factory.clone()).await, factory)
}

async fn reach(handle: &AgentHandle, state: NegotiationState) {
    tokio::time::timeout(CALL_TIMEOUT, handle.wait_for(state))
        .await
        .unwrap_or_else(|_| panic!("agent never reached {} (stuck in {})", state, handle.state()))
        .unwrap();
}

/// Two agents in `room`, connected to each other
async fn connected_pair(url: &str, room: &str) -> (RelayLink, RelayLink) {
    let (alice, _) = loopback(url).await;
    let (bob, _) = loopback(url).await;
    alice.handle.start_call(room).await.unwrap();
    reach(&alice.handle, NegotiationState::JoinedWaiting).await;
    bob.handle.join_call(room).await.unwrap();
    reach(&alice.handle, NegotiationState::Connected).await;
    reach(&bob.handle, NegotiationState::Connected).await;
    (alice, bob)
}

#[tokio::test]
async fn test_two_agents_in_same_room_connect() {
    // テスト項目: 同じルームに入った 2 つのエージェントが offer/answer/ICE を交換して接続する
    // given (前提条件):
    let url = start_relay().await;
    let (alice, alice_factory) = loopback(&url).await;
    let (bob, bob_factory) = loopback(&url).await;

    // when (操作):
    alice.handle.start_call("alpha").await.unwrap();
    bob.handle.start_call("alpha").await.unwrap();

    // then (期待する結果):
    reach(&alice.handle, NegotiationState::Connected).await;
    reach(&bob.handle, NegotiationState::Connected).await;

    let alice_status = alice.handle.status().await.unwrap();
    let bob_status = bob.handle.status().await.unwrap();
    assert!(alice_status.local_peer.is_some());
    assert_eq!(alice_status.remote_peer, bob_status.local_peer);
    assert_eq!(bob_status.remote_peer, alice_status.local_peer);
    assert_eq!(alice_status.remote_tracks.len(), 1);

    // Each side relays its candidate to the other
    for factory in [&alice_factory, &bob_factory] {
        for _ in 0..50 {
            if factory.candidates.load(Ordering::SeqCst) > 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(factory.candidates.load(Ordering::SeqCst) > 0);
    }
}

#[tokio::test]
async fn test_agents_in_different_rooms_keep_waiting() {
    // テスト項目: 別々のルームのエージェントは互いを検出せず待機し続ける
    // given (前提条件):
    let url = start_relay().await;
    let (alice, _) = loopback(&url).await;
    let (bob, _) = loopback(&url).await;

    // when (操作):
    alice.handle.start_call("alpha").await.unwrap();
    bob.handle.start_call("beta").await.unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;

    // then (期待する結果):
    assert_eq!(alice.handle.state(), NegotiationState::JoinedWaiting);
    assert_eq!(bob.handle.state(), NegotiationState::JoinedWaiting);
}

#[tokio::test]
async fn test_hang_up_ends_call_on_both_sides() {
    // テスト項目: 一方が通話を終了すると、相手側も通話終了になる
    // given (前提条件):
    let url = start_relay().await;
    let (alice, bob) = connected_pair(&url, "alpha").await;

    // when (操作):
    alice.handle.end_call().await.unwrap();

    // then (期待する結果):
    assert_eq!(alice.handle.state(), NegotiationState::Ended);
    reach(&bob.handle, NegotiationState::Ended).await;
}

#[tokio::test]
async fn test_disconnect_ends_remote_call() {
    // テスト項目: 一方がリレーから切断すると、相手側の通話が終了する
    // given (前提条件):
    let url = start_relay().await;
    let (alice, bob) = connected_pair(&url, "alpha").await;

    // when (操作):
    alice.close().await;

    // then (期待する結果):
    reach(&bob.handle, NegotiationState::Ended).await;
}

#[tokio::test]
async fn test_third_participant_does_not_disturb_call() {
    // テスト項目: 接続済みのルームに 3 人目が入っても、既存の通話は維持される
    // given (前提条件):
    let url = start_relay().await;
    let (alice, bob) = connected_pair(&url, "alpha").await;
    let (carol, _) = loopback(&url).await;

    // when (操作):
    carol.handle.start_call("alpha").await.unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;

    // then (期待する結果):
    assert_eq!(alice.handle.state(), NegotiationState::Connected);
    assert_eq!(bob.handle.state(), NegotiationState::Connected);
    assert_eq!(carol.handle.state(), NegotiationState::JoinedWaiting);
}

#[tokio::test]
async fn test_call_can_restart_after_hang_up() {
    // テスト項目: 通話終了後に同じルームで再び通話できる
    // given (前提条件):
    let url = start_relay().await;
    let (alice, bob) = connected_pair(&url, "alpha").await;
    alice.handle.end_call().await.unwrap();
    reach(&bob.handle, NegotiationState::Ended).await;

    // when (操作):
    alice.handle.start_call("alpha").await.unwrap();
    reach(&alice.handle, NegotiationState::JoinedWaiting).await;
    bob.handle.start_call("alpha").await.unwrap();

    // then (期待する結果):
    reach(&alice.handle, NegotiationState::Connected).await;
    reach(&bob.handle, NegotiationState::Connected).await;
}

#[tokio::test]
async fn test_invalid_url_is_reported() {
    // テスト項目: WebSocket 以外のスキームの URL では InvalidUrl エラーになる
    // given (前提条件):
    let url = "http://127.0.0.1/ws";

    // when (操作):
    let result = RelayLink::connect(
        url,
        Arc::new(SyntheticMediaDevices::new()),
        Arc::new(LoopbackFactory::default()),
        |_| {},
    )
    .await;

    // then (期待する結果):
    assert!(matches!(
        result,
        Err(rendezvous_client::error::ClientError::InvalidUrl(_))
    ));
}

#[tokio::test]
#[ignore = "needs a non-loopback network interface for ICE host candidates"]
async fn test_webrtc_call_connects() {
    // テスト項目: webrtc-rs の実際の接続で 2 つのエージェントが接続する
    // given (前提条件):
    let url = start_relay().await;
    let alice = connect(&url, Arc::new(WebRtcPeerConnectionFactory::new(Vec::new()))).await;
    let bob = connect(&url, Arc::new(WebRtcPeerConnectionFactory::new(Vec::new()))).await;

    // when (操作):
    alice.handle.start_call("alpha").await.unwrap();
    reach(&alice.handle, NegotiationState::JoinedWaiting).await;
    bob.handle.start_call("alpha").await.unwrap();

    // then (期待する結果):
    let deadline = Duration::from_secs(20);
    tokio::time::timeout(deadline, alice.handle.wait_for(NegotiationState::Connected))
        .await
        .unwrap()
        .unwrap();
    tokio::time::timeout(deadline, bob.handle.wait_for(NegotiationState::Connected))
        .await
        .unwrap()
        .unwrap();
}
