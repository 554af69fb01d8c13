//! The negotiation state machine.
//!
//! A single task owns the call and consumes [`AgentEvent`]s one at a time:
//! user commands, relay messages and peer-connection events. While an async
//! step is awaited (media acquisition, description generation) later events
//! wait in the queue, so two negotiations never run at once.

use std::sync::Arc;

use rendezvous_shared::protocol::{ClientMessage, ServerMessage};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot, watch};

use crate::error::{AgentError, NegotiationError};

use super::{
    capability::{
        MediaDevices, PeerConnection, PeerConnectionFactory, PeerConnectionState, PeerEvent,
        PeerEventSender, RemoteTrack, SignalSink,
    },
    session::PeerSession,
    state::NegotiationState,
};

/// Receives human-readable status lines
pub type StatusCallback = Arc<dyn Fn(&str) + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    StartCall(String),
    /// Same action as `StartCall`; only the wording differs
    JoinCall(String),
    EndCall,
}

/// Snapshot of the agent, taken in queue order
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AgentStatus {
    pub state: NegotiationState,
    /// Identifier the relay assigned to this client
    pub local_peer: Option<String>,
    pub room_id: Option<String>,
    pub remote_peer: Option<String>,
    pub remote_tracks: Vec<RemoteTrack>,
}

#[derive(Debug)]
pub enum AgentEvent {
    Command {
        command: Command,
        reply: oneshot::Sender<Result<(), AgentError>>,
    },
    Status(oneshot::Sender<AgentStatus>),
    /// Message from the relay
    Signal(ServerMessage),
    Peer {
        generation: u64,
        event: PeerEvent,
    },
    /// End any call and stop the agent
    Shutdown,
}

/// Cloneable front end of a running agent
#[derive(Clone)]
pub struct AgentHandle {
    tx: mpsc::UnboundedSender<AgentEvent>,
    state: watch::Receiver<NegotiationState>,
}

impl AgentHandle {
    pub async fn start_call(&self, room_id: &str) -> Result<(), AgentError> {
        self.command(Command::StartCall(room_id.to_string())).await
    }

    pub async fn join_call(&self, room_id: &str) -> Result<(), AgentError> {
        self.command(Command::JoinCall(room_id.to_string())).await
    }

    pub async fn end_call(&self) -> Result<(), AgentError> {
        self.command(Command::EndCall).await
    }

    pub async fn command(&self, command: Command) -> Result<(), AgentError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(AgentEvent::Command { command, reply })
            .map_err(|_| AgentError::Stopped)?;
        rx.await.map_err(|_| AgentError::Stopped)?
    }

    pub async fn status(&self) -> Result<AgentStatus, AgentError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(AgentEvent::Status(reply))
            .map_err(|_| AgentError::Stopped)?;
        rx.await.map_err(|_| AgentError::Stopped)
    }

    /// Hand a relay message to the agent. Returns `false` once the agent has stopped.
    pub fn deliver(&self, message: ServerMessage) -> bool {
        self.tx.send(AgentEvent::Signal(message)).is_ok()
    }

    pub fn shutdown(&self) {
        let _ = self.tx.send(AgentEvent::Shutdown);
    }

    /// Latest published state
    pub fn state(&self) -> NegotiationState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<NegotiationState> {
        self.state.clone()
    }

    /// Wait until the agent reaches `target`
    pub async fn wait_for(&self, target: NegotiationState) -> Result<(), AgentError> {
        let mut rx = self.state.clone();
        rx.wait_for(|state| *state == target)
            .await
            .map(|_| ())
            .map_err(|_| AgentError::Stopped)
    }
}

/// Drives one participant's side of the call
pub struct NegotiationAgent {
    media: Arc<dyn MediaDevices>,
    factory: Arc<dyn PeerConnectionFactory>,
    signal: Arc<dyn SignalSink>,
    status: Option<StatusCallback>,
    /// Weak so the queue closes once every handle is gone
    events_tx: mpsc::WeakUnboundedSender<AgentEvent>,
    events_rx: mpsc::UnboundedReceiver<AgentEvent>,
    state_tx: watch::Sender<NegotiationState>,
    session: Option<PeerSession>,
    local_peer: Option<String>,
    generation: u64,
}

impl NegotiationAgent {
    pub fn new(
        media: Arc<dyn MediaDevices>,
        factory: Arc<dyn PeerConnectionFactory>,
        signal: Arc<dyn SignalSink>,
    ) -> (Self, AgentHandle) {
        let (tx, events_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(NegotiationState::Idle);
        let agent = Self {
            media,
            factory,
            signal,
            status: None,
            events_tx: tx.downgrade(),
            events_rx,
            state_tx,
            session: None,
            local_peer: None,
            generation: 0,
        };
        let handle = AgentHandle {
            tx,
            state: state_rx,
        };
        (agent, handle)
    }

    pub fn with_status<F>(mut self, callback: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.status = Some(Arc::new(callback));
        self
    }

    /// Process events until shutdown or until every handle is dropped
    pub async fn run(mut self) {
        while let Some(event) = self.events_rx.recv().await {
            if !self.handle_event(event).await {
                break;
            }
        }
        self.end_call().await;
        tracing::debug!("Negotiation agent stopped");
    }

    async fn handle_event(&mut self, event: AgentEvent) -> bool {
        match event {
            AgentEvent::Command { command, reply } => {
                let result = self.handle_command(command).await;
                let _ = reply.send(result);
            }
            AgentEvent::Status(reply) => {
                let _ = reply.send(self.snapshot());
            }
            AgentEvent::Signal(message) => self.handle_signal(message).await,
            AgentEvent::Peer { generation, event } => {
                if self.session.as_ref().map(|s| s.generation) == Some(generation) {
                    self.handle_peer_event(event).await;
                } else {
                    tracing::debug!("Discarding event from a replaced peer connection: {:?}", event);
                }
            }
            AgentEvent::Shutdown => return false,
        }
        true
    }

    async fn handle_command(&mut self, command: Command) -> Result<(), AgentError> {
        match command {
            Command::StartCall(room_id) | Command::JoinCall(room_id) => self.start(room_id).await,
            Command::EndCall => {
                self.end_call().await;
                Ok(())
            }
        }
    }

    async fn handle_signal(&mut self, message: ServerMessage) {
        match message {
            ServerMessage::Welcome { peer_id } => {
                self.report(&format!("Connected to relay as {}", peer_id));
                self.local_peer = Some(peer_id);
            }
            ServerMessage::UserConnected { peer_id } => self.on_user_connected(peer_id).await,
            ServerMessage::Offer { offer, from } => self.on_offer(offer, from).await,
            ServerMessage::Answer { answer, from } => self.on_answer(answer, from).await,
            ServerMessage::IceCandidate { candidate, from } => {
                self.on_remote_candidate(candidate, from).await
            }
            ServerMessage::UserDisconnected { peer_id } => {
                if self.remote_peer() == Some(peer_id.as_str()) {
                    self.report(&format!("Peer {} disconnected", peer_id));
                    self.end_call().await;
                }
            }
            ServerMessage::Error { message } => {
                tracing::warn!("Relay rejected a message: {}", message);
                self.report(&format!("Relay error: {}", message));
            }
        }
    }

    async fn start(&mut self, room_id: String) -> Result<(), AgentError> {
        if room_id.is_empty() {
            self.report("Please enter a room ID");
            return Err(AgentError::EmptyRoomId);
        }
        let state = self.state();
        if !state.can_start_call() {
            return Err(AgentError::CallInProgress(state.to_string()));
        }

        self.set_state(NegotiationState::AcquiringMedia);
        self.report("Requesting camera and microphone...");
        let stream = match self.media.get_user_media().await {
            Ok(stream) => stream,
            Err(e) => {
                self.set_state(NegotiationState::Idle);
                self.report(&format!("Error accessing media devices: {}", e));
                return Err(e.into());
            }
        };

        self.report(&format!("Local media ready ({})", stream.track_kinds().join(", ")));

        let mut session = PeerSession::new(self.next_generation());
        session.room_id = Some(room_id.clone());
        session.local_stream = Some(stream);
        self.session = Some(session);
        self.set_state(NegotiationState::JoinedWaiting);

        self.signal
            .send(ClientMessage::JoinRoom {
                room_id: room_id.clone(),
            })
            .await;
        self.report(&format!("Joined room {}. Waiting for peer...", room_id));
        Ok(())
    }

    async fn on_user_connected(&mut self, peer_id: String) {
        let state = self.state();
        if state != NegotiationState::JoinedWaiting {
            tracing::warn!("Ignoring user-connected for '{}' while {}", peer_id, state);
            return;
        }
        let Some(session) = self.session.as_mut() else {
            return;
        };
        session.remote_peer = Some(peer_id.clone());

        self.set_state(NegotiationState::NegotiatingOffer);
        self.report(&format!("Peer {} joined, sending offer", peer_id));

        if let Err(e) = self.send_offer(&peer_id).await {
            self.report(&format!("Error creating offer: {}", e));
            self.abandon_negotiation().await;
        }
    }

    async fn send_offer(&mut self, peer_id: &str) -> Result<(), NegotiationError> {
        let pc = self.new_peer_connection().await?;
        let offer = pc.create_offer().await?;
        pc.set_local_description(offer.clone()).await?;
        self.signal
            .send(ClientMessage::Offer {
                offer,
                to: peer_id.to_string(),
            })
            .await;
        Ok(())
    }

    async fn on_offer(&mut self, offer: Value, from: String) {
        let state = self.state();
        if !state.accepts_offer() {
            tracing::warn!("Ignoring offer from '{}' while {}", from, state);
            return;
        }
        if self.session.is_none() {
            // Answer without local media
            let generation = self.next_generation();
            self.session = Some(PeerSession::new(generation));
        }
        if let Some(session) = self.session.as_mut() {
            session.reset_peer().await;
            session.remote_peer = Some(from.clone());
        }
        self.report(&format!("Received offer from {}", from));

        if let Err(e) = self.send_answer(offer, &from).await {
            self.report(&format!("Error handling offer: {}", e));
            self.abandon_negotiation().await;
        }
    }

    async fn send_answer(&mut self, offer: Value, to: &str) -> Result<(), NegotiationError> {
        let pc = self.new_peer_connection().await?;
        pc.set_remote_description(offer).await?;
        let answer = pc.create_answer().await?;
        pc.set_local_description(answer.clone()).await?;
        self.set_state(NegotiationState::NegotiatingAnswer);
        self.signal
            .send(ClientMessage::Answer {
                answer,
                to: to.to_string(),
            })
            .await;
        Ok(())
    }

    async fn on_answer(&mut self, answer: Value, from: String) {
        let state = self.state();
        if state != NegotiationState::NegotiatingOffer {
            tracing::warn!("Ignoring answer from '{}' while {}", from, state);
            return;
        }
        let Some(pc) = self.peer_connection() else {
            return;
        };
        match pc.set_remote_description(answer).await {
            Ok(()) => self.report(&format!("Answer received from {}, connecting...", from)),
            Err(e) => {
                self.report(&format!("Error applying answer: {}", e));
                self.abandon_negotiation().await;
            }
        }
    }

    async fn on_remote_candidate(&mut self, candidate: Value, from: String) {
        let state = self.state();
        let pc = match self.peer_connection() {
            Some(pc) if state.accepts_candidates() => pc,
            // No buffering: candidates before the peer connection exists are lost
            _ => {
                tracing::debug!("Dropping ICE candidate from '{}' while {}", from, state);
                return;
            }
        };
        if let Err(e) = pc.add_ice_candidate(candidate).await {
            tracing::warn!("Error adding ICE candidate from '{}': {}", from, e);
        }
    }

    async fn handle_peer_event(&mut self, event: PeerEvent) {
        match event {
            PeerEvent::LocalCandidate(candidate) => {
                let Some(to) = self.remote_peer().map(str::to_string) else {
                    tracing::debug!("No remote peer yet, dropping local ICE candidate");
                    return;
                };
                self.signal
                    .send(ClientMessage::IceCandidate { candidate, to })
                    .await;
            }
            PeerEvent::RemoteTrack(track) => {
                self.report(&format!("Receiving remote {} track", track.kind));
                if let Some(session) = self.session.as_mut() {
                    session.remote_tracks.push(track);
                }
            }
            PeerEvent::ConnectionStateChanged(connection_state) => {
                let state = self.state();
                tracing::debug!("Peer connection state: {:?} ({})", connection_state, state);
                match connection_state {
                    PeerConnectionState::Connected if state.is_negotiating() => {
                        self.set_state(NegotiationState::Connected);
                        let peer = self.remote_peer().unwrap_or("peer").to_string();
                        self.report(&format!("Connected to {}", peer));
                    }
                    PeerConnectionState::Failed
                        if state.is_negotiating() || state == NegotiationState::Connected =>
                    {
                        self.report("Peer connection failed");
                        self.end_call().await;
                    }
                    PeerConnectionState::Disconnected => {
                        self.report("Peer connection interrupted");
                    }
                    _ => {}
                }
            }
        }
    }

    /// Drop the half-built peer connection and wait for a peer again
    async fn abandon_negotiation(&mut self) {
        let has_room = match self.session.as_mut() {
            Some(session) => {
                session.reset_peer().await;
                session.room_id.is_some()
            }
            None => false,
        };
        if has_room {
            self.set_state(NegotiationState::JoinedWaiting);
            return;
        }
        // Offer answered without a call of our own
        if let Some(session) = self.session.take() {
            session.teardown().await;
        }
        self.set_state(NegotiationState::Idle);
    }

    async fn end_call(&mut self) {
        let Some(session) = self.session.take() else {
            if self.state() != NegotiationState::Ended {
                self.set_state(NegotiationState::Ended);
            }
            return;
        };
        let room_id = session.room_id.clone();
        session.teardown().await;
        if let Some(room_id) = room_id {
            self.signal.send(ClientMessage::LeaveRoom { room_id }).await;
        }
        self.set_state(NegotiationState::Ended);
        self.report("Call ended");
    }

    async fn new_peer_connection(&mut self) -> Result<Arc<dyn PeerConnection>, NegotiationError> {
        let tx = self.events_tx.clone();
        if tx.upgrade().is_none() {
            return Err(NegotiationError::PeerConnection("agent stopped".to_string()));
        }
        let generation = self.next_generation();
        let session = self
            .session
            .as_mut()
            .ok_or_else(|| NegotiationError::PeerConnection("no active call".to_string()))?;
        if let Some(previous) = session.peer_connection.take() {
            previous.close().await;
        }
        session.generation = generation;

        let pc = self
            .factory
            .create(
                session.local_stream.clone(),
                PeerEventSender::new(generation, tx),
            )
            .await?;
        session.peer_connection = Some(pc.clone());
        Ok(pc)
    }

    fn next_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    fn peer_connection(&self) -> Option<Arc<dyn PeerConnection>> {
        self.session.as_ref()?.peer_connection.clone()
    }

    fn remote_peer(&self) -> Option<&str> {
        self.session.as_ref()?.remote_peer.as_deref()
    }

    fn state(&self) -> NegotiationState {
        *self.state_tx.borrow()
    }

    fn set_state(&self, state: NegotiationState) {
        let previous = self.state_tx.send_replace(state);
        if previous != state {
            tracing::debug!("Negotiation state: {} -> {}", previous, state);
        }
    }

    fn report(&self, line: &str) {
        tracing::info!("{}", line);
        if let Some(callback) = &self.status {
            callback(line);
        }
    }

    fn snapshot(&self) -> AgentStatus {
        AgentStatus {
            state: self.state(),
            local_peer: self.local_peer.clone(),
            room_id: self.session.as_ref().and_then(|s| s.room_id.clone()),
            remote_peer: self.remote_peer().map(str::to_string),
            remote_tracks: self
                .session
                .as_ref()
                .map(|s| s.remote_tracks.clone())
                .unwrap_or_default(),
        }
    }
}
