//! Negotiation agent: one participant's side of a call.
//!
//! - `state`: negotiation states
//! - `capability`: media, peer-connection and signaling interfaces
//! - `session`: the call currently owned by the agent
//! - `negotiation`: the event loop driving the offer/answer/ICE exchange

pub mod capability;
mod negotiation;
mod session;
mod state;

pub use capability::{
    ChannelSignalSink, MediaDevices, MediaStream, PeerConnection, PeerConnectionFactory,
    PeerConnectionState, PeerEvent, PeerEventSender, RemoteTrack, SignalSink,
};
pub use negotiation::{AgentEvent, AgentHandle, AgentStatus, Command, NegotiationAgent, StatusCallback};
pub use session::PeerSession;
pub use state::NegotiationState;

#[cfg(test)]
pub(crate) mod test_support {
    use std::{
        any::Any,
        sync::{
            Arc, Mutex,
            atomic::{AtomicBool, Ordering},
        },
    };

    use async_trait::async_trait;
    use serde_json::{Value, json};

    use super::*;
    use crate::error::{MediaError, NegotiationError};

    /// Stream with no real tracks
    #[derive(Default)]
    pub struct FakeStream {
        stopped: AtomicBool,
    }

    impl MediaStream for FakeStream {
        fn id(&self) -> String {
            "fake-stream".to_string()
        }

        fn track_kinds(&self) -> Vec<String> {
            vec!["audio".to_string(), "video".to_string()]
        }

        fn stop(&self) {
            self.stopped.store(true, Ordering::SeqCst);
        }

        fn is_stopped(&self) -> bool {
            self.stopped.load(Ordering::SeqCst)
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    /// Media devices that either hand out one shared stream or fail
    pub struct FakeMediaDevices {
        pub stream: Arc<FakeStream>,
        pub failure: Option<MediaError>,
    }

    impl FakeMediaDevices {
        pub fn working() -> Self {
            Self {
                stream: Arc::new(FakeStream::default()),
                failure: None,
            }
        }

        pub fn failing(error: MediaError) -> Self {
            Self {
                stream: Arc::new(FakeStream::default()),
                failure: Some(error),
            }
        }
    }

    #[async_trait]
    impl MediaDevices for FakeMediaDevices {
        async fn get_user_media(&self) -> Result<Arc<dyn MediaStream>, MediaError> {
            match &self.failure {
                Some(error) => Err(error.clone()),
                None => Ok(self.stream.clone()),
            }
        }
    }

    /// Peer connection that records every call
    pub struct FakePeerConnection {
        pub calls: Mutex<Vec<String>>,
        pub candidates: Mutex<Vec<Value>>,
        pub closed: AtomicBool,
        pub has_local_media: bool,
        pub events: PeerEventSender,
        fail_create: bool,
        fail_apply: bool,
    }

    impl FakePeerConnection {
        fn record(&self, call: &str) {
            self.calls.lock().unwrap().push(call.to_string());
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        pub fn is_closed(&self) -> bool {
            self.closed.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PeerConnection for FakePeerConnection {
        async fn create_offer(&self) -> Result<Value, NegotiationError> {
            self.record("create_offer");
            if self.fail_create {
                return Err(NegotiationError::CreateDescription("boom".to_string()));
            }
            Ok(json!({"type": "offer", "sdp": "fake-offer"}))
        }

        async fn create_answer(&self) -> Result<Value, NegotiationError> {
            self.record("create_answer");
            if self.fail_create {
                return Err(NegotiationError::CreateDescription("boom".to_string()));
            }
            Ok(json!({"type": "answer", "sdp": "fake-answer"}))
        }

        async fn set_local_description(&self, _description: Value) -> Result<(), NegotiationError> {
            self.record("set_local_description");
            Ok(())
        }

        async fn set_remote_description(&self, _description: Value) -> Result<(), NegotiationError> {
            self.record("set_remote_description");
            if self.fail_apply {
                return Err(NegotiationError::ApplyDescription("bad sdp".to_string()));
            }
            Ok(())
        }

        async fn add_ice_candidate(&self, candidate: Value) -> Result<(), NegotiationError> {
            self.candidates.lock().unwrap().push(candidate);
            Ok(())
        }

        async fn close(&self) {
            self.closed.store(true, Ordering::SeqCst);
        }
    }

    /// Factory that keeps every connection it built
    #[derive(Default)]
    pub struct FakeFactory {
        pub created: Mutex<Vec<Arc<FakePeerConnection>>>,
        pub fail_create: bool,
        pub fail_apply: bool,
    }

    impl FakeFactory {
        pub fn failing_descriptions() -> Self {
            Self {
                fail_create: true,
                ..Self::default()
            }
        }

        /// Every remote description is rejected
        pub fn rejecting_remote() -> Self {
            Self {
                fail_apply: true,
                ..Self::default()
            }
        }

        pub fn count(&self) -> usize {
            self.created.lock().unwrap().len()
        }

        pub fn last(&self) -> Arc<FakePeerConnection> {
            self.created
                .lock()
                .unwrap()
                .last()
                .cloned()
                .expect("no peer connection was created")
        }
    }

    #[async_trait]
    impl PeerConnectionFactory for FakeFactory {
        async fn create(
            &self,
            local: Option<Arc<dyn MediaStream>>,
            events: PeerEventSender,
        ) -> Result<Arc<dyn PeerConnection>, NegotiationError> {
            let pc = Arc::new(FakePeerConnection {
                calls: Mutex::new(Vec::new()),
                candidates: Mutex::new(Vec::new()),
                closed: AtomicBool::new(false),
                has_local_media: local.is_some(),
                events,
                fail_create: self.fail_create,
                fail_apply: self.fail_apply,
            });
            self.created.lock().unwrap().push(pc.clone());
            Ok(pc)
        }
    }
}
