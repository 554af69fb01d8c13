//! Local media for a headless client.
//!
//! There is no camera on a terminal. The stream carries one VP8 video track
//! and one Opus audio track that take part in negotiation like real device
//! tracks but are never fed samples.

use std::{
    any::Any,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
};

use async_trait::async_trait;
use webrtc::{
    api::media_engine::{MIME_TYPE_OPUS, MIME_TYPE_VP8},
    rtp_transceiver::rtp_codec::RTCRtpCodecCapability,
    track::track_local::track_local_static_sample::TrackLocalStaticSample,
};

use crate::{
    agent::{MediaDevices, MediaStream},
    error::MediaError,
};

static NEXT_STREAM: AtomicU64 = AtomicU64::new(1);

/// A local stream with one video and one audio track
pub struct SyntheticStream {
    id: String,
    video: Arc<TrackLocalStaticSample>,
    audio: Arc<TrackLocalStaticSample>,
    stopped: AtomicBool,
}

impl SyntheticStream {
    pub fn new() -> Self {
        let id = format!("rendezvous-{}", NEXT_STREAM.fetch_add(1, Ordering::Relaxed));
        let video = Arc::new(TrackLocalStaticSample::new(
            RTCRtpCodecCapability {
                mime_type: MIME_TYPE_VP8.to_owned(),
                clock_rate: 90000,
                ..Default::default()
            },
            "video".to_owned(),
            id.clone(),
        ));
        let audio = Arc::new(TrackLocalStaticSample::new(
            RTCRtpCodecCapability {
                mime_type: MIME_TYPE_OPUS.to_owned(),
                clock_rate: 48000,
                channels: 2,
                ..Default::default()
            },
            "audio".to_owned(),
            id.clone(),
        ));
        Self {
            id,
            video,
            audio,
            stopped: AtomicBool::new(false),
        }
    }

    /// Tracks in the order they are added to a peer connection
    pub fn tracks(&self) -> Vec<Arc<TrackLocalStaticSample>> {
        vec![self.audio.clone(), self.video.clone()]
    }
}

impl Default for SyntheticStream {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaStream for SyntheticStream {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn track_kinds(&self) -> Vec<String> {
        vec!["audio".to_string(), "video".to_string()]
    }

    fn stop(&self) {
        if !self.stopped.swap(true, Ordering::SeqCst) {
            tracing::debug!("Stopped local stream {}", self.id);
        }
    }

    fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Hands out a fresh [`SyntheticStream`] for every call
#[derive(Debug, Default)]
pub struct SyntheticMediaDevices {
    denied: bool,
}

impl SyntheticMediaDevices {
    pub fn new() -> Self {
        Self::default()
    }

    /// Behaves like a user who refuses camera and microphone access
    pub fn denied() -> Self {
        Self { denied: true }
    }
}

#[async_trait]
impl MediaDevices for SyntheticMediaDevices {
    async fn get_user_media(&self) -> Result<Arc<dyn MediaStream>, MediaError> {
        if self.denied {
            return Err(MediaError::PermissionDenied);
        }
        let stream = SyntheticStream::new();
        tracing::debug!("Acquired local stream {}", stream.id);
        Ok(Arc::new(stream))
    }
}
