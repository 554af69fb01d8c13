//! webrtc-rs implementations of the agent's media and peer-connection capabilities.

mod media;
mod peer_connection;

pub use media::{SyntheticMediaDevices, SyntheticStream};
pub use peer_connection::{DEFAULT_STUN_SERVER, WebRtcPeerConnection, WebRtcPeerConnectionFactory};
