//! Signaling message envelope.
//!
//! Every WebSocket text frame carries exactly one of these messages as JSON,
//! internally tagged by `type`:
//!
//! ```text
//! client -> relay   {"type":"offer","offer":{...},"to":"<peer id>"}
//! relay  -> client  {"type":"offer","offer":{...},"from":"<peer id>"}
//! ```
//!
//! Session descriptions and ICE candidates are kept as raw JSON values. The
//! relay forwards them verbatim; only the peers interpret them.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Messages sent by a client to the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    /// Enter a room. Other members are told with `user-connected`.
    JoinRoom { room_id: String },
    /// Leave a room without closing the connection.
    LeaveRoom { room_id: String },
    /// Session description of type offer, addressed to one peer.
    Offer { offer: Value, to: String },
    /// Session description of type answer, addressed to one peer.
    Answer { answer: Value, to: String },
    /// Trickled ICE candidate, addressed to one peer.
    IceCandidate { candidate: Value, to: String },
}

/// Messages sent by the relay to a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    /// First frame on every connection: the identifier the relay assigned.
    Welcome { peer_id: String },
    /// Another participant joined the room this client is in.
    UserConnected { peer_id: String },
    /// A participant disconnected or left.
    UserDisconnected { peer_id: String },
    Offer { offer: Value, from: String },
    Answer { answer: Value, from: String },
    IceCandidate { candidate: Value, from: String },
    /// The relay rejected a frame from this client.
    Error { message: String },
}

/// Kind of a unicast signaling message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalKind {
    Offer,
    Answer,
    IceCandidate,
}

impl SignalKind {
    /// Wire name of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalKind::Offer => "offer",
            SignalKind::Answer => "answer",
            SignalKind::IceCandidate => "ice-candidate",
        }
    }
}

impl std::fmt::Display for SignalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ClientMessage {
    /// Split a unicast message into its kind, recipient and payload.
    ///
    /// Returns `None` for room membership messages.
    pub fn into_signal(self) -> Option<(SignalKind, String, Value)> {
        match self {
            ClientMessage::Offer { offer, to } => Some((SignalKind::Offer, to, offer)),
            ClientMessage::Answer { answer, to } => Some((SignalKind::Answer, to, answer)),
            ClientMessage::IceCandidate { candidate, to } => {
                Some((SignalKind::IceCandidate, to, candidate))
            }
            ClientMessage::JoinRoom { .. } | ClientMessage::LeaveRoom { .. } => None,
        }
    }
}

impl ServerMessage {
    /// Build the relayed form of a unicast message, stamped with its sender.
    pub fn relayed(kind: SignalKind, from: String, payload: Value) -> Self {
        match kind {
            SignalKind::Offer => ServerMessage::Offer {
                offer: payload,
                from,
            },
            SignalKind::Answer => ServerMessage::Answer {
                answer: payload,
                from,
            },
            SignalKind::IceCandidate => ServerMessage::IceCandidate {
                candidate: payload,
                from,
            },
        }
    }
}
