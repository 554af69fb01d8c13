//! Negotiation states.

use std::fmt;

/// Where the agent is in the offer/answer handshake.
///
/// ```text
/// idle -> acquiring-media -> joined-waiting -> negotiating-offer  -> connected -> ended
///                                           \-> negotiating-answer -/
/// ```
///
/// `ended` is reachable from every state. A new call may be started from
/// `idle` or `ended`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum NegotiationState {
    #[default]
    Idle,
    AcquiringMedia,
    JoinedWaiting,
    NegotiatingOffer,
    NegotiatingAnswer,
    Connected,
    Ended,
}

impl NegotiationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            NegotiationState::Idle => "idle",
            NegotiationState::AcquiringMedia => "acquiring-media",
            NegotiationState::JoinedWaiting => "joined-waiting",
            NegotiationState::NegotiatingOffer => "negotiating-offer",
            NegotiationState::NegotiatingAnswer => "negotiating-answer",
            NegotiationState::Connected => "connected",
            NegotiationState::Ended => "ended",
        }
    }

    /// StartCall / JoinCall is accepted
    pub fn can_start_call(&self) -> bool {
        matches!(self, NegotiationState::Idle | NegotiationState::Ended)
    }

    pub fn is_negotiating(&self) -> bool {
        matches!(
            self,
            NegotiationState::NegotiatingOffer | NegotiationState::NegotiatingAnswer
        )
    }

    /// An incoming offer is answered
    pub fn accepts_offer(&self) -> bool {
        !matches!(self, NegotiationState::Connected | NegotiationState::Ended)
    }

    /// Remote ICE candidates are applied
    pub fn accepts_candidates(&self) -> bool {
        self.is_negotiating() || *self == NegotiationState::Connected
    }
}

impl fmt::Display for NegotiationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
