//! Rendezvous signaling relay.
//!
//! Pairs WebRTC peers by room identifier and relays their offer, answer and
//! ICE candidate messages. The relay never sees media.

// layers
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;
