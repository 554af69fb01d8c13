//! Rendezvous client: a negotiation agent driving one WebRTC call through the signaling relay.

pub mod agent;
pub mod cli;
pub mod error;
pub mod rtc;
