//! Code shared by the Rendezvous relay and its clients.
//!
//! - `protocol`: the signaling message envelope spoken over the WebSocket
//! - `logger`: tracing subscriber setup for the binaries
//! - `time`: timestamps and the `Clock` abstraction

pub mod logger;
pub mod protocol;
pub mod time;
