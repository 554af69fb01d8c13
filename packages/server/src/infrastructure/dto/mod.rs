//! Data Transfer Objects (DTOs) for the HTTP API.
//!
//! WebSocket messages are defined in `rendezvous_shared::protocol`, shared
//! with the client.

pub mod conversion;
pub mod http;
