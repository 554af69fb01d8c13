//! Signaling relay server: WebSocket endpoint, room inspection API, and lifecycle.

mod handler;
mod server;
mod signal;
pub mod state;

pub use server::Server;
pub use state::AppState;
