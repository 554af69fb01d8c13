//! Terminal client for the Rendezvous signaling relay.
//!
//! Joins a room, waits for a peer and negotiates a WebRTC call with it.
//! The local stream is synthetic (no camera), so the client is useful for
//! exercising the relay and for calling a browser peer.
//! Automatically reconnects on disconnection (max 5 attempts with 5 second interval).
//!
//! Run with:
//! ```not_rust
//! cargo run --bin rendezvous-client -- --room alpha
//! cargo run --bin rendezvous-client -- -u ws://relay.example.com/ws --ice-server stun:stun.example.com:3478
//! ```

use std::sync::Arc;

use clap::Parser;
use rendezvous_client::{
    cli::{ClientConfig, run_client},
    rtc::{DEFAULT_STUN_SERVER, SyntheticMediaDevices, WebRtcPeerConnectionFactory},
};
use rendezvous_shared::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "client")]
#[command(about = "WebRTC call client for the Rendezvous signaling relay", long_about = None)]
struct Args {
    /// Relay WebSocket URL
    #[arg(short = 'u', long, env = "RENDEZVOUS_URL", default_value = "ws://127.0.0.1:3000/ws")]
    url: String,

    /// Room to join right after connecting
    #[arg(short = 'r', long)]
    room: Option<String>,

    /// STUN/TURN server URL (repeatable)
    #[arg(long = "ice-server", default_value = DEFAULT_STUN_SERVER)]
    ice_servers: Vec<String>,

    /// Gather host candidates only
    #[arg(long, conflicts_with = "ice_servers")]
    no_ice_servers: bool,
}

#[tokio::main]
async fn main() {
    setup_logger(env!("CARGO_CRATE_NAME"), env!("CARGO_BIN_NAME"), "info");

    let args = Args::parse();

    let ice_servers = if args.no_ice_servers {
        Vec::new()
    } else {
        args.ice_servers
    };
    let config = ClientConfig {
        url: args.url,
        room: args.room,
        media: Arc::new(SyntheticMediaDevices::new()),
        factory: Arc::new(WebRtcPeerConnectionFactory::new(ice_servers)),
    };

    if let Err(e) = run_client(config).await {
        tracing::error!("Client error: {}", e);
        std::process::exit(1);
    }
}
