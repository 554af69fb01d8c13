//! WebRTC signaling relay.
//!
//! Groups WebSocket connections into named rooms and forwards offers, answers
//! and ICE candidates between peers in the same room.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin rendezvous-server
//! cargo run --bin rendezvous-server -- --host 0.0.0.0 --port 3000 --static-dir ./public
//! PORT=8080 cargo run --bin rendezvous-server
//! ```

use std::{path::PathBuf, sync::Arc};

use clap::Parser;
use rendezvous_server::{
    infrastructure::{message_pusher::WebSocketMessagePusher, repository::InMemoryRoomRepository},
    ui::{AppState, Server},
};
use rendezvous_shared::{logger::setup_logger, time::SystemClock};

#[derive(Parser, Debug)]
#[command(name = "server")]
#[command(about = "WebRTC signaling relay with room-scoped peer discovery", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, env = "HOST", default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, env = "PORT", default_value = "3000")]
    port: u16,

    /// Directory of static files to serve alongside the API
    #[arg(long)]
    static_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    setup_logger(env!("CARGO_CRATE_NAME"), env!("CARGO_BIN_NAME"), "debug");

    let args = Args::parse();

    // 1. Repository と MessagePusher
    let repository = Arc::new(InMemoryRoomRepository::new());
    let message_pusher = Arc::new(WebSocketMessagePusher::new());

    // 2. UseCases
    let state = AppState::new(repository, message_pusher, Arc::new(SystemClock));

    // 3. Server
    let mut server = Server::new(state);
    if let Some(dir) = args.static_dir {
        server = server.with_static_dir(dir);
    }

    if let Err(e) = server.run(args.host, args.port).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
