//! Server execution logic.

use std::{path::PathBuf, sync::Arc};

use axum::{Router, routing::get};
use tokio::net::TcpListener;
use tower_http::{services::ServeDir, trace::TraceLayer};

use super::{
    handler::{get_room_detail, get_rooms, health_check, websocket_handler},
    signal::shutdown_signal,
    state::AppState,
};

/// Signaling relay server
///
/// # Example
///
/// ```ignore
/// let state = AppState::new(repository, message_pusher, Arc::new(SystemClock));
/// Server::new(state).run("127.0.0.1".to_string(), 3000).await?;
/// ```
pub struct Server {
    state: Arc<AppState>,
    /// Directory served for every path that is not a route
    static_dir: Option<PathBuf>,
}

impl Server {
    pub fn new(state: AppState) -> Self {
        Self {
            state: Arc::new(state),
            static_dir: None,
        }
    }

    /// Serve static files (e.g. a browser client) from `dir`
    pub fn with_static_dir(mut self, dir: PathBuf) -> Self {
        self.static_dir = Some(dir);
        self
    }

    /// Build the router
    pub fn router(&self) -> Router {
        let router = Router::new()
            // WebSocket エンドポイント
            .route("/ws", get(websocket_handler))
            // HTTP エンドポイント
            .route("/api/health", get(health_check))
            .route("/api/rooms", get(get_rooms))
            .route("/api/rooms/{room_id}", get(get_room_detail))
            .with_state(self.state.clone());

        let router = match &self.static_dir {
            Some(dir) => router.fallback_service(ServeDir::new(dir)),
            None => router,
        };

        router.layer(TraceLayer::new_for_http())
    }

    /// Serve on an already bound listener until a shutdown signal arrives
    pub async fn serve(self, listener: TcpListener) -> std::io::Result<()> {
        let local_addr = listener.local_addr()?;
        tracing::info!("Signaling relay listening on {}", local_addr);
        tracing::info!("Connect to: ws://{}/ws", local_addr);
        if let Some(dir) = &self.static_dir {
            tracing::info!("Serving static files from {}", dir.display());
        }
        tracing::info!("Press Ctrl+C to shutdown gracefully");

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }

    /// Bind to `host:port` and serve
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind to the specified address or
    /// if there's an error during server execution.
    pub async fn run(self, host: String, port: u16) -> std::io::Result<()> {
        let bind_addr = format!("{}:{}", host, port);
        let listener = TcpListener::bind(&bind_addr).await?;
        self.serve(listener).await
    }
}
