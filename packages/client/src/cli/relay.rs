//! Wiring between a relay WebSocket and a negotiation agent.

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use rendezvous_shared::protocol::{ClientMessage, ServerMessage};
use tokio::{sync::mpsc, task::JoinHandle};
use tokio_tungstenite::{
    connect_async,
    tungstenite::{self, protocol::Message},
};

use crate::{
    agent::{AgentHandle, ChannelSignalSink, MediaDevices, NegotiationAgent, PeerConnectionFactory},
    error::ClientError,
};

/// A running agent attached to one relay connection.
///
/// The read and write tasks finish with `true` when the connection was lost.
pub struct RelayLink {
    pub handle: AgentHandle,
    pub agent_task: JoinHandle<()>,
    pub read_task: JoinHandle<bool>,
    pub write_task: JoinHandle<bool>,
}

impl RelayLink {
    /// Connect to the relay and start an agent on the connection
    pub async fn connect<F>(
        url: &str,
        media: Arc<dyn MediaDevices>,
        factory: Arc<dyn PeerConnectionFactory>,
        on_status: F,
    ) -> Result<Self, ClientError>
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        let (ws_stream, _response) = connect_async(url).await.map_err(|e| match e {
            tungstenite::Error::Url(_) | tungstenite::Error::HttpFormat(_) => {
                ClientError::InvalidUrl(url.to_string())
            }
            e => ClientError::ConnectionError(e.to_string()),
        })?;
        tracing::info!("Connected to relay at {}", url);

        let (mut write, mut read) = ws_stream.split();

        // The agent's outbound messages go through this channel to the socket
        let (signal_tx, mut signal_rx) = mpsc::unbounded_channel::<ClientMessage>();
        let (agent, handle) =
            NegotiationAgent::new(media, factory, Arc::new(ChannelSignalSink::new(signal_tx)));
        let agent_task = tokio::spawn(agent.with_status(on_status).run());

        // Spawn a task to hand incoming messages to the agent
        let reader_handle = handle.clone();
        let read_task = tokio::spawn(async move {
            while let Some(message) = read.next().await {
                match message {
                    Ok(Message::Text(text)) => match serde_json::from_str::<ServerMessage>(&text) {
                        Ok(message) => {
                            if !reader_handle.deliver(message) {
                                return false;
                            }
                        }
                        Err(e) => tracing::warn!("Ignoring unrecognized relay message: {}", e),
                    },
                    Ok(Message::Close(_)) => {
                        tracing::info!("Server closed the connection");
                        return true;
                    }
                    Err(e) => {
                        tracing::warn!("WebSocket read error: {}", e);
                        return true;
                    }
                    _ => {}
                }
            }
            // Stream ended without a close frame
            true
        });

        // Spawn a task to write the agent's messages to the socket
        let write_task = tokio::spawn(async move {
            while let Some(message) = signal_rx.recv().await {
                let json = match serde_json::to_string(&message) {
                    Ok(json) => json,
                    Err(e) => {
                        tracing::error!("Failed to serialize message: {}", e);
                        continue;
                    }
                };

                if let Err(e) = write.send(Message::Text(json.into())).await {
                    tracing::warn!("Failed to send message: {}", e);
                    return true;
                }
            }
            // The agent has stopped
            let _ = write.close().await;
            false
        });

        Ok(Self {
            handle,
            agent_task,
            read_task,
            write_task,
        })
    }

    /// Stop the agent, wait for its last messages to be written, then drop the connection
    pub async fn close(self) {
        self.handle.shutdown();
        let _ = self.agent_task.await;
        let _ = self.write_task.await;
        self.read_task.abort();
    }
}
