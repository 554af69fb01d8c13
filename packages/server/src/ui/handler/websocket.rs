//! WebSocket connection handlers.

use std::sync::Arc;

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures_util::{sink::SinkExt, stream::StreamExt};
use rendezvous_shared::protocol::{ClientMessage, ServerMessage};
use tokio::sync::mpsc;

use crate::{
    domain::{ConnectionId, RoomId},
    ui::state::AppState,
    usecase::encode,
};

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Spawns a task that receives messages from the rx channel and pushes them to the WebSocket sender.
///
/// Every frame addressed to this connection goes through this single task, so
/// frames from one sender arrive in the order they were pushed.
fn pusher_loop(
    mut rx: mpsc::UnboundedReceiver<String>,
    mut sender: futures_util::stream::SplitSink<WebSocket, Message>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(Message::Text(msg.into())).await.is_err() {
                break;
            }
        }
        let _ = sender.close().await;
    })
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (sender, mut receiver) = socket.split();

    // Create a channel for this connection to receive messages
    let (tx, rx) = mpsc::unbounded_channel();
    let reply = tx.clone();

    // Assign an identifier and send `welcome`
    let connection_id = match state.connect_participant_usecase.execute(tx).await {
        Ok((connection_id, _)) => connection_id,
        Err(e) => {
            tracing::error!("Failed to register connection: {}", e);
            return;
        }
    };
    tracing::info!("Connection '{}' opened", connection_id);

    let state_clone = state.clone();
    let connection_id_clone = connection_id.clone();

    // Spawn a task to receive messages from this client
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            let msg = match msg {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::warn!("WebSocket error on '{}': {}", connection_id_clone, e);
                    break;
                }
            };

            match msg {
                Message::Text(text) => {
                    tracing::trace!("Received from '{}': {}", connection_id_clone, text);
                    if let Err(message) = dispatch(&state_clone, &connection_id_clone, &text).await
                    {
                        tracing::warn!("Rejected frame from '{}': {}", connection_id_clone, message);
                        if let Some(json) = encode(&ServerMessage::Error { message }) {
                            let _ = reply.send(json);
                        }
                    }
                }
                Message::Binary(_) => {
                    tracing::warn!("Ignoring binary frame from '{}'", connection_id_clone);
                }
                Message::Close(_) => {
                    tracing::debug!("Client '{}' requested close", connection_id_clone);
                    break;
                }
                // Ping/pong is handled automatically by the WebSocket protocol
                _ => {}
            }
        }
    });

    // Spawn a task to send messages addressed to this client
    let mut send_task = pusher_loop(rx, sender);

    // If any one of the tasks completes, abort the other
    tokio::select! {
        _ = &mut recv_task => send_task.abort(),
        _ = &mut send_task => recv_task.abort(),
    };

    match state
        .disconnect_participant_usecase
        .execute(&connection_id)
        .await
    {
        Ok(notified) => {
            tracing::info!(
                "Connection '{}' closed, notified {} peer(s)",
                connection_id,
                notified.len()
            );
        }
        Err(e) => {
            tracing::warn!("Failed to disconnect '{}': {}", connection_id, e);
        }
    }
}

/// Route one inbound frame to its UseCase.
///
/// Returns a message for the sender when the frame is rejected.
async fn dispatch(state: &AppState, from: &ConnectionId, text: &str) -> Result<(), String> {
    let message = serde_json::from_str::<ClientMessage>(text)
        .map_err(|e| format!("Malformed message: {}", e))?;

    match message {
        ClientMessage::JoinRoom { room_id } => {
            let room_id = RoomId::try_from(room_id).map_err(|e| e.to_string())?;
            state
                .join_room_usecase
                .execute(from, room_id)
                .await
                .map_err(|e| e.to_string())?;
        }
        ClientMessage::LeaveRoom { room_id } => {
            let room_id = RoomId::try_from(room_id).map_err(|e| e.to_string())?;
            state
                .leave_room_usecase
                .execute(from, &room_id)
                .await
                .map_err(|e| e.to_string())?;
        }
        signal => {
            if let Some((kind, to, payload)) = signal.into_signal() {
                state
                    .relay_signal_usecase
                    .execute(from, kind, to, payload)
                    .await;
            }
        }
    }

    Ok(())
}
