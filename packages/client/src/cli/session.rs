//! One connection to the relay, with the agent and the prompt attached.

use std::{sync::Arc, time::Duration};

use rendezvous_shared::time::get_jst_timestamp;
use rustyline::{DefaultEditor, error::ReadlineError};
use tokio::sync::mpsc;

use crate::{
    agent::{AgentHandle, MediaDevices, PeerConnectionFactory},
    error::ClientError,
};

use super::{
    domain::{Input, InputError, parse_input},
    formatter::MessageFormatter,
    relay::RelayLink,
    ui::{PROMPT, redisplay_prompt},
};

/// How long a quitting client waits for its leave-room to be written
const FLUSH_TIMEOUT: Duration = Duration::from_secs(2);

/// Everything a session needs besides the socket
#[derive(Clone)]
pub struct ClientConfig {
    /// Relay WebSocket endpoint, e.g. `ws://127.0.0.1:3000/ws`
    pub url: String,
    /// Room joined as soon as the session starts
    pub room: Option<String>,
    pub media: Arc<dyn MediaDevices>,
    pub factory: Arc<dyn PeerConnectionFactory>,
}

/// Run the WebSocket client session.
///
/// Returns `Ok` when the user quits and `Err` when the connection is lost.
pub async fn run_client_session(config: &ClientConfig) -> Result<(), ClientError> {
    let RelayLink {
        handle,
        agent_task,
        mut read_task,
        mut write_task,
    } = RelayLink::connect(
        &config.url,
        config.media.clone(),
        config.factory.clone(),
        |line| {
            print!("{}", MessageFormatter::format_event(line, get_jst_timestamp()));
            redisplay_prompt();
        },
    )
    .await?;

    println!("\nType 'help' for the list of commands. Press Ctrl+C to exit.\n");

    let (input_tx, input_rx) = mpsc::unbounded_channel::<String>();

    // Spawn a blocking thread for rustyline (synchronous readline)
    let _readline_handle = std::thread::spawn(move || {
        let mut rl = match DefaultEditor::new() {
            Ok(rl) => rl,
            Err(e) => {
                eprintln!("Failed to initialize readline: {}", e);
                return;
            }
        };

        loop {
            match rl.readline(PROMPT) {
                Ok(line) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    rl.add_history_entry(line).ok();
                    let quit = parse_input(line) == Ok(Input::Quit);
                    if input_tx.send(line.to_string()).is_err() || quit {
                        break;
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    // Ctrl+C
                    tracing::info!("Interrupted");
                    break;
                }
                Err(ReadlineError::Eof) => {
                    // Ctrl+D
                    tracing::info!("EOF");
                    break;
                }
                Err(err) => {
                    tracing::error!("Readline error: {}", err);
                    break;
                }
            }
        }
    });

    let mut command_task = tokio::spawn(run_commands(
        handle.clone(),
        config.room.clone(),
        input_rx,
    ));

    // If any one of the tasks completes, stop the others
    let result = tokio::select! {
        read_result = &mut read_task => {
            command_task.abort();
            write_task.abort();
            connection_result(read_result.unwrap_or(true))
        }
        write_result = &mut write_task => {
            command_task.abort();
            read_task.abort();
            connection_result(write_result.unwrap_or(true))
        }
        _ = &mut command_task => {
            // The user quit: end the call and let leave-room reach the relay
            handle.shutdown();
            let _ = agent_task.await;
            if tokio::time::timeout(FLUSH_TIMEOUT, &mut write_task).await.is_err() {
                tracing::warn!("Timed out sending the last messages");
            }
            write_task.abort();
            read_task.abort();
            return Ok(());
        }
    };

    handle.shutdown();
    result
}

fn connection_result(connection_error: bool) -> Result<(), ClientError> {
    if connection_error {
        Err(ClientError::ConnectionError("Connection lost".to_string()))
    } else {
        Ok(())
    }
}

/// Execute prompt lines until the user quits or the prompt closes
async fn run_commands(
    handle: AgentHandle,
    room: Option<String>,
    mut input_rx: mpsc::UnboundedReceiver<String>,
) {
    if let Some(room) = room
        && let Err(e) = handle.join_call(&room).await
    {
        print!("{}", MessageFormatter::format_error(&e.to_string()));
        redisplay_prompt();
    }

    while let Some(line) = input_rx.recv().await {
        match parse_input(&line) {
            Ok(Input::Quit) => break,
            Ok(Input::Help) => print!("{}", MessageFormatter::format_help()),
            Ok(Input::Status) => match handle.status().await {
                Ok(status) => print!("{}", MessageFormatter::format_status(&status)),
                Err(e) => print!("{}", MessageFormatter::format_error(&e.to_string())),
            },
            Ok(Input::Command(command)) => {
                if let Err(e) = handle.command(command).await {
                    print!("{}", MessageFormatter::format_error(&e.to_string()));
                }
            }
            Err(InputError::Empty) => {}
            Err(e) => print!("{}", MessageFormatter::format_error(&e.to_string())),
        }
        redisplay_prompt();
    }
}
