//! Domain logic for client-side operations.
//!
//! This module contains pure functions that implement business logic
//! without side effects, making them easy to test.

use thiserror::Error;

use crate::{agent::Command, error::ClientError};

/// One line typed at the prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Command(Command),
    Status,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("Nothing to do")]
    Empty,

    #[error("Unknown command '{0}'. Type 'help' for the list of commands")]
    Unknown(String),
}

/// Check if the client should exit immediately based on the error type.
///
/// # Arguments
///
/// * `error` - The client error to check
///
/// # Returns
///
/// `true` if the error requires immediate exit (e.g., InvalidUrl),
/// `false` otherwise
pub fn should_exit_immediately(error: &ClientError) -> bool {
    matches!(error, ClientError::InvalidUrl(_))
}

/// Check if the client should attempt to reconnect.
///
/// # Arguments
///
/// * `error` - The client error that occurred
/// * `current_attempt` - The current reconnection attempt count (0-indexed)
/// * `max_attempts` - The maximum number of reconnection attempts allowed
///
/// # Returns
///
/// `true` if reconnection should be attempted, `false` otherwise
pub fn should_attempt_reconnect(
    error: &ClientError,
    current_attempt: u32,
    max_attempts: u32,
) -> bool {
    // Don't reconnect if the error requires immediate exit
    if should_exit_immediately(error) {
        return false;
    }

    // Don't reconnect if we've exhausted all attempts
    current_attempt < max_attempts
}

/// Parse a prompt line.
///
/// A missing room ID is passed through as an empty one so the agent
/// reports it the same way as any other invalid room.
pub fn parse_input(line: &str) -> Result<Input, InputError> {
    let mut words = line.split_whitespace();
    let Some(keyword) = words.next() else {
        return Err(InputError::Empty);
    };
    let room_id = words.next().unwrap_or_default().to_string();

    match keyword.to_ascii_lowercase().as_str() {
        "start" | "call" => Ok(Input::Command(Command::StartCall(room_id))),
        "join" => Ok(Input::Command(Command::JoinCall(room_id))),
        "end" | "hangup" => Ok(Input::Command(Command::EndCall)),
        "status" => Ok(Input::Status),
        "help" | "?" => Ok(Input::Help),
        "quit" | "exit" => Ok(Input::Quit),
        _ => Err(InputError::Unknown(keyword.to_string())),
    }
}
