//! UI utilities for the client.

use std::io::Write;

pub const PROMPT: &str = "rendezvous> ";

/// Redisplay the prompt after printing a message
pub fn redisplay_prompt() {
    print!("{}", PROMPT);
    std::io::stdout().flush().ok();
}
