//! Message formatting utilities for client display.

use rendezvous_shared::time::timestamp_to_jst_rfc3339;

use crate::agent::AgentStatus;

const RULE: &str = "============================================================";

/// Message formatter for client display
pub struct MessageFormatter;

impl MessageFormatter {
    /// Format a status snapshot of the agent
    ///
    /// # Arguments
    ///
    /// * `status` - Snapshot returned by the agent
    ///
    /// # Returns
    ///
    /// A framed, multi-line summary of the call
    pub fn format_status(status: &AgentStatus) -> String {
        let tracks = if status.remote_tracks.is_empty() {
            "(none)".to_string()
        } else {
            status
                .remote_tracks
                .iter()
                .map(|t| t.kind.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        };

        let mut output = String::new();
        output.push_str(&format!("\n{}\n", RULE));
        output.push_str(&format!("State:         {}\n", status.state));
        output.push_str(&format!(
            "Peer ID:       {}\n",
            status.local_peer.as_deref().unwrap_or("(not assigned)")
        ));
        output.push_str(&format!(
            "Room:          {}\n",
            status.room_id.as_deref().unwrap_or("(none)")
        ));
        output.push_str(&format!(
            "Remote peer:   {}\n",
            status.remote_peer.as_deref().unwrap_or("(none)")
        ));
        output.push_str(&format!("Remote tracks: {}\n", tracks));
        output.push_str(RULE);
        output.push('\n');
        output
    }

    /// Format a status line reported by the agent
    ///
    /// # Arguments
    ///
    /// * `line` - The status text
    /// * `at` - Unix timestamp of the report (milliseconds)
    pub fn format_event(line: &str, at: i64) -> String {
        format!("\n[{}] {}\n", timestamp_to_jst_rfc3339(at), line)
    }

    pub fn format_error(message: &str) -> String {
        format!("\n! {}\n", message)
    }

    pub fn format_help() -> String {
        let mut output = String::new();
        output.push_str("\nCommands:\n");
        output.push_str("  start <room-id>   acquire media and wait in the room for a peer\n");
        output.push_str("  join <room-id>    same as start\n");
        output.push_str("  end               hang up and leave the room\n");
        output.push_str("  status            show the current call\n");
        output.push_str("  help              show this list\n");
        output.push_str("  quit              end the call and exit\n");
        output
    }
}
