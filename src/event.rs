//! Events emitted by the client to the embedding application.

use serde_json::Value;

/// Everything the session hands to collaborators outside the rendering path.
///
/// Drawing and chat frames are forwarded exactly as they arrived, `type` tag
/// included; the session never interprets them.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    /// The session loop started with an open transport.
    Connected,
    /// Frame for the canvas collaborator (`drawing`, `clear_canvas`).
    Canvas(Value),
    /// Frame for the chat collaborator (`guess`, `chat_message`,
    /// `player_joined`, `player_left`).
    Chat(Value),
    /// The transport closed. Always the last transport-related event.
    Disconnected {
        /// Why the connection ended, if known.
        reason: Option<String>,
    },
}
