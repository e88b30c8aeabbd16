//! Error types for the Scribble client.

use thiserror::Error;

/// Errors that can occur when using the Scribble client.
///
/// None of these are fatal to the session loop: inbound problems are logged and
/// the offending frame is dropped, outbound problems drop the action.
#[derive(Debug, Error)]
pub enum ScribbleError {
    /// Failed to send a message through the transport.
    #[error("transport send error: {0}")]
    TransportSend(String),

    /// Failed to receive a message from the transport.
    #[error("transport receive error: {0}")]
    TransportReceive(String),

    /// The transport connection was closed.
    #[error("transport connection closed")]
    TransportClosed,

    /// Failed to serialize or deserialize a protocol message.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An inbound frame had no usable `type` tag.
    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    /// The session loop has exited, so local actions can no longer be queued.
    #[error("not connected to server")]
    NotConnected,

    /// An operation timed out.
    #[error("operation timed out")]
    Timeout,

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized [`Result`] type for Scribble client operations.
pub type Result<T> = std::result::Result<T, ScribbleError>;
