//! The connection to the game server, abstracted.
//!
//! A [`Transport`] moves whole JSON frames in both directions. It does not
//! connect or reconnect: open it however the platform needs, then pass it to
//! `ScribbleClient::start`. Once it reports closed, the session stays closed.
//!
//! A test double only needs a queue on each side:
//!
//! ```rust,no_run
//! use std::collections::VecDeque;
//!
//! use async_trait::async_trait;
//! use scribble_client::{ScribbleError, Transport};
//!
//! struct Replay {
//!     frames: VecDeque<String>,
//!     sent: Vec<String>,
//! }
//!
//! #[async_trait]
//! impl Transport for Replay {
//!     async fn send(&mut self, frame: String) -> Result<(), ScribbleError> {
//!         self.sent.push(frame);
//!         Ok(())
//!     }
//!
//!     async fn recv(&mut self) -> Option<Result<String, ScribbleError>> {
//!         self.frames.pop_front().map(Ok)
//!     }
//!
//!     async fn close(&mut self) -> Result<(), ScribbleError> {
//!         Ok(())
//!     }
//! }
//! ```

use async_trait::async_trait;

use crate::error::ScribbleError;

/// Frame-oriented, bidirectional link to the game server.
///
/// [`recv`](Transport::recv) is polled in a `tokio::select!` next to timer
/// firings and local commands, so it **must** be cancel-safe: dropping an
/// unfinished `recv` future may not lose a frame.
#[async_trait]
pub trait Transport: Send + 'static {
    /// Send one frame.
    ///
    /// # Errors
    ///
    /// [`ScribbleError::TransportSend`] or [`ScribbleError::TransportClosed`].
    async fn send(&mut self, message: String) -> Result<(), ScribbleError>;

    /// Wait for the next frame.
    ///
    /// `None` means the server closed the connection; `Some(Err(_))` is a
    /// transport failure. Either ends the connection for the session.
    async fn recv(&mut self) -> Option<Result<String, ScribbleError>>;

    /// Close the connection. Must be safe to call more than once.
    ///
    /// # Errors
    ///
    /// The close handshake failed. Resources should be released regardless.
    async fn close(&mut self) -> Result<(), ScribbleError>;
}
