//! # Scribble Client
//!
//! Client-side engine for a multiplayer drawing-and-guessing game.
//!
//! The crate classifies inbound server frames, routes drawing and chat frames
//! to the embedding application, and drives the game's own control flow:
//! turn and pre-game countdowns, word-choice prompts, scoreboards and the
//! auto-hiding overlays that go with them.
//!
//! ## Features
//!
//! - **Transport-agnostic**: implement the [`Transport`] trait for any backend
//! - **Render-agnostic**: all output goes through the [`Renderer`] trait
//! - **WebSocket built-in**: the default `transport-websocket` feature provides `WebSocketTransport`
//! - **Serialized**: frames, timer firings and local commands are applied one at a time
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use scribble_client::{ClientEvent, ScribbleClient, ScribbleConfig, TracingRenderer, WebSocketTransport};
//!
//! let transport = WebSocketTransport::connect("ws://localhost:8000/ws").await?;
//! let (client, mut events) =
//!     ScribbleClient::start(transport, TracingRenderer, ScribbleConfig::new("alice"));
//!
//! while let Some(event) = events.recv().await {
//!     if let ClientEvent::Disconnected { .. } = event {
//!         break;
//!     }
//! }
//! ```

pub mod client;
pub mod error;
pub mod event;
pub mod gateway;
pub mod protocol;
pub mod render;
pub mod session;
pub mod state;
pub mod surface;
pub mod timer;
pub mod transport;
pub mod transports;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod test_support;

// Re-export primary types for ergonomic imports.
pub use client::{ScribbleClient, ScribbleConfig};
pub use error::ScribbleError;
pub use event::ClientEvent;
pub use gateway::ConnectionState;
pub use protocol::{ClientMessage, InboundFrame, ScoreEntry, ServerEvent};
pub use render::{ListItem, Region, Renderer, TracingRenderer};
pub use session::Session;
pub use state::SessionSnapshot;
pub use surface::Surface;
pub use transport::Transport;

#[cfg(feature = "transport-websocket")]
pub use transports::WebSocketTransport;
