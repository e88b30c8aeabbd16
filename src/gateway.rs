//! Outbound gateway for local actions.
//!
//! Sends are at-most-once: an action is serialized and queued for the
//! transport only while the connection is open. Otherwise it is logged and
//! dropped. Nothing is buffered for later and nothing is retried.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use crate::protocol::ClientMessage;

/// Transport connection state as last observed by the session loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closed,
}

impl ConnectionState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Connecting,
            1 => Self::Open,
            _ => Self::Closed,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            Self::Connecting => 0,
            Self::Open => 1,
            Self::Closed => 2,
        }
    }
}

/// Shared, cloneable view of the [`ConnectionState`].
#[derive(Debug, Clone)]
pub struct ConnectionStatus(Arc<AtomicU8>);

impl ConnectionStatus {
    pub fn new() -> Self {
        Self(Arc::new(AtomicU8::new(ConnectionState::Connecting.as_u8())))
    }

    pub fn get(&self) -> ConnectionState {
        ConnectionState::from_u8(self.0.load(Ordering::Acquire))
    }

    pub fn set(&self, state: ConnectionState) {
        self.0.store(state.as_u8(), Ordering::Release);
    }

    pub fn is_open(&self) -> bool {
        self.get() == ConnectionState::Open
    }
}

impl Default for ConnectionStatus {
    fn default() -> Self {
        Self::new()
    }
}

/// Serializes [`ClientMessage`]s onto the transport's outbound queue.
#[derive(Debug)]
pub struct Gateway {
    status: ConnectionStatus,
    outbound_tx: mpsc::UnboundedSender<String>,
}

impl Gateway {
    /// Create a gateway and the queue the transport drains.
    pub fn new(status: ConnectionStatus) -> (Self, mpsc::UnboundedReceiver<String>) {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        (
            Self {
                status,
                outbound_tx,
            },
            outbound_rx,
        )
    }

    pub fn status(&self) -> &ConnectionStatus {
        &self.status
    }

    /// Hand `msg` to the transport if it is open.
    ///
    /// Returns `true` if the message was queued. Nothing is reported to the
    /// caller beyond that; a dropped action is only logged.
    pub fn send(&self, msg: &ClientMessage) -> bool {
        let state = self.status.get();
        if state != ConnectionState::Open {
            warn!(?state, ?msg, "transport not open, dropping outbound message");
            return false;
        }
        let json = match serde_json::to_string(msg) {
            Ok(json) => json,
            Err(e) => {
                error!("failed to serialize ClientMessage: {e}");
                return false;
            }
        };
        if self.outbound_tx.send(json).is_err() {
            warn!(?msg, "outbound queue closed, dropping outbound message");
            return false;
        }
        debug!(?msg, "queued outbound message");
        true
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use crate::test_support::capture_logs;

    fn word_chosen() -> ClientMessage {
        ClientMessage::WordChosen {
            word: "cat".into(),
            name: "alice".into(),
        }
    }

    #[test]
    fn open_transport_receives_serialized_message() {
        let status = ConnectionStatus::new();
        status.set(ConnectionState::Open);
        let (gateway, mut rx) = Gateway::new(status);

        assert!(gateway.send(&word_chosen()));
        let json = rx.try_recv().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["type"], "word_chosen");
        assert_eq!(value["word"], "cat");
        assert_eq!(value["name"], "alice");
    }

    #[test]
    fn closed_transport_drops_with_warning_and_no_retry() {
        let status = ConnectionStatus::new();
        status.set(ConnectionState::Closed);
        let (gateway, mut rx) = Gateway::new(status.clone());

        let (sent, logs) = capture_logs(|| gateway.send(&word_chosen()));
        assert!(!sent);
        assert!(logs.has("WARN", "dropping outbound message"));

        // Reopening later must not deliver the dropped action.
        status.set(ConnectionState::Open);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn connecting_transport_also_drops() {
        let (gateway, mut rx) = Gateway::new(ConnectionStatus::new());
        assert!(!gateway.send(&word_chosen()));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn status_is_shared_between_clones() {
        let status = ConnectionStatus::new();
        let other = status.clone();
        assert_eq!(other.get(), ConnectionState::Connecting);
        status.set(ConnectionState::Open);
        assert!(other.is_open());
        status.set(ConnectionState::Closed);
        assert_eq!(other.get(), ConnectionState::Closed);
    }
}
