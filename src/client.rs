//! Async client for the drawing-and-guessing game.
//!
//! [`ScribbleClient`] is a thin handle to a background session loop. The loop
//! is the only place game state changes: it multiplexes inbound transport
//! frames, timer firings and local commands through one `tokio::select!`, so
//! they are applied strictly one at a time and in arrival order.
//!
//! # Example
//!
//! ```rust,ignore
//! let transport = WebSocketTransport::connect("ws://localhost:8000/ws").await?;
//! let config = ScribbleConfig::new("alice");
//! let (client, mut events) = ScribbleClient::start(transport, TracingRenderer, config);
//!
//! while let Some(event) = events.recv().await {
//!     match event {
//!         ClientEvent::Canvas(frame) => canvas.apply(frame),
//!         ClientEvent::Chat(frame) => chat.push(frame),
//!         ClientEvent::Disconnected { .. } => break,
//!         _ => {}
//!     }
//! }
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, Mutex};
use tracing::{debug, error, warn};

use crate::error::{Result, ScribbleError};
use crate::event::ClientEvent;
use crate::gateway::{ConnectionState, ConnectionStatus, Gateway};
use crate::protocol::PlayerId;
use crate::render::Renderer;
use crate::session::Session;
use crate::state::SessionSnapshot;
use crate::timer::TimerFired;
use crate::transport::Transport;

/// Default capacity of the bounded event channel.
const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 256;

/// Default timeout for the graceful shutdown.
const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

/// Default countdown cadence.
const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Default time the final-stretch message stays up before the new-game banner hides.
const DEFAULT_FINAL_STRETCH_GRACE: Duration = Duration::from_secs(2);

const DEFAULT_FINAL_STRETCH_MESSAGE: &str = "Don't lose!";

// ── Configuration ───────────────────────────────────────────────────

/// Configuration for a [`ScribbleClient`] session.
///
/// The only required field is the local player's id.
///
/// # Example
///
/// ```
/// use scribble_client::client::ScribbleConfig;
/// use std::time::Duration;
///
/// let config = ScribbleConfig::new("alice")
///     .with_tick_interval(Duration::from_millis(500))
///     .with_final_stretch_message("Hurry!");
/// assert_eq!(config.local_player_id, "alice");
/// assert_eq!(config.final_stretch_message, "Hurry!");
/// ```
#[derive(Debug, Clone)]
pub struct ScribbleConfig {
    /// Identity of this client, as the server names players.
    pub local_player_id: PlayerId,
    /// Cadence of every countdown. Defaults to **1 second**.
    pub tick_interval: Duration,
    /// How long the final-stretch message shows before the new-game banner
    /// hides. Defaults to **2 seconds**.
    pub final_stretch_grace: Duration,
    /// Text shown when the pre-game countdown runs out.
    pub final_stretch_message: String,
    /// Capacity of the bounded event channel.
    ///
    /// Canvas and chat events that do not fit are dropped with a warning so
    /// the session loop never stalls. Defaults to **256**; values below 1 are
    /// clamped to 1.
    pub event_channel_capacity: usize,
    /// Time [`ScribbleClient::shutdown`] waits for the loop to close the
    /// transport before aborting it. Defaults to **1 second**.
    pub shutdown_timeout: Duration,
}

impl ScribbleConfig {
    /// Create a configuration for `local_player_id` with default values.
    pub fn new(local_player_id: impl Into<PlayerId>) -> Self {
        Self {
            local_player_id: local_player_id.into(),
            tick_interval: DEFAULT_TICK_INTERVAL,
            final_stretch_grace: DEFAULT_FINAL_STRETCH_GRACE,
            final_stretch_message: DEFAULT_FINAL_STRETCH_MESSAGE.to_string(),
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }

    /// Set the countdown cadence. Zero is clamped to one millisecond.
    #[must_use]
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval.max(Duration::from_millis(1));
        self
    }

    #[must_use]
    pub fn with_final_stretch_grace(mut self, grace: Duration) -> Self {
        self.final_stretch_grace = grace;
        self
    }

    #[must_use]
    pub fn with_final_stretch_message(mut self, message: impl Into<String>) -> Self {
        self.final_stretch_message = message.into();
        self
    }

    /// Set the capacity of the bounded event channel. Values below 1 are clamped to 1.
    #[must_use]
    pub fn with_event_channel_capacity(mut self, capacity: usize) -> Self {
        self.event_channel_capacity = capacity.max(1);
        self
    }

    #[must_use]
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }
}

// ── Shared state ────────────────────────────────────────────────────

/// State the session loop publishes for the handle to read.
struct ClientState {
    status: ConnectionStatus,
    snapshot: Mutex<SessionSnapshot>,
}

/// Local actions forwarded from the handle to the session loop.
#[derive(Debug)]
enum Command {
    ChooseWord(String),
}

// ── Client handle ───────────────────────────────────────────────────

/// Handle to a running game session.
///
/// Created via [`ScribbleClient::start`], which spawns the session loop and
/// returns this handle together with an event receiver.
pub struct ScribbleClient {
    cmd_tx: mpsc::UnboundedSender<Command>,
    state: Arc<ClientState>,
    task: Option<tokio::task::JoinHandle<()>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    shutdown_timeout: Duration,
}

impl ScribbleClient {
    /// Start the session loop over a connected `transport`.
    ///
    /// All rendering goes through `renderer`; drawing and chat frames plus
    /// connection lifecycle changes arrive on the returned receiver.
    #[must_use = "the event receiver must be used to receive events"]
    pub fn start<R: Renderer>(
        transport: impl Transport,
        renderer: R,
        config: ScribbleConfig,
    ) -> (Self, mpsc::Receiver<ClientEvent>) {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<Command>();
        let capacity = config.event_channel_capacity.max(1);
        let (event_tx, event_rx) = mpsc::channel::<ClientEvent>(capacity);
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let status = ConnectionStatus::new();
        let (gateway, outbound_rx) = Gateway::new(status.clone());
        let (session, timer_rx) = Session::new(&config, renderer, gateway, event_tx.clone());

        let state = Arc::new(ClientState {
            status,
            snapshot: Mutex::new(session.snapshot()),
        });

        let task = tokio::spawn(session_loop(
            transport,
            session,
            Queues {
                cmd_rx,
                timer_rx,
                outbound_rx,
                shutdown_rx,
            },
            event_tx,
            Arc::clone(&state),
        ));

        let client = Self {
            cmd_tx,
            state,
            task: Some(task),
            shutdown_tx: Some(shutdown_tx),
            shutdown_timeout: config.shutdown_timeout,
        };

        (client, event_rx)
    }

    // ── Public API methods ──────────────────────────────────────────

    /// Pick `word` from the open word-choice prompt.
    ///
    /// The pick is applied by the session loop. It is ignored if the prompt
    /// has closed in the meantime, and the resulting `word_chosen` message is
    /// dropped (never retried) if the transport is not open.
    ///
    /// # Errors
    ///
    /// Returns [`ScribbleError::NotConnected`] if the session loop has exited.
    pub fn choose_word(&self, word: impl Into<String>) -> Result<()> {
        self.cmd_tx
            .send(Command::ChooseWord(word.into()))
            .map_err(|_| ScribbleError::NotConnected)
    }

    /// Stop the session loop, closing the transport.
    ///
    /// After calling this method, the event receiver yields `None` once the
    /// loop exits.
    pub async fn shutdown(&mut self) {
        debug!("ScribbleClient: shutdown requested");

        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        if let Some(mut task) = self.task.take() {
            match tokio::time::timeout(self.shutdown_timeout, &mut task).await {
                Ok(Ok(())) => {}
                Ok(Err(join_err)) => {
                    warn!("session loop terminated with join error: {join_err}");
                }
                Err(_) => {
                    warn!("session loop did not exit within timeout; aborting task");
                    task.abort();
                    if let Err(join_err) = task.await {
                        debug!("session loop aborted: {join_err}");
                    }
                }
            }
        }

        self.state.status.set(ConnectionState::Closed);
    }

    // ── State accessors ─────────────────────────────────────────────

    pub fn connection_state(&self) -> ConnectionState {
        self.state.status.get()
    }

    /// Returns `true` if the transport is believed to be open.
    pub fn is_connected(&self) -> bool {
        self.state.status.is_open()
    }

    /// Session state as of the last input the loop processed.
    pub async fn snapshot(&self) -> SessionSnapshot {
        self.state.snapshot.lock().await.clone()
    }

    /// The player currently drawing, if any.
    pub async fn current_drawer(&self) -> Option<PlayerId> {
        let snapshot = self.state.snapshot.lock().await;
        (!snapshot.drawer.is_empty()).then(|| snapshot.drawer.clone())
    }

    pub async fn current_turn(&self) -> Option<u32> {
        self.state.snapshot.lock().await.turn
    }
}

impl std::fmt::Debug for ScribbleClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScribbleClient")
            .field("connection", &self.connection_state())
            .field("has_task", &self.task.is_some())
            .finish()
    }
}

impl Drop for ScribbleClient {
    fn drop(&mut self) {
        // No executor to drive a graceful close from `Drop`; abort instead.
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

// ── Session loop ────────────────────────────────────────────────────

/// Receivers the session loop drains.
struct Queues {
    cmd_rx: mpsc::UnboundedReceiver<Command>,
    timer_rx: mpsc::UnboundedReceiver<TimerFired>,
    outbound_rx: mpsc::UnboundedReceiver<String>,
    shutdown_rx: oneshot::Receiver<()>,
}

/// Background loop that owns the session and the transport.
///
/// The transport branches are disabled once the connection ends, but timers
/// and local commands keep being serviced until shutdown or until the handle
/// is dropped. `Disconnected` is parked until the event channel has room, so
/// a slow consumer never stalls the countdowns.
async fn session_loop<R: Renderer>(
    mut transport: impl Transport,
    mut session: Session<R>,
    mut queues: Queues,
    event_tx: mpsc::Sender<ClientEvent>,
    state: Arc<ClientState>,
) {
    debug!("session loop started");
    state.status.set(ConnectionState::Open);
    emit_event(&event_tx, ClientEvent::Connected);
    let mut transport_open = true;
    let mut pending_disconnect: Option<ClientEvent> = None;

    loop {
        tokio::select! {
            cmd = queues.cmd_rx.recv() => {
                match cmd {
                    Some(Command::ChooseWord(word)) => {
                        session.choose_word(&word);
                    }
                    None => {
                        debug!("command channel closed, stopping session loop");
                        break;
                    }
                }
            }

            _ = &mut queues.shutdown_rx => {
                debug!("shutdown signal received");
                break;
            }

            Some(fired) = queues.timer_rx.recv() => {
                session.on_timer(fired);
            }

            permit = event_tx.reserve(), if pending_disconnect.is_some() => {
                match permit {
                    Ok(permit) => {
                        if let Some(event) = pending_disconnect.take() {
                            permit.send(event);
                        }
                    }
                    Err(_) => {
                        debug!("event channel closed, receiver dropped");
                        pending_disconnect = None;
                    }
                }
            }

            Some(json) = queues.outbound_rx.recv(), if transport_open => {
                if let Err(e) = transport.send(json).await {
                    error!("transport send error: {e}");
                    transport_open = false;
                    pending_disconnect = Some(mark_disconnected(&state, Some(format!("transport send error: {e}"))));
                }
            }

            incoming = transport.recv(), if transport_open => {
                match incoming {
                    Some(Ok(text)) => session.route(text.as_bytes()),
                    Some(Err(e)) => {
                        error!("transport receive error: {e}");
                        transport_open = false;
                        pending_disconnect = Some(mark_disconnected(&state, Some(format!("transport receive error: {e}"))));
                    }
                    None => {
                        debug!("transport closed by server");
                        transport_open = false;
                        pending_disconnect = Some(mark_disconnected(&state, None));
                    }
                }
            }
        }

        *state.snapshot.lock().await = session.snapshot();
    }

    if transport_open {
        let _ = transport.close().await;
        pending_disconnect = Some(mark_disconnected(&state, Some("client shut down".into())));
    }
    // The loop is exiting, so waiting here only delays shutdown, which is
    // bounded by the shutdown timeout.
    if let Some(event) = pending_disconnect {
        if event_tx.send(event).await.is_err() {
            debug!("event channel closed, receiver dropped");
        }
    }

    debug!("session loop exited");
}

/// Emit an event without blocking the loop. A full channel drops the event.
pub(crate) fn emit_event(event_tx: &mpsc::Sender<ClientEvent>, event: ClientEvent) {
    match event_tx.try_send(event) {
        Ok(()) => {}
        Err(mpsc::error::TrySendError::Full(dropped)) => {
            warn!("event channel full, dropping event: {dropped:?}");
        }
        Err(mpsc::error::TrySendError::Closed(_)) => {
            debug!("event channel closed, receiver dropped");
        }
    }
}

/// Mark the connection closed and build the [`ClientEvent::Disconnected`]
/// that must eventually be delivered. It is never dropped for a full channel.
fn mark_disconnected(state: &ClientState, reason: Option<String>) -> ClientEvent {
    state.status.set(ConnectionState::Closed);
    ClientEvent::Disconnected { reason }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use crate::render::TracingRenderer;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[test]
    fn config_defaults() {
        let config = ScribbleConfig::new("alice");
        assert_eq!(config.local_player_id, "alice");
        assert_eq!(config.tick_interval, Duration::from_secs(1));
        assert_eq!(config.final_stretch_grace, Duration::from_secs(2));
        assert_eq!(config.final_stretch_message, "Don't lose!");
        assert_eq!(config.event_channel_capacity, 256);
        assert_eq!(config.shutdown_timeout, Duration::from_secs(1));
    }

    #[test]
    fn config_builder_clamps() {
        let config = ScribbleConfig::new("alice")
            .with_event_channel_capacity(0)
            .with_tick_interval(Duration::ZERO);
        assert_eq!(config.event_channel_capacity, 1);
        assert_eq!(config.tick_interval, Duration::from_millis(1));
    }

    /// Transport that never delivers anything and hangs forever in `close()`.
    struct HangingCloseTransport {
        close_called: Arc<AtomicBool>,
        dropped: Arc<AtomicBool>,
    }

    impl Drop for HangingCloseTransport {
        fn drop(&mut self) {
            self.dropped.store(true, Ordering::Release);
        }
    }

    #[async_trait]
    impl Transport for HangingCloseTransport {
        async fn send(&mut self, _message: String) -> std::result::Result<(), ScribbleError> {
            Ok(())
        }

        async fn recv(&mut self) -> Option<std::result::Result<String, ScribbleError>> {
            std::future::pending().await
        }

        async fn close(&mut self) -> std::result::Result<(), ScribbleError> {
            self.close_called.store(true, Ordering::Release);
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn shutdown_timeout_aborts_stuck_session_loop() {
        let close_called = Arc::new(AtomicBool::new(false));
        let dropped = Arc::new(AtomicBool::new(false));
        let transport = HangingCloseTransport {
            close_called: Arc::clone(&close_called),
            dropped: Arc::clone(&dropped),
        };
        let config = ScribbleConfig::new("alice").with_shutdown_timeout(Duration::from_millis(20));
        let (mut client, mut events) = ScribbleClient::start(transport, TracingRenderer, config);

        assert_eq!(events.recv().await.unwrap(), ClientEvent::Connected);
        assert!(client.is_connected());

        client.shutdown().await;

        assert!(close_called.load(Ordering::Acquire));
        assert!(dropped.load(Ordering::Acquire));
        assert_eq!(client.connection_state(), ConnectionState::Closed);
    }

    #[tokio::test]
    async fn choose_word_after_shutdown_is_not_connected() {
        let transport = HangingCloseTransport {
            close_called: Arc::new(AtomicBool::new(false)),
            dropped: Arc::new(AtomicBool::new(false)),
        };
        let config = ScribbleConfig::new("alice").with_shutdown_timeout(Duration::from_millis(20));
        let (mut client, _events) = ScribbleClient::start(transport, TracingRenderer, config);
        client.shutdown().await;

        assert!(matches!(
            client.choose_word("cat"),
            Err(ScribbleError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn debug_impl_for_client() {
        let transport = HangingCloseTransport {
            close_called: Arc::new(AtomicBool::new(false)),
            dropped: Arc::new(AtomicBool::new(false)),
        };
        let config = ScribbleConfig::new("alice").with_shutdown_timeout(Duration::from_millis(20));
        let (mut client, _events) = ScribbleClient::start(transport, TracingRenderer, config);

        let debug_str = format!("{client:?}");
        assert!(debug_str.contains("ScribbleClient"));
        assert!(debug_str.contains("connection"));

        client.shutdown().await;
    }
}
