#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing,
    dead_code
)]
//! Shared test utilities for the scribble client integration tests.
//!
//! Provides a channel-driven [`MockTransport`], a [`RecordingRenderer`] whose
//! output stays inspectable after the session loop takes ownership of it,
//! and helpers for building server frames.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use async_trait::async_trait;
use scribble_client::protocol::{ScoreEntry, ServerEvent};
use scribble_client::{ListItem, Region, Renderer, ScribbleError, Surface, Transport};
use tokio::sync::mpsc;

type Incoming = Option<Result<String, ScribbleError>>;

// ── MockTransport ───────────────────────────────────────────────────

/// Transport whose inbound side is fed by a [`ServerScript`].
///
/// Once the script handle is dropped, `recv` hangs so the session loop stays
/// alive until shutdown.
pub struct MockTransport {
    incoming: mpsc::UnboundedReceiver<Incoming>,
    sent: Arc<StdMutex<Vec<String>>>,
    closed: Arc<AtomicBool>,
}

/// Test-side handle that plays the server.
#[derive(Clone)]
pub struct ServerScript {
    tx: mpsc::UnboundedSender<Incoming>,
    sent: Arc<StdMutex<Vec<String>>>,
    closed: Arc<AtomicBool>,
}

impl MockTransport {
    pub fn new() -> (Self, ServerScript) {
        let (tx, incoming) = mpsc::unbounded_channel();
        let sent = Arc::new(StdMutex::new(Vec::new()));
        let closed = Arc::new(AtomicBool::new(false));
        let transport = Self {
            incoming,
            sent: Arc::clone(&sent),
            closed: Arc::clone(&closed),
        };
        (transport, ServerScript { tx, sent, closed })
    }
}

impl ServerScript {
    /// Deliver one text frame.
    pub fn push(&self, frame: impl Into<String>) {
        let _ = self.tx.send(Some(Ok(frame.into())));
    }

    /// End the stream as if the server closed the connection.
    pub fn hang_up(&self) {
        let _ = self.tx.send(None);
    }

    /// Fail the next `recv` with a transport error.
    pub fn fail(&self, reason: &str) {
        let _ = self
            .tx
            .send(Some(Err(ScribbleError::TransportReceive(reason.into()))));
    }

    /// Frames the client has sent, parsed as JSON.
    pub fn sent(&self) -> Vec<serde_json::Value> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|raw| serde_json::from_str(raw).unwrap())
            .collect()
    }

    pub fn was_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&mut self, message: String) -> Result<(), ScribbleError> {
        self.sent.lock().unwrap().push(message);
        Ok(())
    }

    async fn recv(&mut self) -> Option<Result<String, ScribbleError>> {
        match self.incoming.recv().await {
            Some(item) => item,
            None => std::future::pending().await,
        }
    }

    async fn close(&mut self) -> Result<(), ScribbleError> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}

// ── RecordingRenderer ───────────────────────────────────────────────

/// Everything a [`RecordingRenderer`] has been told.
#[derive(Debug, Default)]
pub struct Screen {
    pub texts: HashMap<Region, String>,
    pub lists: HashMap<Region, Vec<ListItem>>,
    pub shown: HashSet<Surface>,
    pub history: Vec<(Region, String)>,
    pub hides: Vec<Surface>,
}

/// Renderer that records into a shared [`Screen`].
#[derive(Debug, Clone, Default)]
pub struct RecordingRenderer {
    screen: Arc<StdMutex<Screen>>,
    bare: bool,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A renderer that has no surfaces at all.
    pub fn bare() -> Self {
        Self {
            bare: true,
            ..Self::default()
        }
    }

    pub fn text(&self, region: Region) -> Option<String> {
        self.screen.lock().unwrap().texts.get(&region).cloned()
    }

    /// Every text ever written to `region`, oldest first.
    pub fn history_of(&self, region: Region) -> Vec<String> {
        self.screen
            .lock()
            .unwrap()
            .history
            .iter()
            .filter(|(r, _)| *r == region)
            .map(|(_, text)| text.clone())
            .collect()
    }

    pub fn list(&self, region: Region) -> Vec<ListItem> {
        self.screen
            .lock()
            .unwrap()
            .lists
            .get(&region)
            .cloned()
            .unwrap_or_default()
    }

    pub fn list_texts(&self, region: Region) -> Vec<String> {
        self.list(region).into_iter().map(|item| item.text).collect()
    }

    pub fn is_shown(&self, surface: Surface) -> bool {
        self.screen.lock().unwrap().shown.contains(&surface)
    }

    pub fn hide_count(&self) -> usize {
        self.screen.lock().unwrap().hides.len()
    }
}

impl Renderer for RecordingRenderer {
    fn set_text(&mut self, region: Region, text: &str) {
        let mut screen = self.screen.lock().unwrap();
        screen.texts.insert(region, text.to_string());
        screen.history.push((region, text.to_string()));
    }

    fn set_list(&mut self, region: Region, items: &[ListItem]) {
        self.screen
            .lock()
            .unwrap()
            .lists
            .insert(region, items.to_vec());
    }

    fn show(&mut self, surface: Surface) {
        if !self.bare {
            self.screen.lock().unwrap().shown.insert(surface);
        }
    }

    fn hide(&mut self, surface: Surface) {
        if !self.bare {
            let mut screen = self.screen.lock().unwrap();
            screen.shown.remove(&surface);
            screen.hides.push(surface);
        }
    }

    fn has_surface(&self, _surface: Surface) -> bool {
        !self.bare
    }
}

// ── Log capture ─────────────────────────────────────────────────────

/// Formatted log output of everything run while a [`LogCapture`] guard lives.
///
/// The guard is thread-local, which covers the session loop because
/// `#[tokio::test]` runs spawned tasks on the test thread.
#[derive(Clone, Default)]
pub struct LogCapture(Arc<StdMutex<Vec<u8>>>);

impl LogCapture {
    pub fn install() -> (Self, tracing::subscriber::DefaultGuard) {
        let capture = Self::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(capture.clone())
            .with_ansi(false)
            .finish();
        let guard = tracing::subscriber::set_default(subscriber);
        (capture, guard)
    }

    /// Whether some line was logged at `level` and contains `message`.
    pub fn has(&self, level: &str, message: &str) -> bool {
        String::from_utf8_lossy(&self.0.lock().unwrap())
            .lines()
            .any(|line| line.contains(level) && line.contains(message))
    }
}

impl std::io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for LogCapture {
    type Writer = LogCapture;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

// ── Frame helpers ───────────────────────────────────────────────────

/// Let the session loop drain everything already queued.
///
/// With paused time this advances the clock by a single millisecond.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

fn encode(event: &ServerEvent) -> String {
    serde_json::to_string(event).expect("server event serialization")
}

pub fn scores(rows: &[(&str, i64)]) -> Vec<ScoreEntry> {
    rows.iter()
        .map(|(name, score)| ScoreEntry {
            name: (*name).to_string(),
            score: *score,
        })
        .collect()
}

pub fn new_game_json(timeout: u32) -> String {
    encode(&ServerEvent::NewGame { timeout })
}

pub fn new_turn_json(drawer: &str, turn: u32, timeout: u32) -> String {
    encode(&ServerEvent::NewTurn {
        drawer: drawer.into(),
        turn,
        timeout,
    })
}

pub fn skipping_turn_json() -> String {
    encode(&ServerEvent::SkippingTurn)
}

pub fn hint_update_json(hint: &str) -> String {
    encode(&ServerEvent::HintUpdate { hint: hint.into() })
}

pub fn leaderboard_json(rows: &[(&str, i64)]) -> String {
    encode(&ServerEvent::LeaderboardUpdate {
        leaderboard: scores(rows),
    })
}

pub fn display_score_json(word: &str, rows: &[(&str, i64)], timeout: u32) -> String {
    encode(&ServerEvent::DisplayScore {
        word: word.into(),
        scoreboard: scores(rows),
        timeout,
    })
}

pub fn game_over_json(rows: &[(&str, i64)], timeout: u32) -> String {
    encode(&ServerEvent::GameOver {
        scoreboard: scores(rows),
        timeout,
    })
}

pub fn word_choices_json(choices: &[&str], timeout: u32) -> String {
    encode(&ServerEvent::WordChoices {
        choices: choices.iter().map(|word| (*word).to_string()).collect(),
        timeout,
    })
}

pub fn drawer_choosing_json(timeout: u32) -> String {
    encode(&ServerEvent::DrawerChoosingWord { timeout })
}

pub fn clear_modal_json() -> String {
    encode(&ServerEvent::ClearModal)
}
