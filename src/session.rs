//! Inbound frame routing and the control-event handlers.
//!
//! A [`Session`] owns the game state, the surfaces and every timer for one
//! game session. It is driven from a single task: inbound frames go through
//! [`route`](Session::route), timer firings through
//! [`on_timer`](Session::on_timer), and the local word pick through
//! [`choose_word`](Session::choose_word). Nothing here blocks or awaits.

use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::client::{emit_event, ScribbleConfig};
use crate::event::ClientEvent;
use crate::gateway::Gateway;
use crate::protocol::{ClientMessage, InboundFrame, ScoreEntry, ServerEvent};
use crate::render::{ListItem, Region, Renderer};
use crate::state::{SessionSnapshot, SessionState};
use crate::surface::{Surface, Surfaces};
use crate::timer::{Countdown, Scheduler, TimerFired, TimerSlot};

/// Countdown text once a turn has run out or been skipped.
pub const TURN_TIMED_OUT: &str = "timeout";

/// Timing knobs copied out of [`ScribbleConfig`].
#[derive(Debug, Clone)]
struct Timing {
    tick_interval: Duration,
    final_stretch_grace: Duration,
    final_stretch_message: String,
}

/// Router, handlers and state for one game session.
#[derive(Debug)]
pub struct Session<R: Renderer> {
    state: SessionState,
    surfaces: Surfaces,
    scheduler: Scheduler,
    renderer: R,
    gateway: Gateway,
    events: mpsc::Sender<ClientEvent>,
    timing: Timing,
}

impl<R: Renderer> Session<R> {
    /// Create a session and the receiver its timers report to.
    ///
    /// Every [`TimerFired`] from that receiver must be passed back to
    /// [`on_timer`](Self::on_timer).
    pub fn new(
        config: &ScribbleConfig,
        renderer: R,
        gateway: Gateway,
        events: mpsc::Sender<ClientEvent>,
    ) -> (Self, mpsc::UnboundedReceiver<TimerFired>) {
        let (scheduler, timer_rx) = Scheduler::new();
        let session = Self {
            state: SessionState::new(config.local_player_id.clone()),
            surfaces: Surfaces::new(),
            scheduler,
            renderer,
            gateway,
            events,
            timing: Timing {
                tick_interval: config.tick_interval,
                final_stretch_grace: config.final_stretch_grace,
                final_stretch_message: config.final_stretch_message.clone(),
            },
        };
        (session, timer_rx)
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.snapshot()
    }

    pub fn surfaces(&self) -> &Surfaces {
        &self.surfaces
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    // ── Routing ─────────────────────────────────────────────────────

    /// Classify one raw inbound frame and act on it.
    ///
    /// Never fails: malformed frames are logged and dropped so the next frame
    /// is processed normally.
    pub fn route(&mut self, raw: &[u8]) {
        match InboundFrame::parse(raw) {
            Ok(InboundFrame::Canvas(frame)) => emit_event(&self.events, ClientEvent::Canvas(frame)),
            Ok(InboundFrame::Chat(frame)) => {
                emit_event(&self.events, ClientEvent::Chat(frame));
                self.refresh_header();
            }
            Ok(InboundFrame::Control(event)) => self.dispatch(event),
            Ok(InboundFrame::Unknown(tag)) => {
                debug!(%tag, "ignoring frame with unknown type");
            }
            Err(e) => {
                warn!(
                    "dropping malformed frame: {e}; raw: {}",
                    String::from_utf8_lossy(raw)
                );
            }
        }
    }

    /// Run the handler for a decoded control event.
    pub fn dispatch(&mut self, event: ServerEvent) {
        match event {
            ServerEvent::Ping => debug!("pong"),
            ServerEvent::NewGame { timeout } => self.on_new_game(timeout),
            ServerEvent::NewTurn {
                drawer,
                turn,
                timeout,
            } => self.on_new_turn(drawer, turn, timeout),
            ServerEvent::HintUpdate { hint } => {
                self.state.hint = hint;
                self.refresh_header();
            }
            ServerEvent::SkippingTurn => {
                debug!("skip requested for current turn");
                self.state.skip_requested = true;
            }
            ServerEvent::LeaderboardUpdate { leaderboard } => {
                self.on_leaderboard_update(&leaderboard);
            }
            ServerEvent::DisplayScore {
                word,
                scoreboard,
                timeout,
            } => {
                self.renderer
                    .set_text(Region::RevealedWord, &format!("The word is: {word}"));
                self.show_scoreboard(Surface::ScoreReveal, &scoreboard, timeout);
            }
            ServerEvent::GameOver {
                scoreboard,
                timeout,
            } => self.show_scoreboard(Surface::FinalScore, &scoreboard, timeout),
            ServerEvent::WordChoices { choices, timeout } => {
                self.on_word_choices(choices, timeout);
            }
            ServerEvent::DrawerChoosingWord { timeout } => self.on_drawer_choosing(timeout),
            ServerEvent::ClearModal => {
                let hidden = self.surfaces.clear_all(&mut self.renderer);
                debug!(hidden, "cleared surfaces");
            }
        }
    }

    /// Re-render the round counter and hint from current state.
    pub fn refresh_header(&mut self) {
        self.renderer.set_text(Region::Hint, self.state.hint_text());
        self.renderer.set_text(Region::Round, &self.state.round_text());
    }

    // ── Handlers ────────────────────────────────────────────────────

    fn on_new_game(&mut self, timeout: u32) {
        info!(timeout, "new game starting");
        self.state.game_started = true;
        self.state.final_stretch = None;
        self.surfaces.open(Surface::NewGame, &mut self.renderer);
        self.state.new_game_timer = Some(Countdown::start(
            &mut self.scheduler,
            TimerSlot::NewGame,
            timeout,
            self.timing.tick_interval,
        ));
    }

    fn on_new_turn(&mut self, drawer: String, turn: u32, timeout: u32) {
        info!(%drawer, turn, timeout, "new turn");
        self.state.drawer = drawer;
        self.state.turn = Some(turn);
        self.state.skip_requested = false;
        self.refresh_header();

        // Dropping the previous countdown aborts its ticker before the new
        // one is installed.
        self.state.turn_timer = None;
        self.surfaces.open(Surface::TurnCountdown, &mut self.renderer);
        self.renderer
            .set_text(Region::Countdown, &timeout.to_string());
        self.state.turn_timer = Some(Countdown::start(
            &mut self.scheduler,
            TimerSlot::Turn,
            timeout,
            self.timing.tick_interval,
        ));
    }

    fn on_leaderboard_update(&mut self, leaderboard: &[ScoreEntry]) {
        let items: Vec<ListItem> = leaderboard
            .iter()
            .map(|entry| ListItem {
                text: score_line(entry),
                is_local_player: entry.name == self.state.local_player,
                is_drawer: entry.name == self.state.drawer,
                selectable: false,
            })
            .collect();
        self.renderer.set_list(Region::Leaderboard, &items);
        self.surfaces.open(Surface::Leaderboard, &mut self.renderer);
    }

    fn show_scoreboard(&mut self, surface: Surface, scoreboard: &[ScoreEntry], timeout: u32) {
        let region = match surface {
            Surface::FinalScore => Region::FinalScoreList,
            _ => Region::ScoreList,
        };
        let items: Vec<ListItem> = scoreboard
            .iter()
            .map(|entry| ListItem::new(score_line(entry)))
            .collect();
        self.renderer.set_list(region, &items);
        self.surfaces.open_for(
            surface,
            Duration::from_secs(u64::from(timeout)),
            &mut self.scheduler,
            &mut self.renderer,
        );
    }

    fn on_word_choices(&mut self, choices: Vec<String>, timeout: u32) {
        if !self.state.is_drawer() {
            debug!(drawer = %self.state.drawer, "word choices are for the drawer only");
            return;
        }
        let items: Vec<ListItem> = choices
            .iter()
            .map(|word| ListItem {
                selectable: true,
                ..ListItem::new(word.as_str())
            })
            .collect();
        self.renderer.set_list(Region::WordChoices, &items);
        self.state.word_choices = choices;
        self.surfaces.open_for(
            Surface::WordChoice,
            Duration::from_secs(u64::from(timeout)),
            &mut self.scheduler,
            &mut self.renderer,
        );
    }

    fn on_drawer_choosing(&mut self, timeout: u32) {
        if self.state.is_drawer() {
            debug!("drawer-choosing notice is not shown to the drawer");
            return;
        }
        let notice = format!("{} is choosing a word...", self.state.drawer);
        self.renderer.set_text(Region::DrawerChoosing, &notice);
        self.surfaces.open_for(
            Surface::DrawerChoosing,
            Duration::from_secs(u64::from(timeout)),
            &mut self.scheduler,
            &mut self.renderer,
        );
    }

    // ── Local actions ───────────────────────────────────────────────

    /// Pick `word` from the open word-choice prompt.
    ///
    /// Sends `word_chosen` through the gateway and closes the prompt. Returns
    /// `false` and does nothing if the prompt is not open or `word` was not
    /// offered.
    pub fn choose_word(&mut self, word: &str) -> bool {
        if !self.surfaces.is_visible(Surface::WordChoice) {
            warn!(word, "word choice is not open, ignoring selection");
            return false;
        }
        if !self.state.word_choices.iter().any(|offered| offered == word) {
            warn!(word, "word was not offered, ignoring selection");
            return false;
        }
        self.gateway.send(&ClientMessage::WordChosen {
            word: word.to_string(),
            name: self.state.local_player.clone(),
        });
        self.state.word_choices.clear();
        self.surfaces.close(Surface::WordChoice, &mut self.renderer);
        true
    }

    // ── Timers ──────────────────────────────────────────────────────

    /// Act on a tick or expiry. Firings from superseded timers are ignored.
    pub fn on_timer(&mut self, fired: TimerFired) {
        match fired.slot {
            TimerSlot::NewGame => self.on_new_game_tick(&fired),
            TimerSlot::FinalStretch => {
                if self
                    .state
                    .final_stretch
                    .as_ref()
                    .is_some_and(|handle| handle.owns(&fired))
                {
                    self.state.final_stretch = None;
                    self.surfaces.close(Surface::NewGame, &mut self.renderer);
                }
            }
            TimerSlot::Turn => self.on_turn_tick(&fired),
            TimerSlot::AutoHide(surface) => {
                if self.surfaces.on_auto_hide(surface, &fired, &mut self.renderer)
                    && surface == Surface::WordChoice
                {
                    self.state.word_choices.clear();
                }
            }
        }
    }

    fn on_new_game_tick(&mut self, fired: &TimerFired) {
        let remaining = match self.state.new_game_timer.as_mut() {
            Some(countdown) if countdown.owns(fired) => countdown.decrement(),
            _ => return,
        };
        self.renderer
            .set_text(Region::Timer, &remaining.to_string());
        if remaining <= 1 {
            self.state.new_game_timer = None;
            self.renderer
                .set_text(Region::Timer, &self.timing.final_stretch_message);
            self.state.final_stretch = Some(
                self.scheduler
                    .after(TimerSlot::FinalStretch, self.timing.final_stretch_grace),
            );
        }
    }

    fn on_turn_tick(&mut self, fired: &TimerFired) {
        let Some(countdown) = self
            .state
            .turn_timer
            .as_mut()
            .filter(|countdown| countdown.owns(fired))
        else {
            return;
        };
        if self.state.skip_requested || countdown.remaining() == 0 {
            debug!(skipped = self.state.skip_requested, "turn countdown finished");
            self.state.turn_timer = None;
            self.renderer.set_text(Region::Countdown, TURN_TIMED_OUT);
            return;
        }
        let remaining = countdown.decrement();
        self.renderer
            .set_text(Region::Countdown, &remaining.to_string());
    }
}

fn score_line(entry: &ScoreEntry) -> String {
    format!("{}: {}", entry.name, entry.score)
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
    use crate::gateway::{ConnectionState, ConnectionStatus};
    use crate::test_support::capture_logs;
    use serde_json::json;
    use std::collections::HashMap;
    use tokio::time::{self, Instant};

    const SECOND: Duration = Duration::from_secs(1);

    /// Renderer that keeps the latest value of every region plus a history.
    #[derive(Debug, Default)]
    struct Screen {
        texts: HashMap<Region, String>,
        lists: HashMap<Region, Vec<ListItem>>,
        history: Vec<(Region, String)>,
    }

    impl Screen {
        fn text(&self, region: Region) -> Option<&str> {
            self.texts.get(&region).map(String::as_str)
        }

        fn history_of(&self, region: Region) -> Vec<&str> {
            self.history
                .iter()
                .filter(|(r, _)| *r == region)
                .map(|(_, text)| text.as_str())
                .collect()
        }
    }

    impl Renderer for Screen {
        fn set_text(&mut self, region: Region, text: &str) {
            self.texts.insert(region, text.to_string());
            self.history.push((region, text.to_string()));
        }

        fn set_list(&mut self, region: Region, items: &[ListItem]) {
            self.lists.insert(region, items.to_vec());
        }

        fn show(&mut self, _surface: Surface) {}

        fn hide(&mut self, _surface: Surface) {}
    }

    struct Harness {
        session: Session<Screen>,
        timers: mpsc::UnboundedReceiver<TimerFired>,
        events: mpsc::Receiver<ClientEvent>,
        outbound: mpsc::UnboundedReceiver<String>,
        status: ConnectionStatus,
    }

    impl Harness {
        fn new(player: &str) -> Self {
            let config = ScribbleConfig::new(player);
            let status = ConnectionStatus::new();
            status.set(ConnectionState::Open);
            let (gateway, outbound) = Gateway::new(status.clone());
            let (event_tx, events) = mpsc::channel(16);
            let (session, timers) = Session::new(&config, Screen::default(), gateway, event_tx);
            Self {
                session,
                timers,
                events,
                outbound,
                status,
            }
        }

        fn send(&mut self, frame: serde_json::Value) {
            self.session.route(frame.to_string().as_bytes());
        }

        /// Deliver every timer firing due within `span` of virtual time.
        async fn run_for(&mut self, span: Duration) {
            let deadline = Instant::now() + span;
            while let Ok(Some(fired)) = time::timeout_at(deadline, self.timers.recv()).await {
                self.session.on_timer(fired);
            }
        }

        fn screen(&self) -> &Screen {
            self.session.renderer()
        }
    }

    // ── Routing ─────────────────────────────────────────────────────

    #[tokio::test]
    async fn drawing_frames_go_to_the_canvas_untouched() {
        let mut h = Harness::new("alice");
        let frame = json!({"type": "drawing", "points": [[1, 2], [3, 4]]});
        h.send(frame.clone());

        assert_eq!(h.events.try_recv().unwrap(), ClientEvent::Canvas(frame));
        assert!(h.screen().history.is_empty());
    }

    #[tokio::test]
    async fn chat_frames_are_forwarded_then_refresh_the_header() {
        let mut h = Harness::new("alice");
        let frame = json!({"type": "guess", "name": "bob", "guess": "dog"});
        h.send(frame.clone());

        assert_eq!(h.events.try_recv().unwrap(), ClientEvent::Chat(frame));
        assert_eq!(h.screen().text(Region::Round), Some("Round:"));
        assert_eq!(h.screen().text(Region::Hint), Some("_ _ _ _"));
    }

    #[tokio::test]
    async fn malformed_frame_is_dropped_and_next_frame_applies() {
        let mut h = Harness::new("alice");
        let ((), logs) = capture_logs(|| h.session.route(b"{\"type\": \"new_turn\", "));
        assert!(logs.has("WARN", "dropping malformed frame"));
        assert!(logs.has("WARN", "new_turn"), "raw frame should be logged");

        h.send(json!({"type": "new_turn", "drawer": "bob", "turn": 2, "timeout": 30}));

        let snapshot = h.session.snapshot();
        assert_eq!(snapshot.drawer, "bob");
        assert_eq!(snapshot.turn, Some(2));
    }

    #[tokio::test]
    async fn unknown_type_changes_nothing() {
        let mut h = Harness::new("alice");
        let before = h.session.snapshot();
        h.send(json!({"type": "fireworks"}));
        assert_eq!(h.session.snapshot(), before);
        assert!(h.events.try_recv().is_err());
    }

    #[tokio::test]
    async fn hint_update_refreshes_header() {
        let mut h = Harness::new("alice");
        h.send(json!({"type": "hint_update", "hint": "c _ _"}));
        assert_eq!(h.session.state().hint(), "c _ _");
        assert_eq!(h.screen().text(Region::Hint), Some("c _ _"));
    }

    #[tokio::test]
    async fn header_refresh_is_idempotent() {
        let mut h = Harness::new("alice");
        h.send(json!({"type": "hint_update", "hint": "_ o _"}));
        h.session.refresh_header();
        let first = h.screen().texts.clone();
        let before = h.session.snapshot();
        h.session.refresh_header();

        assert_eq!(h.screen().texts, first);
        assert_eq!(h.session.snapshot(), before);
    }

    // ── New game ────────────────────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn new_game_counts_down_then_hides_after_grace() {
        let mut h = Harness::new("alice");
        h.send(json!({"type": "new_game", "timeout": 4}));
        assert!(h.session.state().game_started());
        assert!(h.session.surfaces().is_visible(Surface::NewGame));

        h.run_for(3 * SECOND + Duration::from_millis(10)).await;
        assert_eq!(
            h.screen().history_of(Region::Timer),
            vec!["3", "2", "1", "Don't lose!"]
        );
        assert!(h.session.surfaces().is_visible(Surface::NewGame));

        h.run_for(2 * SECOND).await;
        assert!(!h.session.surfaces().is_visible(Surface::NewGame));
    }

    #[tokio::test(start_paused = true)]
    async fn new_game_timer_does_not_touch_turn_countdown() {
        let mut h = Harness::new("alice");
        h.send(json!({"type": "new_turn", "drawer": "bob", "turn": 1, "timeout": 10}));
        h.send(json!({"type": "new_game", "timeout": 3}));

        h.run_for(2 * SECOND + Duration::from_millis(500)).await;
        assert_eq!(
            h.screen().history_of(Region::Countdown),
            vec!["10", "9", "8"]
        );
        assert_eq!(h.session.state().turn_remaining(), Some(8));
    }

    // ── New turn ────────────────────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn new_turn_sets_state_and_counts_down_to_timeout() {
        let mut h = Harness::new("alice");
        h.session.state.skip_requested = true;
        h.send(json!({"type": "new_turn", "drawer": "bob", "turn": 3, "timeout": 2}));

        assert_eq!(h.session.state().drawer(), "bob");
        assert_eq!(h.session.state().turn(), Some(3));
        assert!(!h.session.state().skip_requested());
        assert_eq!(h.screen().text(Region::Round), Some("Round: 3"));

        h.run_for(5 * SECOND + Duration::from_millis(500)).await;
        assert_eq!(
            h.screen().history_of(Region::Countdown),
            vec!["2", "1", "0", TURN_TIMED_OUT]
        );
        assert!(!h.session.state().turn_countdown_active());
    }

    #[tokio::test(start_paused = true)]
    async fn superseding_turn_cancels_the_old_countdown() {
        let mut h = Harness::new("alice");
        h.send(json!({"type": "new_turn", "drawer": "bob", "turn": 1, "timeout": 50}));
        h.run_for(Duration::from_millis(100)).await;
        h.send(json!({"type": "new_turn", "drawer": "carol", "turn": 2, "timeout": 20}));

        h.run_for(3 * SECOND + Duration::from_millis(50)).await;
        assert_eq!(
            h.screen().history_of(Region::Countdown),
            vec!["50", "20", "19", "18", "17"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn skip_takes_effect_on_the_next_tick() {
        let mut h = Harness::new("alice");
        h.send(json!({"type": "new_turn", "drawer": "bob", "turn": 1, "timeout": 30}));
        h.run_for(Duration::from_millis(1500)).await;
        h.send(json!({"type": "skipping_turn"}));

        assert!(h.session.state().skip_requested());
        assert_eq!(h.screen().text(Region::Countdown), Some("29"));

        h.run_for(SECOND).await;
        assert_eq!(h.screen().text(Region::Countdown), Some(TURN_TIMED_OUT));
        assert!(!h.session.state().turn_countdown_active());

        h.run_for(5 * SECOND).await;
        assert_eq!(
            h.screen().history_of(Region::Countdown),
            vec!["30", "29", TURN_TIMED_OUT]
        );
    }

    // ── Leaderboard & scores ────────────────────────────────────────

    #[tokio::test]
    async fn leaderboard_keeps_server_order_and_tags_rows() {
        let mut h = Harness::new("alice");
        h.send(json!({"type": "new_turn", "drawer": "alice", "turn": 1, "timeout": 60}));
        h.send(json!({"type": "leaderboard_update", "leaderboard": [
            {"name": "bob", "score": 10},
            {"name": "alice", "score": 40},
            {"name": "carol", "score": 25},
        ]}));

        let rows = &h.screen().lists[&Region::Leaderboard];
        let texts: Vec<&str> = rows.iter().map(|row| row.text.as_str()).collect();
        assert_eq!(texts, vec!["bob: 10", "alice: 40", "carol: 25"]);
        assert!(rows[1].is_local_player && rows[1].is_drawer);
        assert!(!rows[0].is_local_player && !rows[0].is_drawer);
        assert!(h.session.surfaces().is_visible(Surface::Leaderboard));
    }

    #[tokio::test(start_paused = true)]
    async fn score_reveal_shows_word_and_auto_hides() {
        let mut h = Harness::new("alice");
        h.send(json!({"type": "display_score", "word": "cat", "timeout": 5,
            "scoreboard": [{"name": "bob", "score": 3}]}));

        assert_eq!(h.screen().text(Region::RevealedWord), Some("The word is: cat"));
        assert_eq!(h.screen().lists[&Region::ScoreList][0].text, "bob: 3");
        assert!(h.session.surfaces().is_visible(Surface::ScoreReveal));

        h.run_for(5 * SECOND + Duration::from_millis(1)).await;
        assert!(!h.session.surfaces().is_visible(Surface::ScoreReveal));
    }

    #[tokio::test(start_paused = true)]
    async fn cleared_score_reveal_stays_hidden_when_auto_hide_would_fire() {
        let mut h = Harness::new("alice");
        h.send(json!({"type": "display_score", "word": "cat", "timeout": 5, "scoreboard": []}));
        h.run_for(SECOND).await;
        h.send(json!({"type": "clear_modal"}));
        assert!(!h.session.surfaces().is_visible(Surface::ScoreReveal));

        h.run_for(5 * SECOND).await;
        assert!(!h.session.surfaces().is_visible(Surface::ScoreReveal));
    }

    #[tokio::test(start_paused = true)]
    async fn game_over_fills_final_list() {
        let mut h = Harness::new("alice");
        h.send(json!({"type": "game_over", "timeout": 8, "scoreboard": [
            {"name": "carol", "score": 90},
            {"name": "alice", "score": 70},
        ]}));
        let texts: Vec<&str> = h.screen().lists[&Region::FinalScoreList]
            .iter()
            .map(|row| row.text.as_str())
            .collect();
        assert_eq!(texts, vec!["carol: 90", "alice: 70"]);
        assert_eq!(h.session.surfaces().open_modal(), Some(Surface::FinalScore));
    }

    // ── Role-gated prompts ──────────────────────────────────────────

    #[tokio::test]
    async fn word_choices_render_only_for_the_drawer() {
        for (drawer, expect_prompt) in [("alice", true), ("bob", false)] {
            let mut h = Harness::new("alice");
            h.send(json!({"type": "new_turn", "drawer": drawer, "turn": 1, "timeout": 60}));
            h.send(json!({"type": "word_choices", "choices": ["cat", "dog"], "timeout": 10}));
            h.send(json!({"type": "drawer_choosing_word", "timeout": 10}));

            let surfaces = h.session.surfaces();
            assert_eq!(surfaces.is_visible(Surface::WordChoice), expect_prompt);
            assert_eq!(surfaces.is_visible(Surface::DrawerChoosing), !expect_prompt);
        }
    }

    #[tokio::test]
    async fn drawer_choosing_names_the_drawer() {
        let mut h = Harness::new("alice");
        h.send(json!({"type": "new_turn", "drawer": "bob", "turn": 1, "timeout": 60}));
        h.send(json!({"type": "drawer_choosing_word", "timeout": 10}));
        assert_eq!(
            h.screen().text(Region::DrawerChoosing),
            Some("bob is choosing a word...")
        );
    }

    #[tokio::test]
    async fn choosing_a_word_sends_and_closes_the_prompt() {
        let mut h = Harness::new("alice");
        h.send(json!({"type": "new_turn", "drawer": "alice", "turn": 1, "timeout": 60}));
        h.send(json!({"type": "word_choices", "choices": ["cat", "dog"], "timeout": 10}));
        assert!(h.screen().lists[&Region::WordChoices]
            .iter()
            .all(|item| item.selectable));

        assert!(h.session.choose_word("dog"));
        assert!(!h.session.surfaces().is_visible(Surface::WordChoice));

        let sent: serde_json::Value =
            serde_json::from_str(&h.outbound.try_recv().unwrap()).unwrap();
        assert_eq!(
            sent,
            json!({"type": "word_chosen", "word": "dog", "name": "alice"})
        );

        // A second pick after the prompt closed goes nowhere.
        assert!(!h.session.choose_word("cat"));
        assert!(h.outbound.try_recv().is_err());
    }

    #[tokio::test]
    async fn choosing_an_unoffered_word_is_ignored() {
        let mut h = Harness::new("alice");
        h.send(json!({"type": "new_turn", "drawer": "alice", "turn": 1, "timeout": 60}));
        h.send(json!({"type": "word_choices", "choices": ["cat"], "timeout": 10}));
        assert!(!h.session.choose_word("zebra"));
        assert!(h.session.surfaces().is_visible(Surface::WordChoice));
        assert!(h.outbound.try_recv().is_err());
    }

    #[tokio::test]
    async fn choosing_while_disconnected_drops_the_action() {
        let mut h = Harness::new("alice");
        h.send(json!({"type": "new_turn", "drawer": "alice", "turn": 1, "timeout": 60}));
        h.send(json!({"type": "word_choices", "choices": ["cat"], "timeout": 10}));
        h.status.set(ConnectionState::Closed);

        assert!(h.session.choose_word("cat"));
        assert!(!h.session.surfaces().is_visible(Surface::WordChoice));
        assert!(h.outbound.try_recv().is_err());
    }

    // ── Modal exclusivity ───────────────────────────────────────────

    #[tokio::test]
    async fn a_new_modal_replaces_the_open_one() {
        let mut h = Harness::new("alice");
        h.send(json!({"type": "new_turn", "drawer": "alice", "turn": 1, "timeout": 60}));
        h.send(json!({"type": "display_score", "word": "cat", "timeout": 5, "scoreboard": []}));
        h.send(json!({"type": "word_choices", "choices": ["owl"], "timeout": 10}));

        assert_eq!(h.session.surfaces().open_modal(), Some(Surface::WordChoice));
        assert!(!h.session.surfaces().is_visible(Surface::ScoreReveal));
        assert!(h.session.surfaces().is_visible(Surface::TurnCountdown));
    }

    #[tokio::test]
    async fn clear_modal_hides_modal_and_non_modal_surfaces() {
        let mut h = Harness::new("alice");
        h.send(json!({"type": "new_turn", "drawer": "bob", "turn": 1, "timeout": 60}));
        h.send(json!({"type": "leaderboard_update", "leaderboard": []}));
        h.send(json!({"type": "drawer_choosing_word", "timeout": 10}));
        h.send(json!({"type": "clear_modal"}));

        assert!(h.session.surfaces().visible().is_empty());
    }
}
