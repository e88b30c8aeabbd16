#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing
)]
//! Integration tests for [`ScribbleClient`].
//!
//! Each test plays the server through the shared `MockTransport`, runs on
//! paused tokio time so countdowns are deterministic, and inspects what the
//! session rendered through `RecordingRenderer`.

mod common;

use std::time::Duration;

use scribble_client::{
    ClientEvent, ConnectionState, Region, ScribbleClient, ScribbleConfig, Surface,
};
use serde_json::json;
use tokio::sync::mpsc;
use tokio::time::sleep;

use common::{
    clear_modal_json, display_score_json, drawer_choosing_json, game_over_json,
    hint_update_json, leaderboard_json, new_game_json, new_turn_json, settle,
    skipping_turn_json, word_choices_json, LogCapture, MockTransport, RecordingRenderer,
    ServerScript,
};

const SECOND: Duration = Duration::from_secs(1);

// ════════════════════════════════════════════════════════════════════
// Helpers
// ════════════════════════════════════════════════════════════════════

struct Game {
    client: ScribbleClient,
    events: mpsc::Receiver<ClientEvent>,
    server: ServerScript,
    screen: RecordingRenderer,
}

/// Start a client for `player` and consume the initial `Connected` event.
async fn start_game(player: &str) -> Game {
    start_game_with(RecordingRenderer::new(), ScribbleConfig::new(player)).await
}

async fn start_game_with(screen: RecordingRenderer, config: ScribbleConfig) -> Game {
    let (transport, server) = MockTransport::new();
    let (client, mut events) = ScribbleClient::start(transport, screen.clone(), config);
    let first = events.recv().await.expect("expected Connected event");
    assert_eq!(first, ClientEvent::Connected);
    Game {
        client,
        events,
        server,
        screen,
    }
}

impl Game {
    async fn push(&self, frame: impl Into<String>) {
        self.server.push(frame);
        settle().await;
    }

    async fn next_event(&mut self) -> ClientEvent {
        self.events.recv().await.expect("event channel closed")
    }
}

// ════════════════════════════════════════════════════════════════════
// Routing
// ════════════════════════════════════════════════════════════════════

#[tokio::test(start_paused = true)]
async fn canvas_and_chat_frames_are_forwarded_in_order() {
    let mut game = start_game("alice").await;
    let stroke = json!({"type": "drawing", "x": 10, "y": 20, "color": "#000"});
    let guess = json!({"type": "guess", "name": "bob", "guess": "dog"});
    let wipe = json!({"type": "clear_canvas"});

    game.push(stroke.to_string()).await;
    game.push(guess.to_string()).await;
    game.push(wipe.to_string()).await;

    assert_eq!(game.next_event().await, ClientEvent::Canvas(stroke));
    assert_eq!(game.next_event().await, ClientEvent::Chat(guess));
    assert_eq!(game.next_event().await, ClientEvent::Canvas(wipe));

    // Chat frames also refresh the header.
    assert_eq!(game.screen.text(Region::Round).as_deref(), Some("Round:"));
    assert_eq!(game.screen.text(Region::Hint).as_deref(), Some("_ _ _ _"));
}

#[tokio::test(start_paused = true)]
async fn malformed_frame_does_not_stop_the_next_one() {
    let (logs, _guard) = LogCapture::install();
    let game = start_game("alice").await;
    game.push(r#"{"type":"new_turn","drawer":"#).await;
    game.push(r#"{"drawer":"mallory"}"#).await;
    assert!(logs.has("WARN", "dropping malformed frame"));
    assert!(logs.has("WARN", "mallory"));
    game.push(new_turn_json("bob", 2, 60)).await;

    let snapshot = game.client.snapshot().await;
    assert_eq!(snapshot.drawer, "bob");
    assert_eq!(snapshot.turn, Some(2));
    assert!(game.client.is_connected());
}

#[tokio::test(start_paused = true)]
async fn unknown_types_and_pings_change_nothing() {
    let mut game = start_game("alice").await;
    let before = game.client.snapshot().await;

    game.push(r#"{"type":"confetti","amount":9000}"#).await;
    game.push(r#"{"type":"ping"}"#).await;

    assert_eq!(game.client.snapshot().await, before);
    assert!(game.events.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn snapshot_accessors_follow_the_game() {
    let game = start_game("alice").await;
    assert_eq!(game.client.current_drawer().await, None);
    assert_eq!(game.client.current_turn().await, None);

    game.push(new_turn_json("bob", 4, 80)).await;
    game.push(hint_update_json("c _ t")).await;

    assert_eq!(game.client.current_drawer().await.as_deref(), Some("bob"));
    assert_eq!(game.client.current_turn().await, Some(4));
    let snapshot = game.client.snapshot().await;
    assert_eq!(snapshot.local_player, "alice");
    assert_eq!(snapshot.hint, "c _ t");
    assert_eq!(game.screen.text(Region::Round).as_deref(), Some("Round: 4"));
    assert_eq!(game.screen.text(Region::Hint).as_deref(), Some("c _ t"));
}

// ════════════════════════════════════════════════════════════════════
// Countdowns
// ════════════════════════════════════════════════════════════════════

#[tokio::test(start_paused = true)]
async fn turn_countdown_runs_to_timeout() {
    let game = start_game("alice").await;
    game.push(new_turn_json("bob", 1, 3)).await;
    assert!(game.screen.is_shown(Surface::TurnCountdown));

    sleep(5 * SECOND).await;
    assert_eq!(
        game.screen.history_of(Region::Countdown),
        vec!["3", "2", "1", "0", "timeout"]
    );
}

#[tokio::test(start_paused = true)]
async fn second_new_turn_replaces_the_first_countdown() {
    let game = start_game("alice").await;
    game.push(new_turn_json("bob", 1, 50)).await;
    sleep(Duration::from_millis(100)).await;
    game.push(new_turn_json("carol", 2, 20)).await;

    sleep(3 * SECOND + Duration::from_millis(50)).await;
    assert_eq!(
        game.screen.history_of(Region::Countdown),
        vec!["50", "20", "19", "18", "17"]
    );
    assert_eq!(game.client.current_drawer().await.as_deref(), Some("carol"));
}

#[tokio::test(start_paused = true)]
async fn skipping_turn_ends_the_countdown_on_the_next_tick() {
    let game = start_game("alice").await;
    game.push(new_turn_json("bob", 1, 30)).await;
    sleep(Duration::from_millis(1500)).await;

    game.push(skipping_turn_json()).await;
    assert!(game.client.snapshot().await.skip_requested);
    assert_eq!(game.screen.text(Region::Countdown).as_deref(), Some("29"));

    sleep(10 * SECOND).await;
    assert_eq!(
        game.screen.history_of(Region::Countdown),
        vec!["30", "29", "timeout"]
    );
}

#[tokio::test(start_paused = true)]
async fn new_turn_clears_a_stale_skip() {
    let game = start_game("alice").await;
    game.push(new_turn_json("bob", 1, 30)).await;
    game.push(skipping_turn_json()).await;
    game.push(new_turn_json("carol", 2, 30)).await;
    assert!(!game.client.snapshot().await.skip_requested);

    sleep(2 * SECOND + Duration::from_millis(50)).await;
    assert_eq!(game.screen.text(Region::Countdown).as_deref(), Some("28"));
}

#[tokio::test(start_paused = true)]
async fn new_game_banner_counts_down_then_hides_after_the_grace() {
    let game = start_game("alice").await;
    game.push(new_game_json(3)).await;
    assert!(game.client.snapshot().await.game_started);
    assert!(game.screen.is_shown(Surface::NewGame));

    sleep(2 * SECOND + Duration::from_millis(50)).await;
    assert_eq!(
        game.screen.history_of(Region::Timer),
        vec!["2", "1", "Don't lose!"]
    );
    assert!(game.screen.is_shown(Surface::NewGame));

    sleep(2 * SECOND).await;
    assert!(!game.screen.is_shown(Surface::NewGame));
}

#[tokio::test(start_paused = true)]
async fn configured_tick_interval_and_message_are_used() {
    let config = ScribbleConfig::new("alice")
        .with_tick_interval(Duration::from_millis(250))
        .with_final_stretch_message("Hurry!")
        .with_final_stretch_grace(Duration::from_millis(500));
    let game = start_game_with(RecordingRenderer::new(), config).await;
    game.push(new_game_json(2)).await;

    sleep(Duration::from_millis(300)).await;
    assert_eq!(game.screen.history_of(Region::Timer), vec!["1", "Hurry!"]);
    sleep(Duration::from_millis(500)).await;
    assert!(!game.screen.is_shown(Surface::NewGame));
}

// ════════════════════════════════════════════════════════════════════
// Surfaces
// ════════════════════════════════════════════════════════════════════

#[tokio::test(start_paused = true)]
async fn score_reveal_renders_and_auto_hides() {
    let game = start_game("alice").await;
    game.push(display_score_json("giraffe", &[("bob", 120), ("alice", 80)], 5))
        .await;

    assert_eq!(
        game.screen.text(Region::RevealedWord).as_deref(),
        Some("The word is: giraffe")
    );
    assert_eq!(
        game.screen.list_texts(Region::ScoreList),
        vec!["bob: 120", "alice: 80"]
    );
    assert!(game.screen.is_shown(Surface::ScoreReveal));

    sleep(5 * SECOND + Duration::from_millis(10)).await;
    assert!(!game.screen.is_shown(Surface::ScoreReveal));
}

#[tokio::test(start_paused = true)]
async fn reshowing_a_surface_restarts_its_auto_hide() {
    let game = start_game("alice").await;
    game.push(display_score_json("cat", &[], 5)).await;
    sleep(SECOND).await;
    game.push(clear_modal_json()).await;
    sleep(SECOND).await;
    game.push(display_score_json("dog", &[], 10)).await;

    // The first reveal's auto-hide was due at five seconds.
    sleep(4 * SECOND).await;
    assert!(game.screen.is_shown(Surface::ScoreReveal));

    sleep(7 * SECOND).await;
    assert!(!game.screen.is_shown(Surface::ScoreReveal));
}

#[tokio::test(start_paused = true)]
async fn game_over_replaces_the_open_modal() {
    let game = start_game("alice").await;
    game.push(display_score_json("cat", &[("bob", 3)], 30)).await;
    game.push(game_over_json(&[("carol", 90), ("alice", 70)], 10))
        .await;

    assert!(!game.screen.is_shown(Surface::ScoreReveal));
    assert!(game.screen.is_shown(Surface::FinalScore));
    assert_eq!(
        game.screen.list_texts(Region::FinalScoreList),
        vec!["carol: 90", "alice: 70"]
    );
}

#[tokio::test(start_paused = true)]
async fn leaderboard_marks_local_player_and_drawer() {
    let game = start_game("alice").await;
    game.push(new_turn_json("bob", 1, 60)).await;
    game.push(leaderboard_json(&[("carol", 30), ("bob", 20), ("alice", 10)]))
        .await;

    let rows = game.screen.list(Region::Leaderboard);
    let flags: Vec<(&str, bool, bool)> = rows
        .iter()
        .map(|row| (row.text.as_str(), row.is_local_player, row.is_drawer))
        .collect();
    assert_eq!(
        flags,
        vec![
            ("carol: 30", false, false),
            ("bob: 20", false, true),
            ("alice: 10", true, false),
        ]
    );
    assert!(game.screen.is_shown(Surface::Leaderboard));
}

#[tokio::test(start_paused = true)]
async fn clear_modal_hides_everything() {
    let game = start_game("alice").await;
    game.push(new_turn_json("bob", 1, 60)).await;
    game.push(leaderboard_json(&[("bob", 1)])).await;
    game.push(drawer_choosing_json(15)).await;
    game.push(clear_modal_json()).await;

    for surface in Surface::ALL {
        assert!(!game.screen.is_shown(surface), "{surface:?} still shown");
    }
}

#[tokio::test(start_paused = true)]
async fn clear_modal_without_surfaces_is_harmless() {
    let (logs, _guard) = LogCapture::install();
    let game = start_game_with(RecordingRenderer::bare(), ScribbleConfig::new("alice")).await;
    game.push(clear_modal_json()).await;
    assert!(logs.has("WARN", "no surfaces registered to clear"));
    game.push(new_turn_json("bob", 7, 60)).await;

    assert_eq!(game.client.current_turn().await, Some(7));
    assert_eq!(game.screen.hide_count(), 0);
}

// ════════════════════════════════════════════════════════════════════
// Word choice
// ════════════════════════════════════════════════════════════════════

#[tokio::test(start_paused = true)]
async fn drawer_gets_the_prompt_and_guessers_get_the_notice() {
    let drawer = start_game("alice").await;
    drawer.push(new_turn_json("alice", 1, 60)).await;
    drawer.push(word_choices_json(&["apple", "kite"], 15)).await;
    drawer.push(drawer_choosing_json(15)).await;
    assert!(drawer.screen.is_shown(Surface::WordChoice));
    assert!(!drawer.screen.is_shown(Surface::DrawerChoosing));
    assert_eq!(
        drawer.screen.list_texts(Region::WordChoices),
        vec!["apple", "kite"]
    );

    let guesser = start_game("bob").await;
    guesser.push(new_turn_json("alice", 1, 60)).await;
    guesser.push(word_choices_json(&["apple", "kite"], 15)).await;
    guesser.push(drawer_choosing_json(15)).await;
    assert!(!guesser.screen.is_shown(Surface::WordChoice));
    assert!(guesser.screen.is_shown(Surface::DrawerChoosing));
    assert_eq!(
        guesser.screen.text(Region::DrawerChoosing).as_deref(),
        Some("alice is choosing a word...")
    );
}

#[tokio::test(start_paused = true)]
async fn choosing_a_word_reaches_the_server() {
    let game = start_game("alice").await;
    game.push(new_turn_json("alice", 1, 60)).await;
    game.push(word_choices_json(&["apple", "kite"], 15)).await;

    game.client.choose_word("kite").unwrap();
    settle().await;

    assert_eq!(
        game.server.sent(),
        vec![json!({"type": "word_chosen", "word": "kite", "name": "alice"})]
    );
    assert!(!game.screen.is_shown(Surface::WordChoice));

    // The prompt is gone, so a second pick is ignored.
    game.client.choose_word("apple").unwrap();
    settle().await;
    assert_eq!(game.server.sent().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn word_prompt_auto_hides_and_late_picks_are_ignored() {
    let game = start_game("alice").await;
    game.push(new_turn_json("alice", 1, 60)).await;
    game.push(word_choices_json(&["apple"], 3)).await;

    sleep(3 * SECOND + Duration::from_millis(10)).await;
    assert!(!game.screen.is_shown(Surface::WordChoice));

    game.client.choose_word("apple").unwrap();
    settle().await;
    assert!(game.server.sent().is_empty());
}

// ════════════════════════════════════════════════════════════════════
// Connection lifecycle
// ════════════════════════════════════════════════════════════════════

#[tokio::test(start_paused = true)]
async fn server_hang_up_emits_disconnected_and_drops_later_sends() {
    let mut game = start_game("alice").await;
    game.push(new_turn_json("alice", 1, 60)).await;
    game.push(word_choices_json(&["apple"], 15)).await;
    game.server.hang_up();

    assert_eq!(
        game.next_event().await,
        ClientEvent::Disconnected { reason: None }
    );
    assert_eq!(game.client.connection_state(), ConnectionState::Closed);

    // The loop is still alive: the pick is applied locally but never sent.
    game.client.choose_word("apple").unwrap();
    settle().await;
    assert!(!game.screen.is_shown(Surface::WordChoice));
    assert!(game.server.sent().is_empty());

    // Countdowns keep running after the connection is gone.
    sleep(2 * SECOND + Duration::from_millis(10)).await;
    assert_eq!(game.screen.text(Region::Countdown).as_deref(), Some("58"));
}

#[tokio::test(start_paused = true)]
async fn undrained_event_channel_does_not_stall_the_loop_after_disconnect() {
    let config = ScribbleConfig::new("alice").with_event_channel_capacity(1);
    let mut game = start_game_with(RecordingRenderer::new(), config).await;
    game.push(new_turn_json("bob", 1, 60)).await;
    game.push(json!({"type": "chat_message", "name": "bob", "message": "hi"}).to_string())
        .await;
    // The channel is now full and nobody is reading it.
    game.server.hang_up();
    settle().await;
    assert_eq!(game.client.connection_state(), ConnectionState::Closed);

    sleep(3 * SECOND + Duration::from_millis(10)).await;
    assert_eq!(game.screen.text(Region::Countdown).as_deref(), Some("57"));
    assert_eq!(game.client.current_drawer().await.as_deref(), Some("bob"));

    // Draining later still yields Disconnected, after the queued chat frame.
    assert!(matches!(game.next_event().await, ClientEvent::Chat(_)));
    assert_eq!(
        game.next_event().await,
        ClientEvent::Disconnected { reason: None }
    );

    // Shutdown is seen promptly rather than through the abort path.
    let started = tokio::time::Instant::now();
    game.client.shutdown().await;
    assert!(started.elapsed() < Duration::from_millis(100));
    assert!(game.events.recv().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn shutdown_with_a_parked_disconnect_still_completes() {
    let config = ScribbleConfig::new("alice")
        .with_event_channel_capacity(1)
        .with_shutdown_timeout(5 * SECOND);
    let mut game = start_game_with(RecordingRenderer::new(), config).await;
    game.push(json!({"type": "guess", "name": "bob", "guess": "owl"}).to_string())
        .await;
    game.server.hang_up();
    settle().await;

    let events = &mut game.events;
    let (_, drained) = tokio::join!(game.client.shutdown(), async {
        let mut seen = Vec::new();
        while let Some(event) = events.recv().await {
            seen.push(event);
        }
        seen
    });
    assert_eq!(drained.len(), 2);
    assert_eq!(drained[1], ClientEvent::Disconnected { reason: None });
}

#[tokio::test(start_paused = true)]
async fn receive_error_emits_disconnected_with_reason() {
    let mut game = start_game("alice").await;
    game.server.fail("connection reset");

    match game.next_event().await {
        ClientEvent::Disconnected {
            reason: Some(reason),
        } => assert!(reason.contains("connection reset"), "reason: {reason}"),
        other => panic!("expected Disconnected with a reason, got {other:?}"),
    }
    assert!(!game.client.is_connected());
}

#[tokio::test(start_paused = true)]
async fn shutdown_closes_the_transport_and_ends_the_event_stream() {
    let mut game = start_game("alice").await;
    assert!(game.client.is_connected());

    game.client.shutdown().await;

    assert!(game.server.was_closed());
    assert_eq!(
        game.next_event().await,
        ClientEvent::Disconnected {
            reason: Some("client shut down".into())
        }
    );
    assert!(game.events.recv().await.is_none());
    assert_eq!(game.client.connection_state(), ConnectionState::Closed);
    assert!(game.client.choose_word("apple").is_err());
}
