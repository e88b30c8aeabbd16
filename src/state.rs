//! Per-session game state.

use crate::protocol::PlayerId;
use crate::timer::{Countdown, TimerHandle};

/// Placeholder shown while no hint has been revealed.
pub const HINT_PLACEHOLDER: &str = "_ _ _ _";

/// Mutable record of one game session.
///
/// Created fresh for each session and owned by exactly one
/// [`Session`](crate::session::Session).
#[derive(Debug)]
pub struct SessionState {
    pub(crate) local_player: PlayerId,
    pub(crate) drawer: PlayerId,
    pub(crate) hint: String,
    pub(crate) turn: Option<u32>,
    pub(crate) game_started: bool,
    /// Only meaningful while `turn_timer` is running; cleared whenever a new
    /// turn countdown starts.
    pub(crate) skip_requested: bool,
    pub(crate) turn_timer: Option<Countdown>,
    pub(crate) new_game_timer: Option<Countdown>,
    pub(crate) final_stretch: Option<TimerHandle>,
    /// Words on offer while the word-choice surface is open.
    pub(crate) word_choices: Vec<String>,
}

impl SessionState {
    pub fn new(local_player: impl Into<PlayerId>) -> Self {
        Self {
            local_player: local_player.into(),
            drawer: PlayerId::new(),
            hint: String::new(),
            turn: None,
            game_started: false,
            skip_requested: false,
            turn_timer: None,
            new_game_timer: None,
            final_stretch: None,
            word_choices: Vec::new(),
        }
    }

    pub fn local_player(&self) -> &str {
        &self.local_player
    }

    /// Current drawer, empty when unset.
    pub fn drawer(&self) -> &str {
        &self.drawer
    }

    pub fn hint(&self) -> &str {
        &self.hint
    }

    pub fn turn(&self) -> Option<u32> {
        self.turn
    }

    pub fn game_started(&self) -> bool {
        self.game_started
    }

    pub fn skip_requested(&self) -> bool {
        self.skip_requested
    }

    /// Whether this client is the one drawing.
    pub fn is_drawer(&self) -> bool {
        self.drawer == self.local_player
    }

    pub fn turn_countdown_active(&self) -> bool {
        self.turn_timer.is_some()
    }

    /// Seconds left on the turn countdown, if one is running.
    pub fn turn_remaining(&self) -> Option<u32> {
        self.turn_timer.as_ref().map(Countdown::remaining)
    }

    /// Text for the hint region.
    pub fn hint_text(&self) -> &str {
        if self.hint.is_empty() {
            HINT_PLACEHOLDER
        } else {
            &self.hint
        }
    }

    /// Text for the round counter region.
    pub fn round_text(&self) -> String {
        match self.turn {
            Some(turn) => format!("Round: {turn}"),
            None => "Round:".to_string(),
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            local_player: self.local_player.clone(),
            drawer: self.drawer.clone(),
            hint: self.hint.clone(),
            turn: self.turn,
            game_started: self.game_started,
            skip_requested: self.skip_requested,
        }
    }
}

/// Point-in-time copy of the plain fields of [`SessionState`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionSnapshot {
    pub local_player: PlayerId,
    pub drawer: PlayerId,
    pub hint: String,
    pub turn: Option<u32>,
    pub game_started: bool,
    pub skip_requested: bool,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn fresh_state_is_unset() {
        let state = SessionState::new("alice");
        assert_eq!(state.local_player(), "alice");
        assert_eq!(state.drawer(), "");
        assert_eq!(state.turn(), None);
        assert!(!state.game_started());
        assert!(!state.skip_requested());
        assert!(!state.is_drawer());
        assert!(!state.turn_countdown_active());
    }

    #[test]
    fn header_texts_fall_back_to_placeholders() {
        let mut state = SessionState::new("alice");
        assert_eq!(state.hint_text(), HINT_PLACEHOLDER);
        assert_eq!(state.round_text(), "Round:");

        state.hint = "c _ t".into();
        state.turn = Some(4);
        assert_eq!(state.hint_text(), "c _ t");
        assert_eq!(state.round_text(), "Round: 4");
    }

    #[test]
    fn drawer_role() {
        let mut state = SessionState::new("alice");
        state.drawer = "alice".into();
        assert!(state.is_drawer());
        state.drawer = "bob".into();
        assert!(!state.is_drawer());
    }
}
