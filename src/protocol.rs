//! Wire types for the drawing-and-guessing game protocol.
//!
//! Every frame is a flat JSON object tagged by a string `type` field, for
//! example `{"type":"new_turn","drawer":"alice","turn":3,"timeout":80}`.
//! Inbound frames fall into three streams:
//!
//! - drawing frames (`drawing`, `clear_canvas`) forwarded untouched to the canvas,
//! - chat frames (`guess`, `chat_message`, `player_joined`, `player_left`)
//!   forwarded untouched to the chat,
//! - control events ([`ServerEvent`]) interpreted by the session.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, ScribbleError};

/// Player identity. The server identifies players by display name.
pub type PlayerId = String;

/// Frame types forwarded to the canvas collaborator.
pub const CANVAS_TYPES: &[&str] = &["drawing", "clear_canvas"];

/// Frame types forwarded to the chat collaborator.
pub const CHAT_TYPES: &[&str] = &["guess", "chat_message", "player_joined", "player_left"];

/// Frame types decoded into a [`ServerEvent`].
pub const CONTROL_TYPES: &[&str] = &[
    "ping",
    "new_game",
    "new_turn",
    "hint_update",
    "skipping_turn",
    "leaderboard_update",
    "display_score",
    "game_over",
    "word_choices",
    "drawer_choosing_word",
    "clear_modal",
];

// ── Structs ─────────────────────────────────────────────────────────

/// One row of a leaderboard or scoreboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreEntry {
    pub name: PlayerId,
    pub score: i64,
}

// ── Messages ────────────────────────────────────────────────────────

/// Control events pushed by the server.
///
/// All `timeout` fields are whole seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Keep-alive from the server.
    Ping,
    /// A new game is about to begin.
    NewGame { timeout: u32 },
    /// A new turn started with `drawer` at the canvas.
    NewTurn {
        drawer: PlayerId,
        turn: u32,
        timeout: u32,
    },
    /// More of the current word has been revealed.
    HintUpdate { hint: String },
    /// The active turn is being skipped.
    SkippingTurn,
    /// Running scores, in server order.
    LeaderboardUpdate { leaderboard: Vec<ScoreEntry> },
    /// End-of-turn score reveal, including the word that was being drawn.
    DisplayScore {
        word: String,
        scoreboard: Vec<ScoreEntry>,
        timeout: u32,
    },
    /// Final standings.
    GameOver {
        scoreboard: Vec<ScoreEntry>,
        timeout: u32,
    },
    /// Words the drawer may pick from.
    WordChoices { choices: Vec<String>, timeout: u32 },
    /// Another player is picking their word.
    DrawerChoosingWord { timeout: u32 },
    /// Close every open surface.
    ClearModal,
}

/// Messages sent from client to server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// The drawer picked the word they will draw.
    WordChosen { word: String, name: PlayerId },
}

// ── Classification ──────────────────────────────────────────────────

/// An inbound frame after classification.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundFrame {
    /// Opaque drawing-stream frame, kept verbatim.
    Canvas(Value),
    /// Opaque chat-stream frame, kept verbatim.
    Chat(Value),
    /// Decoded control event.
    Control(ServerEvent),
    /// Well-formed frame with a `type` nobody handles.
    Unknown(String),
}

impl InboundFrame {
    /// Parse and classify a raw frame.
    ///
    /// Canvas and chat types are checked before control types, first match wins.
    ///
    /// # Errors
    ///
    /// Returns [`ScribbleError::Serialization`] if the bytes are not JSON or a
    /// control event's payload does not match its type, and
    /// [`ScribbleError::MalformedFrame`] if there is no string `type` field.
    pub fn parse(raw: &[u8]) -> Result<Self> {
        let value: Value = serde_json::from_slice(raw)?;
        let tag = match value.get("type") {
            Some(Value::String(tag)) => tag.clone(),
            Some(_) => {
                return Err(ScribbleError::MalformedFrame(
                    "`type` field is not a string".into(),
                ))
            }
            None => return Err(ScribbleError::MalformedFrame("missing `type` field".into())),
        };

        if CANVAS_TYPES.contains(&tag.as_str()) {
            Ok(Self::Canvas(value))
        } else if CHAT_TYPES.contains(&tag.as_str()) {
            Ok(Self::Chat(value))
        } else if CONTROL_TYPES.contains(&tag.as_str()) {
            Ok(Self::Control(serde_json::from_value(value)?))
        } else {
            Ok(Self::Unknown(tag))
        }
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
    use serde_json::json;

    fn parse(value: &Value) -> Result<InboundFrame> {
        InboundFrame::parse(value.to_string().as_bytes())
    }

    #[test]
    fn every_control_variant_uses_a_control_tag() {
        let events = vec![
            ServerEvent::Ping,
            ServerEvent::NewGame { timeout: 5 },
            ServerEvent::NewTurn {
                drawer: "a".into(),
                turn: 1,
                timeout: 5,
            },
            ServerEvent::HintUpdate { hint: "_ a _".into() },
            ServerEvent::SkippingTurn,
            ServerEvent::LeaderboardUpdate {
                leaderboard: vec![],
            },
            ServerEvent::DisplayScore {
                word: "cat".into(),
                scoreboard: vec![],
                timeout: 5,
            },
            ServerEvent::GameOver {
                scoreboard: vec![],
                timeout: 5,
            },
            ServerEvent::WordChoices {
                choices: vec![],
                timeout: 5,
            },
            ServerEvent::DrawerChoosingWord { timeout: 5 },
            ServerEvent::ClearModal,
        ];
        assert_eq!(events.len(), CONTROL_TYPES.len());
        for event in events {
            let value = serde_json::to_value(&event).unwrap();
            let tag = value["type"].as_str().unwrap();
            assert!(CONTROL_TYPES.contains(&tag), "{tag} missing");
        }
    }

    #[test]
    fn drawing_frames_are_forwarded_verbatim() {
        let frame = json!({"type": "drawing", "x": 3, "y": 4, "color": "#000"});
        assert_eq!(parse(&frame).unwrap(), InboundFrame::Canvas(frame));
    }

    #[test]
    fn chat_frames_are_forwarded_verbatim() {
        let frame = json!({"type": "player_joined", "name": "bob"});
        assert_eq!(parse(&frame).unwrap(), InboundFrame::Chat(frame));
    }

    #[test]
    fn new_turn_decodes() {
        let frame = json!({"type": "new_turn", "drawer": "alice", "turn": 3, "timeout": 80});
        assert_eq!(
            parse(&frame).unwrap(),
            InboundFrame::Control(ServerEvent::NewTurn {
                drawer: "alice".into(),
                turn: 3,
                timeout: 80,
            })
        );
    }

    #[test]
    fn unit_events_ignore_extra_fields() {
        let frame = json!({"type": "ping", "message": "hello"});
        assert_eq!(
            parse(&frame).unwrap(),
            InboundFrame::Control(ServerEvent::Ping)
        );
    }

    #[test]
    fn unknown_type_is_not_an_error() {
        let frame = json!({"type": "confetti", "amount": 9});
        assert_eq!(
            parse(&frame).unwrap(),
            InboundFrame::Unknown("confetti".into())
        );
    }

    #[test]
    fn missing_type_is_malformed() {
        let err = parse(&json!({"drawer": "alice"})).unwrap_err();
        assert!(matches!(err, ScribbleError::MalformedFrame(_)));
    }

    #[test]
    fn non_string_type_is_malformed() {
        let err = parse(&json!({"type": 7})).unwrap_err();
        assert!(matches!(err, ScribbleError::MalformedFrame(_)));
    }

    #[test]
    fn control_payload_mismatch_is_a_serialization_error() {
        let err = parse(&json!({"type": "new_turn", "drawer": "alice"})).unwrap_err();
        assert!(matches!(err, ScribbleError::Serialization(_)));
    }

    #[test]
    fn invalid_json_is_a_serialization_error() {
        let err = InboundFrame::parse(b"{not json").unwrap_err();
        assert!(matches!(err, ScribbleError::Serialization(_)));
    }

    #[test]
    fn word_chosen_wire_shape() {
        let msg = ClientMessage::WordChosen {
            word: "cat".into(),
            name: "alice".into(),
        };
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({"type": "word_chosen", "word": "cat", "name": "alice"})
        );
    }
}
