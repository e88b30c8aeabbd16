//! The rendering collaborator.
//!
//! The session never inspects what is on screen. It pushes text, lists and
//! surface visibility through [`Renderer`], and an implementation that lacks a
//! given region or surface simply ignores the call.

use tracing::info;

use crate::surface::Surface;

/// Named text or list regions the session writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Region {
    /// Pre-game countdown text.
    Timer,
    /// Partially revealed word.
    Hint,
    /// Round counter.
    Round,
    /// Turn countdown text.
    Countdown,
    /// Running leaderboard list.
    Leaderboard,
    /// Score-reveal list.
    ScoreList,
    /// Final standings list.
    FinalScoreList,
    /// "The word is: …" line of the score reveal.
    RevealedWord,
    /// Selectable word choices.
    WordChoices,
    /// "… is choosing a word" notice.
    DrawerChoosing,
}

/// One rendered list row.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ListItem {
    pub text: String,
    /// Row describes this client's player.
    pub is_local_player: bool,
    /// Row describes the player currently drawing.
    pub is_drawer: bool,
    /// Row can be picked by the user.
    pub selectable: bool,
}

impl ListItem {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }
}

/// Capability interface over whatever displays the game.
///
/// Every method must be a no-op when the target is absent; missing targets are
/// not errors.
pub trait Renderer: Send + 'static {
    /// Replace the text of `region`.
    fn set_text(&mut self, region: Region, text: &str);

    /// Replace the contents of list `region`, preserving order.
    fn set_list(&mut self, region: Region, items: &[ListItem]);

    fn show(&mut self, surface: Surface);

    fn hide(&mut self, surface: Surface);

    /// Whether `surface` exists in this renderer at all.
    fn has_surface(&self, surface: Surface) -> bool {
        let _ = surface;
        true
    }
}

/// Headless renderer that reports every update through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingRenderer;

impl Renderer for TracingRenderer {
    fn set_text(&mut self, region: Region, text: &str) {
        info!(?region, text, "render text");
    }

    fn set_list(&mut self, region: Region, items: &[ListItem]) {
        let rows: Vec<&str> = items.iter().map(|item| item.text.as_str()).collect();
        info!(?region, ?rows, "render list");
    }

    fn show(&mut self, surface: Surface) {
        info!(?surface, "show surface");
    }

    fn hide(&mut self, surface: Surface) {
        info!(?surface, "hide surface");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn list_item_defaults_to_plain_row() {
        let item = ListItem::new("bob: 10");
        assert_eq!(item.text, "bob: 10");
        assert!(!item.is_local_player && !item.is_drawer && !item.selectable);
    }

    #[test]
    fn renderers_have_every_surface_unless_they_say_otherwise() {
        let renderer = TracingRenderer;
        assert!(Surface::ALL.into_iter().all(|s| renderer.has_surface(s)));
    }
}
