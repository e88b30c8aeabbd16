//! Transient UI surfaces and their show/auto-hide lifecycle.
//!
//! Modal-tier surfaces are exclusive: opening one closes whichever other
//! modal is open. Non-modal surfaces coexist with anything.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use tracing::{debug, warn};

use crate::render::Renderer;
use crate::timer::{Scheduler, TimerFired, TimerHandle, TimerSlot};

/// The fixed set of transient surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Surface {
    NewGame,
    TurnCountdown,
    Leaderboard,
    ScoreReveal,
    FinalScore,
    WordChoice,
    DrawerChoosing,
}

impl Surface {
    pub const ALL: [Surface; 7] = [
        Surface::NewGame,
        Surface::TurnCountdown,
        Surface::Leaderboard,
        Surface::ScoreReveal,
        Surface::FinalScore,
        Surface::WordChoice,
        Surface::DrawerChoosing,
    ];

    pub const fn is_modal(self) -> bool {
        !matches!(self, Surface::TurnCountdown | Surface::Leaderboard)
    }
}

/// Visibility and pending auto-hide of every surface.
#[derive(Debug, Default)]
pub struct Surfaces {
    visible: HashSet<Surface>,
    auto_hide: HashMap<Surface, TimerHandle>,
}

impl Surfaces {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_visible(&self, surface: Surface) -> bool {
        self.visible.contains(&surface)
    }

    /// Visible surfaces in [`Surface::ALL`] order.
    pub fn visible(&self) -> Vec<Surface> {
        Surface::ALL
            .into_iter()
            .filter(|surface| self.visible.contains(surface))
            .collect()
    }

    /// The open modal-tier surface, if any.
    pub fn open_modal(&self) -> Option<Surface> {
        Surface::ALL
            .into_iter()
            .find(|surface| surface.is_modal() && self.visible.contains(surface))
    }

    /// Show `surface`, closing any other open modal first if it is modal.
    ///
    /// A pending auto-hide left over from an earlier opening is dropped.
    pub fn open(&mut self, surface: Surface, renderer: &mut dyn Renderer) {
        if surface.is_modal() {
            if let Some(previous) = self.open_modal().filter(|open| *open != surface) {
                debug!(?previous, next = ?surface, "closing modal superseded by another");
                self.close(previous, renderer);
            }
        }
        self.auto_hide.remove(&surface);
        self.visible.insert(surface);
        renderer.show(surface);
    }

    /// [`open`](Self::open) `surface` and hide it again after `after`, unless
    /// something closes it first.
    pub fn open_for(
        &mut self,
        surface: Surface,
        after: Duration,
        scheduler: &mut Scheduler,
        renderer: &mut dyn Renderer,
    ) {
        self.open(surface, renderer);
        let handle = scheduler.after(TimerSlot::AutoHide(surface), after);
        self.auto_hide.insert(surface, handle);
    }

    /// Hide `surface` and cancel its auto-hide. Returns `false` if it was
    /// already hidden.
    pub fn close(&mut self, surface: Surface, renderer: &mut dyn Renderer) -> bool {
        self.auto_hide.remove(&surface);
        if self.visible.remove(&surface) {
            renderer.hide(surface);
            true
        } else {
            false
        }
    }

    /// React to an auto-hide firing.
    ///
    /// The surface is hidden only if `fired` belongs to its current auto-hide
    /// and the surface is still visible.
    pub fn on_auto_hide(
        &mut self,
        surface: Surface,
        fired: &TimerFired,
        renderer: &mut dyn Renderer,
    ) -> bool {
        match self.auto_hide.get(&surface) {
            Some(handle) if handle.owns(fired) => {}
            _ => {
                debug!(?surface, "ignoring stale auto-hide");
                return false;
            }
        }
        self.auto_hide.remove(&surface);
        if !self.is_visible(surface) {
            return false;
        }
        debug!(?surface, "auto-hiding surface");
        self.close(surface, renderer)
    }

    /// Hide every visible surface, modal or not. Returns how many were hidden.
    pub fn clear_all(&mut self, renderer: &mut dyn Renderer) -> usize {
        if !Surface::ALL
            .into_iter()
            .any(|surface| renderer.has_surface(surface))
        {
            warn!("no surfaces registered to clear");
        }
        let mut hidden = 0;
        for surface in self.visible() {
            if self.close(surface, renderer) {
                hidden += 1;
            }
        }
        hidden
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
    use crate::render::{ListItem, Region};
    use crate::test_support::capture_logs;
    use tokio::time;

    #[derive(Default)]
    struct Log {
        calls: Vec<(Surface, bool)>,
        bare: bool,
    }

    impl Renderer for Log {
        fn set_text(&mut self, _region: Region, _text: &str) {}
        fn set_list(&mut self, _region: Region, _items: &[ListItem]) {}
        fn show(&mut self, surface: Surface) {
            self.calls.push((surface, true));
        }
        fn hide(&mut self, surface: Surface) {
            self.calls.push((surface, false));
        }
        fn has_surface(&self, _surface: Surface) -> bool {
            !self.bare
        }
    }

    #[test]
    fn modal_tier_membership() {
        let modal: Vec<Surface> = Surface::ALL.into_iter().filter(|s| s.is_modal()).collect();
        assert_eq!(
            modal,
            vec![
                Surface::NewGame,
                Surface::ScoreReveal,
                Surface::FinalScore,
                Surface::WordChoice,
                Surface::DrawerChoosing,
            ]
        );
    }

    #[test]
    fn opening_a_modal_closes_the_previous_one() {
        let mut surfaces = Surfaces::new();
        let mut log = Log::default();
        surfaces.open(Surface::ScoreReveal, &mut log);
        surfaces.open(Surface::WordChoice, &mut log);

        assert!(!surfaces.is_visible(Surface::ScoreReveal));
        assert_eq!(surfaces.open_modal(), Some(Surface::WordChoice));
        assert_eq!(
            log.calls,
            vec![
                (Surface::ScoreReveal, true),
                (Surface::ScoreReveal, false),
                (Surface::WordChoice, true),
            ]
        );
    }

    #[test]
    fn non_modal_surfaces_coexist_with_a_modal() {
        let mut surfaces = Surfaces::new();
        let mut log = Log::default();
        surfaces.open(Surface::Leaderboard, &mut log);
        surfaces.open(Surface::TurnCountdown, &mut log);
        surfaces.open(Surface::FinalScore, &mut log);

        assert_eq!(
            surfaces.visible(),
            vec![Surface::TurnCountdown, Surface::Leaderboard, Surface::FinalScore]
        );
    }

    #[test]
    fn clear_all_hides_everything() {
        let mut surfaces = Surfaces::new();
        let mut log = Log::default();
        surfaces.open(Surface::Leaderboard, &mut log);
        surfaces.open(Surface::DrawerChoosing, &mut log);

        assert_eq!(surfaces.clear_all(&mut log), 2);
        assert!(surfaces.visible().is_empty());
        assert_eq!(surfaces.clear_all(&mut log), 0);
    }

    #[test]
    fn clear_all_without_registered_surfaces_still_succeeds() {
        let mut surfaces = Surfaces::new();
        let mut log = Log {
            bare: true,
            ..Log::default()
        };
        surfaces.open(Surface::NewGame, &mut log);

        let (hidden, logs) = capture_logs(|| surfaces.clear_all(&mut log));
        assert_eq!(hidden, 1);
        assert!(logs.has("WARN", "no surfaces registered to clear"));
    }

    #[test]
    fn clear_all_with_surfaces_does_not_warn() {
        let mut surfaces = Surfaces::new();
        let mut log = Log::default();
        let (_, logs) = capture_logs(|| surfaces.clear_all(&mut log));
        assert!(!logs.has("WARN", "no surfaces registered"));
    }

    #[tokio::test(start_paused = true)]
    async fn auto_hide_closes_a_visible_surface() {
        let (mut scheduler, mut rx) = Scheduler::new();
        let mut surfaces = Surfaces::new();
        let mut log = Log::default();
        surfaces.open_for(
            Surface::ScoreReveal,
            Duration::from_secs(5),
            &mut scheduler,
            &mut log,
        );

        let fired = rx.recv().await.unwrap();
        assert!(surfaces.on_auto_hide(Surface::ScoreReveal, &fired, &mut log));
        assert!(!surfaces.is_visible(Surface::ScoreReveal));
    }

    #[tokio::test(start_paused = true)]
    async fn explicit_close_cancels_auto_hide() {
        let (mut scheduler, mut rx) = Scheduler::new();
        let mut surfaces = Surfaces::new();
        let mut log = Log::default();
        surfaces.open_for(
            Surface::DrawerChoosing,
            Duration::from_secs(5),
            &mut scheduler,
            &mut log,
        );
        surfaces.close(Surface::DrawerChoosing, &mut log);

        assert!(time::timeout(Duration::from_secs(10), rx.recv())
            .await
            .is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn stale_auto_hide_does_not_close_a_reopened_surface() {
        let (mut scheduler, mut rx) = Scheduler::new();
        let mut surfaces = Surfaces::new();
        let mut log = Log::default();
        surfaces.open_for(
            Surface::WordChoice,
            Duration::from_secs(1),
            &mut scheduler,
            &mut log,
        );
        let stale = rx.recv().await.unwrap();
        surfaces.open_for(
            Surface::WordChoice,
            Duration::from_secs(5),
            &mut scheduler,
            &mut log,
        );

        assert!(!surfaces.on_auto_hide(Surface::WordChoice, &stale, &mut log));
        assert!(surfaces.is_visible(Surface::WordChoice));
    }
}
