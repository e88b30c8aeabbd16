//! Countdown primitives driven by the session loop.
//!
//! Timer tasks never touch session state. Each one only posts a
//! [`TimerFired`] into the scheduler's queue, which the session loop drains
//! alongside inbound frames. The owner of a timer keeps its [`TimerHandle`];
//! a firing is acted on only if the owner still holds the handle whose id it
//! carries. Replacing or dropping the handle aborts the task, and any firing
//! that was already queued is recognised as stale and discarded.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tokio::time::{self, Instant};
use tracing::debug;

use crate::surface::Surface;

/// Shortest period accepted by [`Scheduler::every`].
const MIN_PERIOD: Duration = Duration::from_millis(1);

/// Named slot a timer belongs to.
///
/// Timers in the same slot supersede each other. Timers in different slots
/// never interact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerSlot {
    /// Pre-game countdown.
    NewGame,
    /// Grace window after the pre-game countdown, before its banner hides.
    FinalStretch,
    /// Turn countdown.
    Turn,
    /// Auto-hide of a surface.
    AutoHide(Surface),
}

/// Identity of one started timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

/// A tick or expiry posted by a timer task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerFired {
    pub slot: TimerSlot,
    pub id: TimerId,
}

// ── TimerHandle ─────────────────────────────────────────────────────

/// Ownership of a running timer task. Dropping it cancels the timer.
#[derive(Debug)]
pub struct TimerHandle {
    slot: TimerSlot,
    id: TimerId,
    task: AbortHandle,
}

impl TimerHandle {
    pub fn id(&self) -> TimerId {
        self.id
    }

    /// Returns `true` if `fired` was posted by this timer.
    pub fn owns(&self, fired: &TimerFired) -> bool {
        self.slot == fired.slot && self.id == fired.id
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

// ── Scheduler ───────────────────────────────────────────────────────

/// Spawns timer tasks that report into a single queue.
#[derive(Debug)]
pub struct Scheduler {
    fired_tx: mpsc::UnboundedSender<TimerFired>,
    next_id: u64,
}

impl Scheduler {
    /// Create a scheduler and the receiver its timers report to.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<TimerFired>) {
        let (fired_tx, fired_rx) = mpsc::unbounded_channel();
        (
            Self {
                fired_tx,
                next_id: 0,
            },
            fired_rx,
        )
    }

    /// Start a repeating timer whose first firing is one `period` from now.
    ///
    /// Periods shorter than one millisecond are clamped.
    pub fn every(&mut self, slot: TimerSlot, period: Duration) -> TimerHandle {
        let period = period.max(MIN_PERIOD);
        let fired = self.next_firing(slot);
        let tx = self.fired_tx.clone();
        // Measured from the caller, not from when the task is first polled.
        let first = Instant::now() + period;
        let task = tokio::spawn(async move {
            let mut ticks = time::interval_at(first, period);
            loop {
                ticks.tick().await;
                if tx.send(fired).is_err() {
                    break;
                }
            }
        });
        debug!(?slot, id = fired.id.0, ?period, "repeating timer started");
        self.handle(fired, task.abort_handle())
    }

    /// Start a one-shot timer that fires once after `delay`.
    pub fn after(&mut self, slot: TimerSlot, delay: Duration) -> TimerHandle {
        let fired = self.next_firing(slot);
        let tx = self.fired_tx.clone();
        let deadline = Instant::now() + delay;
        let task = tokio::spawn(async move {
            time::sleep_until(deadline).await;
            let _ = tx.send(fired);
        });
        debug!(?slot, id = fired.id.0, ?delay, "one-shot timer started");
        self.handle(fired, task.abort_handle())
    }

    fn next_firing(&mut self, slot: TimerSlot) -> TimerFired {
        self.next_id += 1;
        TimerFired {
            slot,
            id: TimerId(self.next_id),
        }
    }

    fn handle(&self, fired: TimerFired, task: AbortHandle) -> TimerHandle {
        TimerHandle {
            slot: fired.slot,
            id: fired.id,
            task,
        }
    }
}

// ── Countdown ───────────────────────────────────────────────────────

/// A whole-second countdown ticking on a fixed cadence.
///
/// The remaining count only changes when the owner calls
/// [`decrement`](Countdown::decrement) in response to one of its own ticks.
#[derive(Debug)]
pub struct Countdown {
    remaining: u32,
    ticker: TimerHandle,
}

impl Countdown {
    pub fn start(scheduler: &mut Scheduler, slot: TimerSlot, seconds: u32, period: Duration) -> Self {
        Self {
            remaining: seconds,
            ticker: scheduler.every(slot, period),
        }
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn owns(&self, fired: &TimerFired) -> bool {
        self.ticker.owns(fired)
    }

    /// Count down one second, saturating at zero.
    pub fn decrement(&mut self) -> u32 {
        self.remaining = self.remaining.saturating_sub(1);
        self.remaining
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

    const SECOND: Duration = Duration::from_secs(1);

    #[tokio::test(start_paused = true)]
    async fn repeating_timer_fires_on_cadence() {
        let (mut scheduler, mut rx) = Scheduler::new();
        let start = Instant::now();
        let handle = scheduler.every(TimerSlot::Turn, SECOND);

        let first = rx.recv().await.unwrap();
        assert!(handle.owns(&first));
        assert_eq!(start.elapsed(), SECOND);

        let second = rx.recv().await.unwrap();
        assert_eq!(first, second);
        assert_eq!(start.elapsed(), 2 * SECOND);
    }

    #[tokio::test(start_paused = true)]
    async fn deadlines_are_measured_from_when_the_timer_was_started() {
        let (mut scheduler, mut rx) = Scheduler::new();
        let start = Instant::now();
        let _ticker = scheduler.every(TimerSlot::Turn, SECOND);
        let _hide = scheduler.after(TimerSlot::AutoHide(Surface::WordChoice), 2 * SECOND);

        // The clock moves before either task is polled for the first time.
        time::advance(Duration::from_millis(400)).await;

        let tick = rx.recv().await.unwrap();
        assert_eq!(tick.slot, TimerSlot::Turn);
        assert_eq!(start.elapsed(), SECOND);

        let mut hidden = None;
        while let Some(fired) = rx.recv().await {
            if fired.slot != TimerSlot::Turn {
                hidden = Some(start.elapsed());
                break;
            }
        }
        assert_eq!(hidden, Some(2 * SECOND));
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_handle_stops_the_timer() {
        let (mut scheduler, mut rx) = Scheduler::new();
        let handle = scheduler.every(TimerSlot::Turn, SECOND);
        drop(handle);

        let waited = time::timeout(5 * SECOND, rx.recv()).await;
        assert!(waited.is_err(), "cancelled timer still fired");
    }

    #[tokio::test(start_paused = true)]
    async fn one_shot_fires_once() {
        let (mut scheduler, mut rx) = Scheduler::new();
        let slot = TimerSlot::AutoHide(Surface::ScoreReveal);
        let _handle = scheduler.after(slot, 3 * SECOND);

        let fired = rx.recv().await.unwrap();
        assert_eq!(fired.slot, slot);
        assert!(time::timeout(10 * SECOND, rx.recv()).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn replacement_handle_does_not_own_older_firings() {
        let (mut scheduler, mut rx) = Scheduler::new();
        let old = scheduler.every(TimerSlot::Turn, SECOND);
        let stale = rx.recv().await.unwrap();
        let new = scheduler.every(TimerSlot::Turn, SECOND);
        drop(old);

        assert!(!new.owns(&stale));
        assert_ne!(new.id(), stale.id);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_period_is_clamped() {
        let (mut scheduler, mut rx) = Scheduler::new();
        let _handle = scheduler.every(TimerSlot::NewGame, Duration::ZERO);
        assert!(rx.recv().await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn countdown_saturates_at_zero() {
        let (mut scheduler, _rx) = Scheduler::new();
        let mut countdown = Countdown::start(&mut scheduler, TimerSlot::Turn, 1, SECOND);
        assert_eq!(countdown.remaining(), 1);
        assert_eq!(countdown.decrement(), 0);
        assert_eq!(countdown.decrement(), 0);
    }
}
