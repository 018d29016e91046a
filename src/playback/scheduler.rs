//! Timer abstraction driving the playback engine.
//!
//! The engine never sleeps. It asks a [`Scheduler`] for a timer and expects the
//! host to hand the fired [`TimerId`] back through `PlaybackEngine::tick`.

use std::time::Duration;

/// Opaque identifier of a scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(pub u64);

/// One-shot timer primitive.
pub trait Scheduler {
    /// Arm a timer that fires once after `delay`.
    fn schedule(&mut self, delay: Duration) -> TimerId;

    /// Disarm a timer. Cancelling an unknown or already fired timer is a no-op.
    fn cancel(&mut self, timer: TimerId);
}

/// Deterministic scheduler with a virtual clock.
///
/// Nothing fires on its own: [`VirtualClock::fire_next`] jumps the clock to
/// the earliest pending timer and returns it.
#[derive(Debug, Default)]
pub struct VirtualClock {
    now: Duration,
    next_id: u64,
    pending: Vec<(Duration, TimerId)>,
    history: Vec<Duration>,
}

impl VirtualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Virtual time elapsed since creation.
    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Every delay ever requested, in scheduling order.
    pub fn scheduled_delays(&self) -> &[Duration] {
        &self.history
    }

    /// Advance to the earliest pending timer and return it.
    ///
    /// Timers due at the same instant fire in scheduling order.
    pub fn fire_next(&mut self) -> Option<TimerId> {
        let (pos, _) = self
            .pending
            .iter()
            .enumerate()
            .min_by_key(|(_, (due, id))| (*due, *id))?;
        let (due, id) = self.pending.remove(pos);
        self.now = self.now.max(due);
        Some(id)
    }
}

impl Scheduler for VirtualClock {
    fn schedule(&mut self, delay: Duration) -> TimerId {
        self.next_id += 1;
        let id = TimerId(self.next_id);
        self.pending.push((self.now + delay, id));
        self.history.push(delay);
        id
    }

    fn cancel(&mut self, timer: TimerId) {
        self.pending.retain(|(_, id)| *id != timer);
    }
}
