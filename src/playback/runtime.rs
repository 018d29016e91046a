//! Tokio-backed scheduler and async driver.
//!
//! Each timer is a spawned task that sleeps and then reports its [`TimerId`]
//! on a channel. [`run_until_idle`] feeds those ids back into the engine.

use std::collections::HashMap;
use std::time::Duration;

use log::debug;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

use super::{MapAdapter, PlaybackEngine, Scheduler, StatusSurface, TickOutcome, TimerId};

/// Scheduler backed by `tokio::time::sleep`.
pub struct TokioScheduler {
    handle: Handle,
    sender: UnboundedSender<TimerId>,
    next_id: u64,
    timers: HashMap<TimerId, JoinHandle<()>>,
}

impl TokioScheduler {
    /// Create a scheduler and the receiver its fired timers arrive on.
    pub fn new(handle: Handle) -> (Self, UnboundedReceiver<TimerId>) {
        let (sender, receiver) = unbounded_channel();
        let scheduler = Self {
            handle,
            sender,
            next_id: 0,
            timers: HashMap::new(),
        };
        (scheduler, receiver)
    }

    /// Scheduler on the runtime of the calling task.
    ///
    /// Panics outside a tokio runtime, like `Handle::current`.
    pub fn current() -> (Self, UnboundedReceiver<TimerId>) {
        Self::new(Handle::current())
    }

    pub fn armed_count(&self) -> usize {
        self.timers.values().filter(|t| !t.is_finished()).count()
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&mut self, delay: Duration) -> TimerId {
        self.timers.retain(|_, task| !task.is_finished());

        self.next_id += 1;
        let id = TimerId(self.next_id);
        let sender = self.sender.clone();
        let task = self.handle.spawn(async move {
            tokio::time::sleep(delay).await;
            // Receiver gone means nobody drives the engine anymore
            let _ = sender.send(id);
        });
        self.timers.insert(id, task);
        id
    }

    fn cancel(&mut self, timer: TimerId) {
        if let Some(task) = self.timers.remove(&timer) {
            task.abort();
        }
    }
}

/// Drive `engine` until its session is released, stopped, or preempted.
///
/// Returns every tick outcome in order.
pub async fn run_until_idle<M, U>(
    engine: &mut PlaybackEngine<M, U, TokioScheduler>,
    timers: &mut UnboundedReceiver<TimerId>,
) -> Vec<TickOutcome>
where
    M: MapAdapter,
    U: StatusSurface,
{
    let mut outcomes = Vec::new();
    while engine.is_active() {
        let Some(timer) = timers.recv().await else {
            break;
        };
        let outcome = engine.tick(timer);
        debug!("[Playback] timer {:?} -> {:?}", timer, outcome);
        outcomes.push(outcome);
    }
    outcomes
}
