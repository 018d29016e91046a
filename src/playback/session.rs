//! Playback sessions and the process-wide slot holding the live one.
//!
//! A session is owned by the engine that started it. The slot only keeps the
//! session's [`SessionToken`], so a second engine claiming the slot can cancel
//! the first without touching its state. The cancelled engine notices on its
//! next tick.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use once_cell::sync::Lazy;

use super::adapters::MarkerHandle;
use super::scheduler::TimerId;
use super::PlaybackKind;
use crate::sequencer::PlayablePath;

pub type SessionId = u64;

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Slot shared by every engine created with `PlaybackEngine::new`.
static GLOBAL_SLOT: Lazy<SessionSlot> = Lazy::new(SessionSlot::new);

pub(crate) fn next_session_id() -> SessionId {
    NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed)
}

/// Cancellation handle of one session.
#[derive(Debug, Clone)]
pub struct SessionToken {
    id: SessionId,
    cancelled: Arc<AtomicBool>,
}

impl SessionToken {
    pub fn new(id: SessionId) -> Self {
        Self {
            id,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Holds at most one live session token.
#[derive(Debug, Clone, Default)]
pub struct SessionSlot(Arc<Mutex<Option<SessionToken>>>);

impl SessionSlot {
    /// An isolated slot, independent of the global one.
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle to the process-wide slot.
    pub fn global() -> Self {
        GLOBAL_SLOT.clone()
    }

    /// Install `token`, cancelling whatever session held the slot before.
    /// Returns the id of the preempted session.
    pub fn claim(&self, token: SessionToken) -> Option<SessionId> {
        let mut slot = self.0.lock().unwrap_or_else(|e| e.into_inner());
        let previous = slot.replace(token);
        previous.map(|old| {
            old.cancel();
            old.id()
        })
    }

    /// Empty the slot if `id` still holds it.
    pub fn release(&self, id: SessionId) -> bool {
        let mut slot = self.0.lock().unwrap_or_else(|e| e.into_inner());
        match slot.as_ref() {
            Some(token) if token.id() == id => {
                *slot = None;
                true
            }
            _ => false,
        }
    }

    pub fn current(&self) -> Option<SessionId> {
        let slot = self.0.lock().unwrap_or_else(|e| e.into_inner());
        slot.as_ref().map(|t| t.id())
    }

    pub fn is_current(&self, id: SessionId) -> bool {
        self.current() == Some(id)
    }
}

/// One run of the engine over a queue of paths.
#[derive(Debug)]
pub struct PlaybackSession {
    pub(crate) token: SessionToken,
    pub(crate) kind: PlaybackKind,
    pub(crate) paths: Vec<PlayablePath>,
    pub(crate) path_index: usize,
    pub(crate) point_index: usize,
    pub(crate) marker: Option<MarkerHandle>,
    pub(crate) pending_timer: Option<TimerId>,
}

impl PlaybackSession {
    pub(crate) fn new(token: SessionToken, kind: PlaybackKind, paths: Vec<PlayablePath>) -> Self {
        Self {
            token,
            kind,
            paths,
            path_index: 0,
            point_index: 0,
            marker: None,
            pending_timer: None,
        }
    }

    pub fn id(&self) -> SessionId {
        self.token.id()
    }

    pub fn kind(&self) -> PlaybackKind {
        self.kind
    }

    pub fn paths(&self) -> &[PlayablePath] {
        &self.paths
    }

    pub fn path_index(&self) -> usize {
        self.path_index
    }

    /// Index of the next point to draw on the current path.
    pub fn point_index(&self) -> usize {
        self.point_index
    }

    pub fn current_path(&self) -> Option<&PlayablePath> {
        self.paths.get(self.path_index)
    }

    pub fn marker(&self) -> Option<MarkerHandle> {
        self.marker
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}
