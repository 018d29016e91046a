//! # Playback Engine
//!
//! Moves a marker along a queue of [`PlayablePath`]s, one point per tick.
//!
//! ## State machine
//!
//! ```text
//! Idle --start--> Playing --last point--> Completed --hold timer--> Idle
//!                    |                        |
//!                    +--------stop------------+----------------> Idle
//!                    +--preempted by another engine-----------> Cancelled
//! ```
//!
//! The engine is driven from outside: every timer it arms through its
//! [`Scheduler`] must be handed back to [`PlaybackEngine::tick`]. A tick whose
//! timer is not the one the engine is waiting for does nothing and returns
//! [`TickOutcome::Stale`]. So does a tick whose session was preempted, apart
//! from clearing that session's map layer.

mod adapters;
#[cfg(feature = "runtime")]
pub mod runtime;
mod scheduler;
mod session;

pub use adapters::{MapAdapter, MarkerHandle, StatusSurface};
pub use scheduler::{Scheduler, TimerId, VirtualClock};
pub use session::{PlaybackSession, SessionId, SessionSlot, SessionToken};

use std::time::Duration;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::error::{PlaybackError, Result};
use crate::sequencer::PlayablePath;

// ============================================================================
// Configuration
// ============================================================================

/// Timing and speed limits for playback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Base delay between points for multi-leg playback, in milliseconds.
    /// Default: 500
    pub plan_step_delay_ms: u64,

    /// Base delay between points for single-trip playback, in milliseconds.
    /// Default: 500
    pub trip_step_delay_ms: u64,

    /// Pan the map every this many points (and always on the final point).
    /// Default: 20
    pub pan_every: usize,

    /// How long the completion message stays up after a plan finishes.
    /// Default: 2500
    pub plan_hold_ms: u64,

    /// How long the completion message stays up after a single trip finishes.
    /// Default: 3000
    pub trip_hold_ms: u64,

    /// Speed used when none or a non-finite one is given. Default: 1.0
    pub default_speed: f64,

    /// Default: 0.1
    pub min_speed: f64,

    /// Default: 100.0
    pub max_speed: f64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            plan_step_delay_ms: 500,
            trip_step_delay_ms: 500,
            pan_every: 20,
            plan_hold_ms: 2500,
            trip_hold_ms: 3000,
            default_speed: 1.0,
            min_speed: 0.1,
            max_speed: 100.0,
        }
    }
}

impl PlaybackConfig {
    /// Parse a possibly partial JSON object; missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |message: &str| {
            Err(PlaybackError::InvalidConfig {
                message: message.to_string(),
            })
        };

        if self.plan_step_delay_ms == 0 || self.trip_step_delay_ms == 0 {
            return invalid("step delays must be positive");
        }
        if self.pan_every == 0 {
            return invalid("pan_every must be at least 1");
        }
        if !(self.min_speed.is_finite() && self.max_speed.is_finite()) || self.min_speed <= 0.0 {
            return invalid("speed limits must be finite and positive");
        }
        if self.min_speed > self.max_speed {
            return invalid("min_speed exceeds max_speed");
        }
        if !self.default_speed.is_finite()
            || self.default_speed < self.min_speed
            || self.default_speed > self.max_speed
        {
            return invalid("default_speed outside [min_speed, max_speed]");
        }
        Ok(())
    }

    /// Clamp a requested multiplier into the allowed range.
    pub fn clamp_speed(&self, speed: f64) -> f64 {
        if speed.is_finite() {
            speed.clamp(self.min_speed, self.max_speed)
        } else {
            self.default_speed
        }
    }

    pub fn step_delay_ms(&self, kind: PlaybackKind) -> u64 {
        match kind {
            PlaybackKind::Plan => self.plan_step_delay_ms,
            PlaybackKind::Trip => self.trip_step_delay_ms,
        }
    }

    pub fn hold_ms(&self, kind: PlaybackKind) -> u64 {
        match kind {
            PlaybackKind::Plan => self.plan_hold_ms,
            PlaybackKind::Trip => self.trip_hold_ms,
        }
    }
}

// ============================================================================
// Engine Types
// ============================================================================

/// What is being played: a multi-leg plan or a single trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaybackKind {
    Plan,
    Trip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Playing,
    /// Final point drawn; waiting for the hold timer.
    Completed,
    /// Preempted by a session started elsewhere on the same slot.
    Cancelled,
}

/// Result of one [`PlaybackEngine::tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Nothing happened: cancelled session or unexpected timer.
    Stale,
    /// Marker moved to `point_index` of path `path_index`.
    Advanced {
        path_index: usize,
        point_index: usize,
        progress: u8,
    },
    /// Previous path finished; path `path_index` is now current.
    NextPath { path_index: usize },
    /// Final point of the final path drawn.
    Completed,
    /// Hold elapsed; the engine is idle again.
    Released,
}

/// Percentage of `len` points covered once point `index` is drawn.
///
/// # Example
/// ```
/// use trip_playback::playback::progress_percent;
///
/// assert_eq!(progress_percent(0, 5), 0);
/// assert_eq!(progress_percent(2, 5), 50);
/// assert_eq!(progress_percent(4, 5), 100);
/// ```
pub fn progress_percent(index: usize, len: usize) -> u8 {
    if len < 2 {
        return 100;
    }
    let ratio = index.min(len - 1) as f64 / (len - 1) as f64;
    (ratio * 100.0).round() as u8
}

// ============================================================================
// Engine
// ============================================================================

/// Timer-driven playback over a map adapter and a status surface.
pub struct PlaybackEngine<M, U, S> {
    config: PlaybackConfig,
    map: M,
    status: U,
    scheduler: S,
    slot: SessionSlot,
    session: Option<PlaybackSession>,
    state: PlaybackState,
    speed: f64,
}

impl<M, U, S> PlaybackEngine<M, U, S>
where
    M: MapAdapter,
    U: StatusSurface,
    S: Scheduler,
{
    /// Engine bound to the process-wide session slot.
    pub fn new(config: PlaybackConfig, map: M, status: U, scheduler: S) -> Result<Self> {
        Self::with_slot(config, map, status, scheduler, SessionSlot::global())
    }

    /// Engine bound to a caller-provided slot.
    pub fn with_slot(
        config: PlaybackConfig,
        map: M,
        status: U,
        scheduler: S,
        slot: SessionSlot,
    ) -> Result<Self> {
        config.validate()?;
        let speed = config.default_speed;
        Ok(Self {
            config,
            map,
            status,
            scheduler,
            slot,
            session: None,
            state: PlaybackState::Idle,
            speed,
        })
    }

    /// Start playing `paths`, replacing any running session.
    ///
    /// The first point is drawn before this returns. An empty queue is a
    /// no-op and returns `None`.
    pub fn start(
        &mut self,
        kind: PlaybackKind,
        paths: Vec<PlayablePath>,
        speed: f64,
    ) -> Option<SessionId> {
        if paths.is_empty() {
            info!("[Playback] nothing to play");
            return None;
        }

        self.teardown_session();
        self.speed = self.config.clamp_speed(speed);

        let token = SessionToken::new(session::next_session_id());
        let id = token.id();
        if let Some(previous) = self.slot.claim(token.clone()) {
            info!("[Playback] session {} preempted by {}", previous, id);
        }

        let mut session = PlaybackSession::new(token, kind, paths);
        let first = &session.paths[0];
        self.map.show_path(first);
        session.marker = Some(self.map.create_marker(first.mode, first.first_point()));
        self.status.set_status("Simulation active");

        info!(
            "[Playback] started session {} with {} paths at {}x",
            id,
            session.paths.len(),
            self.speed
        );

        self.session = Some(session);
        self.state = PlaybackState::Playing;
        self.step();
        Some(id)
    }

    /// Deliver a fired timer.
    pub fn tick(&mut self, timer: TimerId) -> TickOutcome {
        let Some(session) = self.session.as_mut() else {
            return TickOutcome::Stale;
        };

        if session.is_cancelled() {
            debug!("[Playback] session {} was preempted", session.id());
            if let Some(pending) = session.pending_timer.take() {
                self.scheduler.cancel(pending);
            }
            // Status belongs to the preempting session
            self.map.clear_transient_layer();
            self.session = None;
            self.state = PlaybackState::Cancelled;
            return TickOutcome::Stale;
        }

        if session.pending_timer != Some(timer) {
            return TickOutcome::Stale;
        }
        session.pending_timer = None;

        match self.state {
            PlaybackState::Playing => self.step(),
            PlaybackState::Completed => self.release(),
            PlaybackState::Idle | PlaybackState::Cancelled => TickOutcome::Stale,
        }
    }

    /// Stop playback: no further marker or progress updates.
    ///
    /// Returns false if nothing was playing.
    pub fn stop(&mut self) -> bool {
        let had_session = self.session.is_some();
        if had_session {
            self.teardown_session();
            self.status.restore_status();
            info!("[Playback] stopped");
        }
        self.state = PlaybackState::Idle;
        had_session
    }

    /// Change the multiplier; applies from the next scheduled step.
    pub fn set_speed(&mut self, speed: f64) -> f64 {
        self.speed = self.config.clamp_speed(speed);
        debug!("[Playback] speed set to {}x", self.speed);
        self.speed
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn session(&self) -> Option<&PlaybackSession> {
        self.session.as_ref()
    }

    /// True while a session is playing or holding its completion message.
    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    pub fn config(&self) -> &PlaybackConfig {
        &self.config
    }

    pub fn map(&self) -> &M {
        &self.map
    }

    pub fn status(&self) -> &U {
        &self.status
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }

    /// Delay between two steps at the current speed.
    pub fn step_delay(&self, kind: PlaybackKind) -> Duration {
        let base_us = self.config.step_delay_ms(kind) as f64 * 1000.0;
        Duration::from_micros((base_us / self.speed).round() as u64)
    }

    /// Draw the current point and arm the next timer.
    fn step(&mut self) -> TickOutcome {
        let pan_every = self.config.pan_every;
        let Some(session) = self.session.as_mut() else {
            return TickOutcome::Stale;
        };

        let path_index = session.path_index;
        let point_index = session.point_index;
        let path = &session.paths[path_index];
        let point = path.points()[point_index];
        let is_last_point = point_index + 1 == path.len();

        if let Some(marker) = session.marker {
            self.map.set_marker_position(marker, point);
        }

        let progress = progress_percent(point_index, path.len());
        let destination: &str = if path.destination_name.is_empty() {
            "destination"
        } else {
            &path.destination_name
        };
        self.status.set_progress_text(&format!(
            "{} Towards {} - {}%",
            path.mode.icon(),
            destination,
            progress
        ));
        self.status.set_progress_percent(progress);

        if point_index % pan_every == 0 || is_last_point {
            self.map.pan_to(point);
        }
        debug!(
            "[Playback] path {} point {}/{} ({}%)",
            path_index,
            point_index + 1,
            path.len(),
            progress
        );

        session.point_index += 1;
        if !is_last_point {
            self.schedule_step();
            return TickOutcome::Advanced {
                path_index,
                point_index,
                progress,
            };
        }

        if path_index + 1 < session.paths.len() {
            session.path_index += 1;
            session.point_index = 0;
            let next = &session.paths[session.path_index];
            info!(
                "[Playback] path {} of {} done, continuing with {}",
                path_index + 1,
                session.paths.len(),
                next.destination_name
            );
            self.map.show_path(next);
            if let Some(marker) = session.marker {
                if next.mode != session.paths[path_index].mode {
                    self.map.set_marker_kind(marker, next.mode);
                }
            }
            self.schedule_step();
            return TickOutcome::NextPath {
                path_index: path_index + 1,
            };
        }

        self.complete()
    }

    fn schedule_step(&mut self) {
        let Some(kind) = self.session.as_ref().map(|s| s.kind) else {
            return;
        };
        let delay = self.step_delay(kind);
        let timer = self.scheduler.schedule(delay);
        if let Some(session) = self.session.as_mut() {
            session.pending_timer = Some(timer);
        }
    }

    fn complete(&mut self) -> TickOutcome {
        let Some(session) = self.session.as_mut() else {
            return TickOutcome::Stale;
        };

        let message = match session.kind {
            PlaybackKind::Plan => "🎯 Plan completed!".to_string(),
            PlaybackKind::Trip => {
                let destination = session
                    .paths
                    .last()
                    .map(|p| p.destination_name.as_str())
                    .filter(|name| !name.is_empty())
                    .unwrap_or("destination");
                format!("🎯 Arrived at {}!", destination)
            }
        };
        self.status.set_status("Arrival completed");
        self.status.set_progress_text(&message);
        self.status.set_progress_percent(100);

        let hold = Duration::from_millis(self.config.hold_ms(session.kind));
        session.pending_timer = Some(self.scheduler.schedule(hold));
        self.state = PlaybackState::Completed;
        info!("[Playback] session {} completed", session.id());
        TickOutcome::Completed
    }

    fn release(&mut self) -> TickOutcome {
        self.teardown_session();
        self.status.restore_status();
        self.state = PlaybackState::Idle;
        TickOutcome::Released
    }

    /// Cancel the live session, disarm its timer, clear the map, free the slot.
    fn teardown_session(&mut self) {
        let Some(mut session) = self.session.take() else {
            return;
        };
        session.token.cancel();
        if let Some(pending) = session.pending_timer.take() {
            self.scheduler.cancel(pending);
        }
        self.map.clear_transient_layer();
        self.slot.release(session.id());
        debug!("[Playback] session {} torn down", session.id());
    }
}

impl<M, U> PlaybackEngine<M, U, VirtualClock>
where
    M: MapAdapter,
    U: StatusSurface,
{
    /// Fire virtual timers until the engine goes idle or `max_ticks` is reached.
    pub fn run_virtual(&mut self, max_ticks: usize) -> Vec<TickOutcome> {
        let mut outcomes = Vec::new();
        while self.is_active() && outcomes.len() < max_ticks {
            let Some(timer) = self.scheduler.fire_next() else {
                break;
            };
            outcomes.push(self.tick(timer));
        }
        outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequencer::{PathSource, TravelMode};
    use crate::GeoPoint;

    #[derive(Default)]
    struct NullMap {
        markers: u64,
        kinds: Vec<TravelMode>,
        positions: Vec<GeoPoint>,
        pans: usize,
        clears: usize,
    }

    impl MapAdapter for NullMap {
        fn create_marker(&mut self, kind: TravelMode, _at: GeoPoint) -> MarkerHandle {
            self.markers += 1;
            self.kinds.push(kind);
            MarkerHandle(self.markers)
        }
        fn set_marker_position(&mut self, _marker: MarkerHandle, at: GeoPoint) {
            self.positions.push(at);
        }
        fn pan_to(&mut self, _at: GeoPoint) {
            self.pans += 1;
        }
        fn clear_transient_layer(&mut self) {
            self.clears += 1;
        }
        fn set_marker_kind(&mut self, _marker: MarkerHandle, kind: TravelMode) {
            self.kinds.push(kind);
        }
    }

    #[derive(Default)]
    struct NullStatus {
        percents: Vec<u8>,
        statuses: Vec<String>,
        texts: Vec<String>,
        restored: usize,
    }

    impl StatusSurface for NullStatus {
        fn set_progress_text(&mut self, text: &str) {
            self.texts.push(text.to_string());
        }
        fn set_progress_percent(&mut self, percent: u8) {
            self.percents.push(percent);
        }
        fn set_status(&mut self, text: &str) {
            self.statuses.push(text.to_string());
        }
        fn restore_status(&mut self) {
            self.restored += 1;
        }
    }

    type TestEngine = PlaybackEngine<NullMap, NullStatus, VirtualClock>;

    fn engine() -> TestEngine {
        PlaybackEngine::with_slot(
            PlaybackConfig::default(),
            NullMap::default(),
            NullStatus::default(),
            VirtualClock::new(),
            SessionSlot::new(),
        )
        .unwrap()
    }

    fn path(n: usize, destination: &str) -> PlayablePath {
        let points = (0..n)
            .map(|i| GeoPoint::new(45.0 + i as f64 * 0.01, 9.0))
            .collect();
        let mut path = PlayablePath::new(points, TravelMode::Train, PathSource::ShapeSegment)
            .unwrap();
        path.destination_name = destination.to_string();
        path
    }

    #[test]
    fn test_config_defaults_and_partial_json() {
        let config = PlaybackConfig::from_json(r#"{"plan_step_delay_ms": 250}"#).unwrap();
        assert_eq!(config.plan_step_delay_ms, 250);
        assert_eq!(config.trip_step_delay_ms, 500);
        assert_eq!(config.pan_every, 20);
        assert_eq!(config.trip_hold_ms, 3000);
    }

    #[test]
    fn test_config_validation() {
        assert!(PlaybackConfig::default().validate().is_ok());

        let zero_delay = PlaybackConfig {
            trip_step_delay_ms: 0,
            ..Default::default()
        };
        assert!(matches!(
            zero_delay.validate(),
            Err(PlaybackError::InvalidConfig { .. })
        ));

        let inverted = PlaybackConfig {
            min_speed: 10.0,
            max_speed: 1.0,
            ..Default::default()
        };
        assert!(inverted.validate().is_err());

        assert!(PlaybackConfig::from_json(r#"{"pan_every": 0}"#).is_err());
    }

    #[test]
    fn test_clamp_speed() {
        let config = PlaybackConfig::default();
        assert_eq!(config.clamp_speed(1000.0), 100.0);
        assert_eq!(config.clamp_speed(0.0), 0.1);
        assert_eq!(config.clamp_speed(f64::NAN), 1.0);
        assert_eq!(config.clamp_speed(2.0), 2.0);
    }

    #[test]
    fn test_progress_percent() {
        assert_eq!(progress_percent(0, 2), 0);
        assert_eq!(progress_percent(1, 2), 100);
        assert_eq!(progress_percent(1, 3), 50);
        assert_eq!(progress_percent(1, 4), 33);
        assert_eq!(progress_percent(2, 4), 67);
    }

    #[test]
    fn test_start_empty_queue_is_noop() {
        let mut engine = engine();
        assert_eq!(engine.start(PlaybackKind::Plan, Vec::new(), 1.0), None);
        assert_eq!(engine.state(), PlaybackState::Idle);
        assert_eq!(engine.map().markers, 0);
        assert_eq!(engine.map().clears, 0);
        assert!(engine.status().statuses.is_empty());
    }

    #[test]
    fn test_start_draws_first_point_synchronously() {
        let mut engine = engine();
        let id = engine.start(PlaybackKind::Trip, vec![path(3, "Gamma")], 1.0);
        assert!(id.is_some());
        assert_eq!(engine.state(), PlaybackState::Playing);
        assert_eq!(engine.map().positions.len(), 1);
        assert_eq!(engine.map().pans, 1);
        assert_eq!(engine.status().percents, vec![0]);
        assert_eq!(engine.status().statuses, vec!["Simulation active"]);
        assert_eq!(engine.status().texts, vec!["🚂 Towards Gamma - 0%"]);
        assert_eq!(engine.scheduler().pending_count(), 1);
    }

    #[test]
    fn test_single_trip_runs_to_release() {
        let mut engine = engine();
        engine.start(PlaybackKind::Trip, vec![path(3, "Gamma")], 1.0);
        let outcomes = engine.run_virtual(100);

        assert_eq!(
            outcomes,
            vec![
                TickOutcome::Advanced {
                    path_index: 0,
                    point_index: 1,
                    progress: 50
                },
                TickOutcome::Completed,
                TickOutcome::Released,
            ]
        );
        assert_eq!(engine.state(), PlaybackState::Idle);
        assert_eq!(engine.status().percents, vec![0, 50, 100, 100]);
        assert!(engine
            .status()
            .texts
            .contains(&"🎯 Arrived at Gamma!".to_string()));
        assert_eq!(engine.status().restored, 1);
        assert_eq!(engine.map().clears, 1);
        // 2 steps of 500 ms, then the 3 s hold
        assert_eq!(engine.scheduler().now(), Duration::from_millis(4000));
    }

    #[test]
    fn test_stale_timer_is_ignored() {
        let mut engine = engine();
        engine.start(PlaybackKind::Plan, vec![path(5, "X")], 1.0);
        assert_eq!(engine.tick(TimerId(9999)), TickOutcome::Stale);
        assert_eq!(engine.state(), PlaybackState::Playing);
        assert_eq!(engine.map().positions.len(), 1);
    }

    #[test]
    fn test_stop_clears_and_restores() {
        let mut engine = engine();
        engine.start(PlaybackKind::Plan, vec![path(5, "X")], 1.0);
        let timer = engine.scheduler_mut().fire_next().unwrap();
        engine.tick(timer);

        assert!(engine.stop());
        assert_eq!(engine.state(), PlaybackState::Idle);
        assert_eq!(engine.scheduler().pending_count(), 0);
        assert_eq!(engine.map().clears, 1);
        assert_eq!(engine.status().restored, 1);
        assert!(!engine.stop());
    }

    #[test]
    fn test_pan_cadence() {
        let mut engine = engine();
        engine.start(PlaybackKind::Plan, vec![path(45, "X")], 1.0);
        engine.run_virtual(1000);
        // points 0, 20, 40 and the final point 44
        assert_eq!(engine.map().pans, 4);
    }

    #[test]
    fn test_preempted_by_shared_slot() {
        let slot = SessionSlot::new();
        let mut first = PlaybackEngine::with_slot(
            PlaybackConfig::default(),
            NullMap::default(),
            NullStatus::default(),
            VirtualClock::new(),
            slot.clone(),
        )
        .unwrap();
        let mut second = PlaybackEngine::with_slot(
            PlaybackConfig::default(),
            NullMap::default(),
            NullStatus::default(),
            VirtualClock::new(),
            slot.clone(),
        )
        .unwrap();

        first.start(PlaybackKind::Plan, vec![path(5, "X")], 1.0);
        let second_id = second.start(PlaybackKind::Plan, vec![path(5, "Y")], 1.0);
        assert_eq!(slot.current(), second_id);

        let timer = first.scheduler_mut().fire_next().unwrap();
        assert_eq!(first.tick(timer), TickOutcome::Stale);
        assert_eq!(first.state(), PlaybackState::Cancelled);
        assert_eq!(first.map().positions.len(), 1);
        assert_eq!(first.map().clears, 1);
        assert!(!first.status().percents.contains(&100));
        assert_eq!(first.status().restored, 0);
    }

    #[test]
    fn test_marker_kind_follows_leg_mode() {
        let mut engine = engine();
        let mut bus = path(3, "Terminal");
        bus.mode = TravelMode::Bus;
        let train = path(3, "Junction");
        engine.start(PlaybackKind::Plan, vec![train.clone(), bus, train], 1.0);
        engine.run_virtual(100);

        assert_eq!(engine.map().markers, 1);
        assert_eq!(
            engine.map().kinds,
            vec![TravelMode::Train, TravelMode::Bus, TravelMode::Train]
        );
    }
}
