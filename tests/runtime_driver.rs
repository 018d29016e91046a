//! Playback driven by real tokio timers (paused clock).

#![cfg(feature = "runtime")]

mod common;

use std::time::Duration;

use common::{init_logging, straight_path, RecordingMap, RecordingStatus};
use trip_playback::{
    run_until_idle, PlaybackConfig, PlaybackEngine, PlaybackKind, PlaybackState, Scheduler,
    SessionSlot, TickOutcome, TokioScheduler,
};

#[tokio::test(start_paused = true)]
async fn test_tokio_driver_runs_to_release() {
    init_logging();
    let (scheduler, mut timers) = TokioScheduler::current();
    let mut engine = PlaybackEngine::with_slot(
        PlaybackConfig::default(),
        RecordingMap::default(),
        RecordingStatus::default(),
        scheduler,
        SessionSlot::new(),
    )
    .unwrap();

    let started = tokio::time::Instant::now();
    engine
        .start(PlaybackKind::Trip, vec![straight_path(4, "North")], 2.0)
        .unwrap();
    let outcomes = run_until_idle(&mut engine, &mut timers).await;

    assert_eq!(
        outcomes,
        vec![
            TickOutcome::Advanced {
                path_index: 0,
                point_index: 1,
                progress: 33
            },
            TickOutcome::Advanced {
                path_index: 0,
                point_index: 2,
                progress: 67
            },
            TickOutcome::Completed,
            TickOutcome::Released,
        ]
    );
    assert_eq!(engine.state(), PlaybackState::Idle);
    assert_eq!(engine.map().positions().len(), 4);
    assert_eq!(
        engine.step_delay(PlaybackKind::Trip),
        Duration::from_millis(250)
    );
    // Three 250 ms steps, then the 3 s hold
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(3750));
    assert!(elapsed < Duration::from_millis(3800));
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_timer_never_fires() {
    let (mut scheduler, mut timers) = TokioScheduler::current();
    let cancelled = scheduler.schedule(Duration::from_millis(10));
    let kept = scheduler.schedule(Duration::from_millis(20));
    scheduler.cancel(cancelled);

    assert_eq!(timers.recv().await, Some(kept));
    assert!(timers.try_recv().is_err());
}
