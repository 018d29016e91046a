//! Headless playback of a two-leg plan on the virtual clock.
//!
//! Run with: `RUST_LOG=info cargo run --example headless_playback`

use trip_playback::{
    GeoPoint, InMemoryReferenceData, MapAdapter, MarkerHandle, PlanResponse, PlaybackConfig,
    PlaybackEngine, PlaybackKind, StatusSurface, Trip, TravelMode, VirtualClock,
};

struct PrintMap;

impl MapAdapter for PrintMap {
    fn create_marker(&mut self, kind: TravelMode, at: GeoPoint) -> MarkerHandle {
        println!("marker {} at {:.4},{:.4}", kind.icon(), at.latitude, at.longitude);
        MarkerHandle(1)
    }

    fn set_marker_position(&mut self, _marker: MarkerHandle, _at: GeoPoint) {}

    fn pan_to(&mut self, at: GeoPoint) {
        println!("pan to {:.4},{:.4}", at.latitude, at.longitude);
    }

    fn clear_transient_layer(&mut self) {
        println!("map cleared");
    }
}

struct PrintStatus;

impl StatusSurface for PrintStatus {
    fn set_progress_text(&mut self, text: &str) {
        println!("  {}", text);
    }

    fn set_progress_percent(&mut self, _percent: u8) {}

    fn set_status(&mut self, text: &str) {
        println!("[{}]", text);
    }

    fn restore_status(&mut self) {
        println!("[status restored]");
    }
}

fn main() {
    env_logger::init();

    let mut data = InMemoryReferenceData::new();
    data.insert_stop("MC", "Milano Centrale", 45.4859, 9.2043);
    data.insert_stop("SS", "Sesto San Giovanni", 45.5400, 9.2380);
    data.insert_stop("MZ", "Monza", 45.5783, 9.2733);
    data.insert_stop("AR", "Arcore", 45.6270, 9.3230);
    data.insert_shape(
        "SH1",
        vec![
            GeoPoint::new(45.4859, 9.2043),
            GeoPoint::new(45.5100, 9.2200),
            GeoPoint::new(45.5400, 9.2380),
            GeoPoint::new(45.5600, 9.2550),
            GeoPoint::new(45.5783, 9.2733),
        ],
    );
    data.insert_trip(Trip::new("T1", "S9", "SH1", &["MC", "SS", "MZ"]));

    let plan = PlanResponse::from_json(
        r#"{
            "found": true,
            "legs": [
                {"mode": "train", "route_id": "S9", "trip_id": "T1",
                 "segments": [{"from_stop": {"id": "MC", "name": "Milano Centrale"},
                               "to_stop": {"id": "MZ", "name": "Monza"}}]},
                {"mode": "bus", "route_id": "Z203",
                 "segments": [{"from_stop": {"id": "MZ", "name": "Monza"},
                               "to_stop": {"id": "AR", "name": "Arcore"}}]}
            ]
        }"#,
    )
    .expect("demo plan parses");

    let paths = plan.playables(&data);
    let mut engine = PlaybackEngine::new(
        PlaybackConfig::default(),
        PrintMap,
        PrintStatus,
        VirtualClock::new(),
    )
    .expect("default config is valid");

    engine.start(PlaybackKind::Plan, paths, 4.0);
    let ticks = engine.run_virtual(10_000).len();
    println!(
        "{} ticks, {:?} of virtual time",
        ticks,
        engine.scheduler().now()
    );
}
