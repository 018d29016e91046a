//! Shared fixtures for integration tests: a small network and recording adapters.

#![allow(dead_code)]

use trip_playback::{
    GeoPoint, InMemoryReferenceData, MapAdapter, MarkerHandle, PlayablePath, StatusSurface,
    TravelMode,
};

pub const STOPS: &str = r#"{
    "A": {"name": "Alpha", "lat": 45.0, "lon": 9.0},
    "B": {"name": "Beta", "lat": 45.1, "lon": 9.1},
    "C": {"name": "Gamma", "lat": 45.3, "lon": 9.3},
    "D": {"name": "Delta", "lat": 45.4, "lon": 9.5},
    "E": {"name": "Epsilon", "lat": 45.5, "lon": 9.6}
}"#;

pub const SHAPES: &str = r#"{
    "S1": [[45.0, 9.0], [45.1, 9.1], [45.2, 9.2], [45.3, 9.3]]
}"#;

pub const TIMETABLE: &str = r#"{
    "T1": {
        "route_id": "R1",
        "shape_id": "S1",
        "departure": "08:00:00",
        "arrival": "08:40:00",
        "duration_minutes": 40,
        "stops": [
            ["A", "08:00:00", "08:00:00", 1],
            ["B", "08:20:00", "08:19:00", 2],
            ["C", "08:40:00", "08:40:00", 3]
        ]
    }
}"#;

/// Two legs: a train on T1 from A to C, then a bus with no trip from C to E via D.
pub const PLAN: &str = r#"{
    "found": true,
    "solver": "csa-time",
    "total_minutes": 65,
    "transfers": 1,
    "legs": [
        {
            "mode": "train", "route_id": "R1", "route_short": "S9", "trip_id": "T1",
            "departure": "08:00", "arrival": "08:40", "duration": 40,
            "segments": [
                {"from_stop": {"id": "A", "name": "Alpha"}, "to_stop": {"id": "B", "name": "Beta"},
                 "departure": "08:00", "arrival": "08:19"},
                {"from_stop": {"id": "B", "name": "Beta"}, "to_stop": {"id": "C", "name": "Gamma"},
                 "departure": "08:20", "arrival": "08:40"}
            ]
        },
        {
            "mode": "bus", "route_id": "B7", "route_short": "7",
            "departure": "08:45", "arrival": "09:05", "duration": 20,
            "segments": [
                {"from_stop": {"id": "C", "name": "Gamma"}, "to_stop": {"id": "D", "name": "Delta"},
                 "departure": "08:45", "arrival": "08:55"},
                {"from_stop": {"id": "D", "name": "Delta"}, "to_stop": {"id": "E", "name": "Epsilon"},
                 "departure": "08:55", "arrival": "09:05"}
            ]
        }
    ]
}"#;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn network() -> InMemoryReferenceData {
    InMemoryReferenceData::from_json_documents(STOPS, SHAPES, TIMETABLE)
        .expect("fixture documents parse")
}

/// Straight north-bound path with `n` points.
pub fn straight_path(n: usize, destination: &str) -> PlayablePath {
    let points = (0..n)
        .map(|i| GeoPoint::new(45.0 + i as f64 * 0.001, 9.0))
        .collect();
    let mut path =
        PlayablePath::new(points, TravelMode::Train, trip_playback::PathSource::ShapeSegment)
            .expect("fixture path has enough points");
    path.destination_name = destination.to_string();
    path
}

#[derive(Debug, Clone, PartialEq)]
pub enum MapEvent {
    Created(TravelMode, GeoPoint),
    Moved(MarkerHandle, GeoPoint),
    Panned(GeoPoint),
    Cleared,
    Shown(usize),
    Restyled(MarkerHandle, TravelMode),
}

/// Map adapter that records every call.
#[derive(Debug, Default)]
pub struct RecordingMap {
    pub events: Vec<MapEvent>,
    next_marker: u64,
}

impl RecordingMap {
    pub fn positions(&self) -> Vec<GeoPoint> {
        self.events
            .iter()
            .filter_map(|e| match e {
                MapEvent::Moved(_, p) => Some(*p),
                _ => None,
            })
            .collect()
    }

    pub fn markers_created(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, MapEvent::Created(..)))
            .count()
    }

    pub fn clears(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, MapEvent::Cleared))
            .count()
    }
}

impl MapAdapter for RecordingMap {
    fn create_marker(&mut self, kind: TravelMode, at: GeoPoint) -> MarkerHandle {
        self.next_marker += 1;
        self.events.push(MapEvent::Created(kind, at));
        MarkerHandle(self.next_marker)
    }

    fn set_marker_position(&mut self, marker: MarkerHandle, at: GeoPoint) {
        self.events.push(MapEvent::Moved(marker, at));
    }

    fn pan_to(&mut self, at: GeoPoint) {
        self.events.push(MapEvent::Panned(at));
    }

    fn clear_transient_layer(&mut self) {
        self.events.push(MapEvent::Cleared);
    }

    fn show_path(&mut self, path: &PlayablePath) {
        self.events.push(MapEvent::Shown(path.leg_index));
    }

    fn set_marker_kind(&mut self, marker: MarkerHandle, kind: TravelMode) {
        self.events.push(MapEvent::Restyled(marker, kind));
    }
}

/// Status surface that records every call.
#[derive(Debug, Default)]
pub struct RecordingStatus {
    pub texts: Vec<String>,
    pub percents: Vec<u8>,
    pub statuses: Vec<String>,
    pub restored: usize,
}

impl StatusSurface for RecordingStatus {
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
