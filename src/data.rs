//! # Reference Data
//!
//! Read-only lookup of stops, shapes and trips.
//!
//! The resolver and sequencer only ever call the three accessors of
//! [`ReferenceData`]. [`InMemoryReferenceData`] is the HashMap-backed
//! implementation, loadable from the preprocessed JSON documents
//! (`stops.json`, `shapes.json`, `timetable.json`, optional `calendar.json`).

use std::collections::HashMap;

use log::info;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::GeoPoint;

/// Calendar exceptions: service_id -> date (YYYYMMDD) -> exception type (1 = added, 2 = removed).
pub type ServiceCalendar = HashMap<String, HashMap<String, u8>>;

// ============================================================================
// Entities
// ============================================================================

/// A stop with its location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stop {
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
}

impl Stop {
    pub fn location(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lon)
    }
}

/// An ordered polyline recorded for a GTFS shape_id. Shared by many trips.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    pub id: String,
    pub points: Vec<GeoPoint>,
}

impl Shape {
    pub fn new(id: &str, points: Vec<GeoPoint>) -> Self {
        Self {
            id: id.to_string(),
            points,
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// One entry of a trip's stop list, in itinerary order.
///
/// The timetable stores these as `[stop_id, departure_time, arrival_time, stop_sequence]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawStopTime")]
pub struct StopTimeEntry {
    pub stop_id: String,
    pub arrival_time: String,
    pub departure_time: String,
    pub stop_sequence: Option<u32>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawStopTime {
    Full(String, String, String, u32),
    Short(String, String, String),
    Labeled {
        stop_id: String,
        #[serde(default)]
        arrival_time: String,
        #[serde(default)]
        departure_time: String,
        #[serde(default)]
        stop_sequence: Option<u32>,
    },
}

impl From<RawStopTime> for StopTimeEntry {
    fn from(raw: RawStopTime) -> Self {
        match raw {
            RawStopTime::Full(stop_id, departure_time, arrival_time, seq) => StopTimeEntry {
                stop_id,
                arrival_time,
                departure_time,
                stop_sequence: Some(seq),
            },
            RawStopTime::Short(stop_id, departure_time, arrival_time) => StopTimeEntry {
                stop_id,
                arrival_time,
                departure_time,
                stop_sequence: None,
            },
            RawStopTime::Labeled {
                stop_id,
                arrival_time,
                departure_time,
                stop_sequence,
            } => StopTimeEntry {
                stop_id,
                arrival_time,
                departure_time,
                stop_sequence,
            },
        }
    }
}

/// One scheduled run of a vehicle. Read-only once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trip {
    #[serde(default)]
    pub id: String,
    pub route_id: String,
    pub shape_id: String,
    #[serde(default)]
    pub service_id: String,
    /// Departure from the first stop (HH:MM:SS)
    #[serde(default)]
    pub departure: String,
    /// Arrival at the last stop (HH:MM:SS)
    #[serde(default)]
    pub arrival: String,
    #[serde(default)]
    pub headsign: String,
    #[serde(default)]
    pub duration_minutes: i64,
    #[serde(default)]
    pub stops: Vec<StopTimeEntry>,
    /// Dates this trip runs on (YYYYMMDD -> 1)
    #[serde(default)]
    pub service_dates: HashMap<String, u8>,
}

impl Trip {
    /// Create a trip with bare stop entries (no timing). Mostly useful for tests and tools.
    pub fn new(id: &str, route_id: &str, shape_id: &str, stop_ids: &[&str]) -> Self {
        let stops = stop_ids
            .iter()
            .enumerate()
            .map(|(i, stop_id)| StopTimeEntry {
                stop_id: stop_id.to_string(),
                arrival_time: String::new(),
                departure_time: String::new(),
                stop_sequence: Some(i as u32 + 1),
            })
            .collect();
        Self {
            id: id.to_string(),
            route_id: route_id.to_string(),
            shape_id: shape_id.to_string(),
            service_id: String::new(),
            departure: String::new(),
            arrival: String::new(),
            headsign: String::new(),
            duration_minutes: 0,
            stops,
            service_dates: HashMap::new(),
        }
    }

    pub fn stop_count(&self) -> usize {
        self.stops.len()
    }

    /// Whether the trip runs on `date` (YYYYMMDD), by its own service dates or the calendar.
    pub fn runs_on(&self, date: &str, calendar: &ServiceCalendar) -> bool {
        if self.service_dates.get(date) == Some(&1) {
            return true;
        }
        calendar
            .get(&self.service_id)
            .and_then(|dates| dates.get(date))
            == Some(&1)
    }
}

// ============================================================================
// Accessors
// ============================================================================

/// Immutable lookup of the reference entities.
pub trait ReferenceData {
    fn trip(&self, trip_id: &str) -> Option<&Trip>;
    fn shape(&self, shape_id: &str) -> Option<&Shape>;
    fn stop(&self, stop_id: &str) -> Option<&Stop>;
}

/// HashMap-backed reference data.
#[derive(Debug, Clone, Default)]
pub struct InMemoryReferenceData {
    stops: HashMap<String, Stop>,
    shapes: HashMap<String, Shape>,
    trips: HashMap<String, Trip>,
    calendar: ServiceCalendar,
}

impl InMemoryReferenceData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from the preprocessed JSON documents.
    ///
    /// - `stops_json`: `{stop_id: {name, lat, lon, full_name?}}`
    /// - `shapes_json`: `{shape_id: [[lat, lon], ...]}`
    /// - `timetable_json`: `{trip_id: {route_id, shape_id, stops: [[id, dep, arr, seq]], ...}}`
    pub fn from_json_documents(
        stops_json: &str,
        shapes_json: &str,
        timetable_json: &str,
    ) -> Result<Self> {
        let mut stops: HashMap<String, Stop> = serde_json::from_str(stops_json)?;
        for (id, stop) in stops.iter_mut() {
            stop.id = id.clone();
        }

        let raw_shapes: HashMap<String, Vec<GeoPoint>> = serde_json::from_str(shapes_json)?;
        let shapes: HashMap<String, Shape> = raw_shapes
            .into_iter()
            .map(|(id, points)| {
                let shape = Shape::new(&id, points);
                (id, shape)
            })
            .collect();

        let mut trips: HashMap<String, Trip> = serde_json::from_str(timetable_json)?;
        for (id, trip) in trips.iter_mut() {
            trip.id = id.clone();
        }

        info!(
            "[ReferenceData] Loaded {} stops, {} shapes, {} trips",
            stops.len(),
            shapes.len(),
            trips.len()
        );

        Ok(Self {
            stops,
            shapes,
            trips,
            calendar: ServiceCalendar::new(),
        })
    }

    /// Attach calendar exceptions (`{service_id: {YYYYMMDD: exception_type}}`).
    pub fn with_calendar_json(mut self, calendar_json: &str) -> Result<Self> {
        self.calendar = serde_json::from_str(calendar_json)?;
        Ok(self)
    }

    pub fn insert_stop(&mut self, id: &str, name: &str, lat: f64, lon: f64) {
        self.stops.insert(
            id.to_string(),
            Stop {
                id: id.to_string(),
                name: name.to_string(),
                lat,
                lon,
                full_name: None,
            },
        );
    }

    pub fn insert_shape(&mut self, id: &str, points: Vec<GeoPoint>) {
        self.shapes.insert(id.to_string(), Shape::new(id, points));
    }

    pub fn insert_trip(&mut self, trip: Trip) {
        self.trips.insert(trip.id.clone(), trip);
    }

    pub fn calendar(&self) -> &ServiceCalendar {
        &self.calendar
    }

    pub fn trip_count(&self) -> usize {
        self.trips.len()
    }

    /// All trips of a route, in no particular order.
    pub fn trips_for_route(&self, route_id: &str) -> Vec<&Trip> {
        self.trips
            .values()
            .filter(|t| t.route_id == route_id)
            .collect()
    }

    /// Trips of a route that serve `origin` strictly before `destination` on `date`,
    /// sorted by departure time from the origin stop.
    pub fn trips_between(
        &self,
        route_id: &str,
        origin: &str,
        destination: &str,
        date: &str,
    ) -> Vec<&Trip> {
        let mut found: Vec<(&str, &Trip)> = self
            .trips_for_route(route_id)
            .into_iter()
            .filter(|trip| trip.stops.len() >= 2)
            .filter(|trip| trip.runs_on(date, &self.calendar))
            .filter_map(|trip| {
                let (o, d) = crate::resolver::find_stop_indices(trip, origin, destination);
                match (o, d) {
                    (Some(o), Some(d)) if d > o => {
                        Some((trip.stops[o].departure_time.as_str(), trip))
                    }
                    _ => None,
                }
            })
            .collect();

        // HH:MM:SS sorts lexicographically; ties keep a stable order by id
        found.sort_by(|a, b| a.0.cmp(b.0).then_with(|| a.1.id.cmp(&b.1.id)));
        found.into_iter().map(|(_, trip)| trip).collect()
    }
}

impl ReferenceData for InMemoryReferenceData {
    fn trip(&self, trip_id: &str) -> Option<&Trip> {
        self.trips.get(trip_id)
    }

    fn shape(&self, shape_id: &str) -> Option<&Shape> {
        self.shapes.get(shape_id)
    }

    fn stop(&self, stop_id: &str) -> Option<&Stop> {
        self.stops.get(stop_id)
    }
}
