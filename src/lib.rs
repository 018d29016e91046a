//! # Trip Playback
//!
//! Shape segment resolution and time-scaled playback for scheduled transit journeys.
//!
//! This library provides:
//! - Nearest-point projection of stops onto a trip's recorded shape
//! - Extraction of the exact shape sub-path between two stops, with direction correction
//! - Sequencing of multi-leg planner itineraries into playable paths
//! - A cancellable, timer-driven playback engine that moves a marker along those paths
//!
//! ## Features
//!
//! - **`parallel`** - Resolve itinerary legs concurrently with rayon
//! - **`runtime`** - Tokio-backed scheduler and async playback driver
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use trip_playback::{GeoPoint, InMemoryReferenceData, resolve_segment};
//!
//! let mut data = InMemoryReferenceData::new();
//! data.insert_stop("A", "Alpha", 45.0, 9.0);
//! data.insert_stop("C", "Gamma", 45.3, 9.3);
//! data.insert_shape(
//!     "S1",
//!     vec![
//!         GeoPoint::new(45.0, 9.0),
//!         GeoPoint::new(45.1, 9.1),
//!         GeoPoint::new(45.2, 9.2),
//!         GeoPoint::new(45.3, 9.3),
//!     ],
//! );
//! data.insert_trip(trip_playback::Trip::new("T1", "R1", "S1", &["A", "C"]));
//!
//! let resolved = resolve_segment(&data, "T1", "A", "C").unwrap();
//! assert_eq!(resolved.points.len(), 4);
//! assert!(resolved.is_exact());
//! ```

use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{OptionExt, PlaybackError, Result};

// Geographic utilities (distance, nearest point, bounds)
pub mod geo_utils;
pub use geo_utils::{
    compute_bounds, haversine_distance, nearest_index, nearest_index_in_range, polyline_length,
};

// Reference data accessors (stops, shapes, trips)
pub mod data;
pub use data::{InMemoryReferenceData, ReferenceData, ServiceCalendar, Shape, Stop, StopTimeEntry, Trip};

// Shape segment resolution between two stops of a trip
pub mod resolver;
pub use resolver::{
    find_stop_indices, resolve_segment, try_resolve_segment, FallbackReason, GeometryPrecision,
    ResolvedGeometry,
};

// Planner legs -> playable paths
pub mod sequencer;
#[cfg(feature = "parallel")]
pub use sequencer::build_playables_parallel;
pub use sequencer::{
    build_playable, build_playables, Leg, LegRole, PathSource, PlanResponse, PlayablePath,
    Segment, StopRef, TravelMode,
};

// Timer-driven playback state machine
pub mod playback;
pub use playback::{
    MapAdapter, MarkerHandle, PlaybackConfig, PlaybackEngine, PlaybackKind, PlaybackSession,
    PlaybackState, Scheduler, SessionId, SessionSlot, StatusSurface, TickOutcome, TimerId,
    VirtualClock,
};
#[cfg(feature = "runtime")]
pub use playback::runtime::{run_until_idle, TokioScheduler};

// ============================================================================
// Core Types
// ============================================================================

/// A geographic coordinate with latitude and longitude in degrees.
///
/// Points arrive from reference data and planner results either as
/// `[lat, lon]` pairs or as labeled objects (`{lat, lon}`, `{lat, lng}`,
/// `{latitude, longitude}`). All of them deserialize into this one type.
///
/// # Example
/// ```
/// use trip_playback::GeoPoint;
///
/// let a: GeoPoint = serde_json::from_str("[45.0, 9.0]").unwrap();
/// let b: GeoPoint = serde_json::from_str(r#"{"lat": 45.0, "lng": 9.0}"#).unwrap();
/// assert_eq!(a, b);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawPoint")]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    /// Create a new point.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Check if the point has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }
}

/// Wire representations accepted for a point.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawPoint {
    Pair([f64; 2]),
    Labeled {
        #[serde(alias = "latitude")]
        lat: f64,
        #[serde(alias = "lng", alias = "longitude")]
        lon: f64,
    },
}

impl From<RawPoint> for GeoPoint {
    fn from(raw: RawPoint) -> Self {
        match raw {
            RawPoint::Pair([lat, lon]) => GeoPoint::new(lat, lon),
            RawPoint::Labeled { lat, lon } => GeoPoint::new(lat, lon),
        }
    }
}

impl From<GeoPoint> for geo::Coord {
    fn from(p: GeoPoint) -> Self {
        geo::Coord {
            x: p.longitude,
            y: p.latitude,
        }
    }
}

impl From<geo::Coord> for GeoPoint {
    fn from(c: geo::Coord) -> Self {
        GeoPoint::new(c.y, c.x)
    }
}

impl From<GeoPoint> for geo::Point {
    fn from(p: GeoPoint) -> Self {
        geo::Point::new(p.longitude, p.latitude)
    }
}

/// Bounding box of a set of points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl Bounds {
    /// Get the center point of the bounds.
    pub fn center(&self) -> GeoPoint {
        GeoPoint::new(
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lng + self.max_lng) / 2.0,
        )
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_validation() {
        assert!(GeoPoint::new(45.46, 9.19).is_valid());
        assert!(!GeoPoint::new(91.0, 0.0).is_valid());
        assert!(!GeoPoint::new(0.0, 181.0).is_valid());
        assert!(!GeoPoint::new(f64::NAN, 0.0).is_valid());
    }

    #[test]
    fn test_point_accepts_pair_and_labeled_forms() {
        let pair: GeoPoint = serde_json::from_str("[45.1, 9.2]").unwrap();
        let lon: GeoPoint = serde_json::from_str(r#"{"lat": 45.1, "lon": 9.2}"#).unwrap();
        let lng: GeoPoint = serde_json::from_str(r#"{"lat": 45.1, "lng": 9.2}"#).unwrap();
        let long: GeoPoint =
            serde_json::from_str(r#"{"latitude": 45.1, "longitude": 9.2}"#).unwrap();

        assert_eq!(pair, GeoPoint::new(45.1, 9.2));
        assert_eq!(pair, lon);
        assert_eq!(pair, lng);
        assert_eq!(pair, long);
    }

    #[test]
    fn test_point_rejects_string_coordinates() {
        let parsed: std::result::Result<GeoPoint, _> = serde_json::from_str(r#"["45.1", "9.2"]"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_geo_coord_conversion() {
        let p = GeoPoint::new(45.0, 9.0);
        let c: geo::Coord = p.into();
        assert_eq!(c.x, 9.0);
        assert_eq!(c.y, 45.0);
        assert_eq!(GeoPoint::from(c), p);
    }
}
