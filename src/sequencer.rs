//! # Leg Sequencer
//!
//! Turns planner output into an ordered queue of [`PlayablePath`]s.
//!
//! For each leg, in order:
//! 1. If the leg references a trip, resolve the shape segment between the leg's
//!    first origin and last destination
//! 2. Otherwise, or if that gives fewer than two points, connect the stop
//!    locations of the leg's segments
//! 3. Legs still short of two points are skipped; the rest keep their order

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::data::ReferenceData;
use crate::error::{PlaybackError, Result};
use crate::geo_utils::compute_bounds;
use crate::resolver::{resolve_segment, GeometryPrecision};
use crate::{Bounds, GeoPoint};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Minimum number of points an animation needs.
pub const MIN_PATH_POINTS: usize = 2;

// ============================================================================
// Planner Input
// ============================================================================

/// Vehicle mode of a leg. Anything that is not a bus is drawn as a train.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", rename_all = "lowercase")]
pub enum TravelMode {
    #[default]
    Train,
    Bus,
}

impl From<String> for TravelMode {
    fn from(mode: String) -> Self {
        if mode.eq_ignore_ascii_case("bus") {
            TravelMode::Bus
        } else {
            TravelMode::Train
        }
    }
}

impl TravelMode {
    pub fn icon(&self) -> &'static str {
        match self {
            TravelMode::Train => "🚂",
            TravelMode::Bus => "🚌",
        }
    }
}

/// Stop reference as the planner reports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopRef {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// One stop-to-stop hop with timing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub from_stop: StopRef,
    pub to_stop: StopRef,
    #[serde(default)]
    pub departure: String,
    #[serde(default)]
    pub arrival: String,
}

/// One mode-homogeneous hop of an itinerary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Leg {
    #[serde(default)]
    pub mode: TravelMode,
    #[serde(default)]
    pub route_id: String,
    #[serde(default)]
    pub route_short: String,
    #[serde(default)]
    pub trip_id: Option<String>,
    #[serde(default)]
    pub departure: String,
    #[serde(default)]
    pub arrival: String,
    /// Minutes
    #[serde(default)]
    pub duration: Option<i64>,
    #[serde(default)]
    pub segments: Vec<Segment>,
}

impl Leg {
    /// Displayable origin: the first segment's departure stop.
    pub fn origin(&self) -> Option<&StopRef> {
        self.segments.first().map(|s| &s.from_stop)
    }

    /// Displayable destination: the last segment's arrival stop.
    pub fn destination(&self) -> Option<&StopRef> {
        self.segments.last().map(|s| &s.to_stop)
    }

    fn route_label(&self) -> Option<String> {
        if !self.route_short.is_empty() {
            Some(self.route_short.clone())
        } else if !self.route_id.is_empty() {
            Some(self.route_id.clone())
        } else {
            None
        }
    }
}

/// Planner response for an origin/destination/date/time query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanResponse {
    pub found: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub legs: Vec<Leg>,
    #[serde(default)]
    pub total_minutes: Option<i64>,
    #[serde(default)]
    pub transfers: Option<u32>,
    #[serde(default)]
    pub solver: Option<String>,
}

impl PlanResponse {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Playable paths for the plan; empty when nothing was found or nothing is drawable.
    pub fn playables<D: ReferenceData + ?Sized>(&self, data: &D) -> Vec<PlayablePath> {
        if !self.found {
            info!(
                "[Sequencer] planner found no itinerary: {}",
                self.message.as_deref().unwrap_or("-")
            );
            return Vec::new();
        }
        build_playables(data, &self.legs)
    }
}

// ============================================================================
// Playable Paths
// ============================================================================

/// Where a path's geometry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PathSource {
    /// Exact shape segment between the leg's stops
    ShapeSegment,
    /// Entire trip shape (segment could not be isolated)
    FullShape,
    /// Straight lines through the leg's stop locations
    StopCentroids,
}

/// Position of a leg in its itinerary, for labeling only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegRole {
    Direct,
    Departure,
    Transfer,
    Arrival,
}

/// Ordered points plus display metadata, ready for playback.
///
/// Always holds at least two points.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayablePath {
    points: Vec<GeoPoint>,
    pub source: PathSource,
    pub mode: TravelMode,
    pub leg_index: usize,
    pub route_label: Option<String>,
    pub origin_name: String,
    pub destination_name: String,
    pub departure: String,
    pub arrival: String,
    pub duration_minutes: Option<i64>,
    pub is_first: bool,
    pub is_last: bool,
}

impl PlayablePath {
    /// Create a path, rejecting geometry with fewer than two points.
    pub fn new(points: Vec<GeoPoint>, mode: TravelMode, source: PathSource) -> Result<Self> {
        let count = points.len();
        if count < MIN_PATH_POINTS {
            return Err(PlaybackError::DegenerateGeometry {
                label: "playable path".to_string(),
                point_count: count,
                minimum_required: MIN_PATH_POINTS,
            });
        }
        Ok(Self {
            points,
            source,
            mode,
            leg_index: 0,
            route_label: None,
            origin_name: String::new(),
            destination_name: String::new(),
            departure: String::new(),
            arrival: String::new(),
            duration_minutes: None,
            is_first: true,
            is_last: true,
        })
    }

    pub fn points(&self) -> &[GeoPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Never true for a path built through `new`.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first_point(&self) -> GeoPoint {
        self.points[0]
    }

    pub fn last_point(&self) -> GeoPoint {
        self.points[self.points.len() - 1]
    }

    pub fn bounds(&self) -> Option<Bounds> {
        compute_bounds(&self.points)
    }

    pub fn role(&self) -> LegRole {
        match (self.is_first, self.is_last) {
            (true, true) => LegRole::Direct,
            (true, false) => LegRole::Departure,
            (false, true) => LegRole::Arrival,
            (false, false) => LegRole::Transfer,
        }
    }
}

/// Resolve every leg into a playable path, skipping legs without usable geometry.
///
/// Output order follows input order. `is_first`/`is_last` refer to the leg's
/// position in the input, not in the filtered output.
pub fn build_playables<D: ReferenceData + ?Sized>(data: &D, legs: &[Leg]) -> Vec<PlayablePath> {
    let total = legs.len();
    let paths: Vec<PlayablePath> = legs
        .iter()
        .enumerate()
        .filter_map(|(i, leg)| playable_for_leg(data, leg, i, total))
        .collect();

    info!(
        "[Sequencer] {} of {} legs are playable",
        paths.len(),
        total
    );
    paths
}

/// Parallel version of [`build_playables`]. Output order is preserved.
#[cfg(feature = "parallel")]
pub fn build_playables_parallel<D: ReferenceData + Sync + ?Sized>(
    data: &D,
    legs: &[Leg],
) -> Vec<PlayablePath> {
    let total = legs.len();
    let paths: Vec<PlayablePath> = legs
        .par_iter()
        .enumerate()
        .filter_map(|(i, leg)| playable_for_leg(data, leg, i, total))
        .collect();

    info!(
        "[Sequencer] {} of {} legs are playable (parallel)",
        paths.len(),
        total
    );
    paths
}

/// Single-trip variant: the segment between two stops of one trip, or its full shape.
pub fn build_playable<D: ReferenceData + ?Sized>(
    data: &D,
    trip_id: &str,
    origin: &str,
    destination: &str,
    mode: TravelMode,
) -> Option<PlayablePath> {
    let trip = data.trip(trip_id)?;
    let resolved = resolve_segment(data, trip_id, origin, destination)?;
    let source = match resolved.precision {
        GeometryPrecision::Exact => PathSource::ShapeSegment,
        GeometryPrecision::FullShape(_) => PathSource::FullShape,
    };

    let mut path = match PlayablePath::new(resolved.points, mode, source) {
        Ok(path) => path,
        Err(err) => {
            warn!("[Sequencer] trip {}: {}", trip_id, err);
            return None;
        }
    };

    path.route_label = Some(trip.route_id.clone()).filter(|r| !r.is_empty());
    path.origin_name = stop_name(data, origin);
    path.destination_name = stop_name(data, destination);
    path.departure = trip.departure.clone();
    path.arrival = trip.arrival.clone();
    path.duration_minutes = Some(trip.duration_minutes);
    Some(path)
}

fn playable_for_leg<D: ReferenceData + ?Sized>(
    data: &D,
    leg: &Leg,
    index: usize,
    total: usize,
) -> Option<PlayablePath> {
    let Some((points, source)) = leg_geometry(data, leg) else {
        info!("[Sequencer] leg {} has no usable geometry, skipping", index + 1);
        return None;
    };

    let mut path = match PlayablePath::new(points, leg.mode, source) {
        Ok(path) => path,
        Err(err) => {
            info!("[Sequencer] leg {} skipped: {}", index + 1, err);
            return None;
        }
    };

    path.leg_index = index;
    path.route_label = leg.route_label();
    path.origin_name = leg.origin().map(|s| s.name.clone()).unwrap_or_default();
    path.destination_name = leg.destination().map(|s| s.name.clone()).unwrap_or_default();
    path.departure = leg.departure.clone();
    path.arrival = leg.arrival.clone();
    path.duration_minutes = leg.duration;
    path.is_first = index == 0;
    path.is_last = index + 1 == total;
    Some(path)
}

/// Shape segment first, stop locations second.
fn leg_geometry<D: ReferenceData + ?Sized>(
    data: &D,
    leg: &Leg,
) -> Option<(Vec<GeoPoint>, PathSource)> {
    if let (Some(trip_id), Some(origin), Some(destination)) =
        (&leg.trip_id, leg.origin(), leg.destination())
    {
        if let Some(resolved) = resolve_segment(data, trip_id, &origin.id, &destination.id) {
            if resolved.points.len() >= MIN_PATH_POINTS {
                let source = if resolved.is_exact() {
                    PathSource::ShapeSegment
                } else {
                    PathSource::FullShape
                };
                return Some((resolved.points, source));
            }
        }
    }

    let centroids = stop_centroid_path(data, leg);
    if centroids.len() >= MIN_PATH_POINTS {
        return Some((centroids, PathSource::StopCentroids));
    }
    None
}

/// Locations of every segment's departure stop, then the last arrival stop.
/// Stops missing from the reference data are left out.
fn stop_centroid_path<D: ReferenceData + ?Sized>(data: &D, leg: &Leg) -> Vec<GeoPoint> {
    let mut points: Vec<GeoPoint> = leg
        .segments
        .iter()
        .filter_map(|s| data.stop(&s.from_stop.id).map(|stop| stop.location()))
        .collect();
    if let Some(last) = leg.destination().and_then(|s| data.stop(&s.id)) {
        points.push(last.location());
    }
    points
}

fn stop_name<D: ReferenceData + ?Sized>(data: &D, stop_id: &str) -> String {
    data.stop(stop_id)
        .map(|s| s.name.clone())
        .unwrap_or_else(|| stop_id.to_string())
}
