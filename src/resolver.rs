//! # Shape Segment Resolver
//!
//! Finds the part of a trip's shape that corresponds to travel between two of its stops.
//!
//! ## Algorithm
//! 1. Locate the origin (first occurrence) and destination (last occurrence) in the
//!    trip's stop list; the destination must come after the origin
//! 2. Project both stop locations onto the shape independently (nearest point)
//! 3. Slice the shape between the two projections, inclusive
//! 4. Reverse the slice when the destination projects before the origin
//!
//! Whenever a step cannot produce a usable segment the whole shape is returned
//! instead, tagged with the reason. Only a missing trip or a missing/empty shape
//! yields no geometry at all.

use log::{debug, info};

use crate::data::{ReferenceData, Shape, Trip};
use crate::error::{OptionExt, PlaybackError, Result};
use crate::geo_utils::nearest_index;
use crate::GeoPoint;

/// Why the full shape was returned instead of an exact segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    /// Origin or destination stop is missing from the reference data
    StopMissing,
    /// Origin or destination stop is not served by the trip
    StopNotInTrip,
    /// Destination does not come after the origin in the trip
    InvalidOrder,
    /// The extracted slice had fewer than two points
    DegenerateSlice,
}

/// How precisely the resolved geometry matches the requested stop pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryPrecision {
    Exact,
    FullShape(FallbackReason),
}

/// Geometry resolved for a trip between two stops.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedGeometry {
    pub points: Vec<GeoPoint>,
    pub precision: GeometryPrecision,
}

impl ResolvedGeometry {
    pub fn is_exact(&self) -> bool {
        self.precision == GeometryPrecision::Exact
    }
}

/// Indices of `origin` and `destination` in the trip's stop list.
///
/// The origin keeps its first occurrence; the destination keeps its last
/// occurrence over the whole list, so it may land before the origin.
pub fn find_stop_indices(
    trip: &Trip,
    origin: &str,
    destination: &str,
) -> (Option<usize>, Option<usize>) {
    let mut idx_o = None;
    let mut idx_d = None;
    for (i, entry) in trip.stops.iter().enumerate() {
        if entry.stop_id == origin && idx_o.is_none() {
            idx_o = Some(i);
        }
        if entry.stop_id == destination {
            idx_d = Some(i);
        }
    }
    (idx_o, idx_d)
}

/// Resolve the shape sub-path a trip travels between two stops.
///
/// Returns `None` only if the trip is unknown or its shape is missing or empty.
/// Otherwise returns either the exact segment (origin first) or the full shape.
pub fn resolve_segment<D: ReferenceData + ?Sized>(
    data: &D,
    trip_id: &str,
    origin: &str,
    destination: &str,
) -> Option<ResolvedGeometry> {
    let trip = data.trip(trip_id)?;
    let shape = data.shape(&trip.shape_id).filter(|s| !s.is_empty())?;

    match extract_segment(data, trip, shape, origin, destination) {
        Ok(points) => {
            debug!(
                "[Resolver] trip {}: segment {} -> {} has {} of {} shape points",
                trip_id,
                origin,
                destination,
                points.len(),
                shape.len()
            );
            Some(ResolvedGeometry {
                points,
                precision: GeometryPrecision::Exact,
            })
        }
        Err(reason) => {
            info!(
                "[Resolver] trip {}: {:?} for {} -> {}, using full shape",
                trip_id, reason, origin, destination
            );
            Some(ResolvedGeometry {
                points: shape.points.clone(),
                precision: GeometryPrecision::FullShape(reason),
            })
        }
    }
}

/// Resolve the exact segment, reporting why it is unavailable instead of falling back.
pub fn try_resolve_segment<D: ReferenceData + ?Sized>(
    data: &D,
    trip_id: &str,
    origin: &str,
    destination: &str,
) -> Result<Vec<GeoPoint>> {
    let trip = data.trip(trip_id).ok_or_trip_not_found(trip_id)?;
    let shape = data
        .shape(&trip.shape_id)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| PlaybackError::ShapeNotFound {
            shape_id: trip.shape_id.clone(),
        })?;

    extract_segment(data, trip, shape, origin, destination).map_err(|reason| match reason {
        FallbackReason::StopMissing => {
            let missing = if data.stop(origin).is_none() {
                origin
            } else {
                destination
            };
            PlaybackError::StopNotFound {
                stop_id: missing.to_string(),
            }
        }
        FallbackReason::StopNotInTrip | FallbackReason::InvalidOrder => {
            let (origin_index, destination_index) = find_stop_indices(trip, origin, destination);
            PlaybackError::InvalidOrder {
                trip_id: trip_id.to_string(),
                origin_index,
                destination_index,
            }
        }
        FallbackReason::DegenerateSlice => PlaybackError::DegenerateGeometry {
            label: format!("trip {} segment {} -> {}", trip_id, origin, destination),
            point_count: 1,
            minimum_required: 2,
        },
    })
}

/// Exact segment of `shape` between the two stops, origin first.
fn extract_segment<D: ReferenceData + ?Sized>(
    data: &D,
    trip: &Trip,
    shape: &Shape,
    origin: &str,
    destination: &str,
) -> std::result::Result<Vec<GeoPoint>, FallbackReason> {
    let (origin_stop, destination_stop) = match (data.stop(origin), data.stop(destination)) {
        (Some(o), Some(d)) => (o, d),
        _ => return Err(FallbackReason::StopMissing),
    };

    match find_stop_indices(trip, origin, destination) {
        (Some(idx_o), Some(idx_d)) if idx_d > idx_o => {}
        (Some(_), Some(_)) => return Err(FallbackReason::InvalidOrder),
        _ => return Err(FallbackReason::StopNotInTrip),
    }

    // Shape is non-empty, so both projections exist
    let i1 = nearest_index(&shape.points, &origin_stop.location())
        .ok_or(FallbackReason::DegenerateSlice)?;
    let i2 = nearest_index(&shape.points, &destination_stop.location())
        .ok_or(FallbackReason::DegenerateSlice)?;

    let segment = if i1 <= i2 {
        shape.points[i1..=i2].to_vec()
    } else {
        let mut reversed = shape.points[i2..=i1].to_vec();
        reversed.reverse();
        reversed
    };

    if segment.len() < 2 {
        return Err(FallbackReason::DegenerateSlice);
    }
    Ok(segment)
}
