//! Geographic utilities: great-circle distance, nearest-point search, bounds.
//!
//! Everything here is pure and stateless. Shapes are short enough (a few
//! thousand points per trip) that nearest-point search is a linear scan.

use geo::{BoundingRect, LineString};

use crate::{Bounds, GeoPoint};

/// Mean earth radius used by the spherical approximation, in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance between two points in meters (haversine formula).
///
/// # Example
/// ```
/// use trip_playback::{GeoPoint, haversine_distance};
///
/// let milano = GeoPoint::new(45.4642, 9.1900);
/// let torino = GeoPoint::new(45.0703, 7.6869);
/// let d = haversine_distance(&milano, &torino);
/// assert!(d > 120_000.0 && d < 130_000.0);
/// ```
pub fn haversine_distance(p1: &GeoPoint, p2: &GeoPoint) -> f64 {
    let lat1 = p1.latitude.to_radians();
    let lat2 = p2.latitude.to_radians();
    let dlat = (p2.latitude - p1.latitude).to_radians();
    let dlng = (p2.longitude - p1.longitude).to_radians();

    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Index of the shape point closest to `target`, scanning the whole shape.
///
/// Ties resolve to the lowest index. Returns `None` for an empty shape.
pub fn nearest_index(shape: &[GeoPoint], target: &GeoPoint) -> Option<usize> {
    if shape.is_empty() {
        return None;
    }
    nearest_index_in_range(shape, target, 0, shape.len() - 1)
}

/// Index of the shape point closest to `target` within `start..=end`.
///
/// The range is clamped to the shape. Ties resolve to the lowest index.
/// Returns `None` when the shape is empty or the clamped range is empty.
pub fn nearest_index_in_range(
    shape: &[GeoPoint],
    target: &GeoPoint,
    start: usize,
    end: usize,
) -> Option<usize> {
    if shape.is_empty() {
        return None;
    }
    let end = end.min(shape.len() - 1);
    if start > end {
        return None;
    }

    let mut best = start;
    let mut best_dist = f64::INFINITY;
    for (i, point) in shape.iter().enumerate().take(end + 1).skip(start) {
        let d = haversine_distance(point, target);
        // Strict comparison keeps the first occurrence on ties
        if d < best_dist {
            best_dist = d;
            best = i;
        }
    }
    Some(best)
}

/// Total length of a polyline in meters.
pub fn polyline_length(points: &[GeoPoint]) -> f64 {
    points
        .windows(2)
        .map(|w| haversine_distance(&w[0], &w[1]))
        .sum()
}

/// Whether two points lie within `threshold_m` meters of each other.
pub fn are_close(a: &GeoPoint, b: &GeoPoint, threshold_m: f64) -> bool {
    haversine_distance(a, b) <= threshold_m
}

/// Drop interior points closer than `min_spacing_m` to the last kept point.
///
/// The first and last points are always kept, so a path of two or more
/// points never shrinks below two.
pub fn thin_path(points: &[GeoPoint], min_spacing_m: f64) -> Vec<GeoPoint> {
    if points.len() <= 2 {
        return points.to_vec();
    }

    let mut kept = vec![points[0]];
    for point in &points[1..points.len() - 1] {
        let last = kept[kept.len() - 1];
        if haversine_distance(&last, point) >= min_spacing_m {
            kept.push(*point);
        }
    }
    kept.push(points[points.len() - 1]);
    kept
}

/// Bounding box of a set of points.
pub fn compute_bounds(points: &[GeoPoint]) -> Option<Bounds> {
    let line: LineString<f64> = points.iter().map(|p| geo::Coord::from(*p)).collect();
    line.bounding_rect().map(|rect| Bounds {
        min_lat: rect.min().y,
        max_lat: rect.max().y,
        min_lng: rect.min().x,
        max_lng: rect.max().x,
    })
}
