//! Unified error handling for the trip-playback library.
//!
//! Resolution and sequencing degrade to fallbacks instead of failing, so these
//! errors surface only where a caller asks for them: input parsing,
//! configuration validation, and the diagnostic [`crate::try_resolve_segment`].

use thiserror::Error;

/// Unified error type for trip-playback operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlaybackError {
    /// Trip id is not present in the reference data
    #[error("Trip '{trip_id}' not found")]
    TripNotFound { trip_id: String },

    /// Shape id is not present, or the shape has no points
    #[error("Shape '{shape_id}' not found or empty")]
    ShapeNotFound { shape_id: String },

    /// Stop id is not present in the reference data
    #[error("Stop '{stop_id}' not found")]
    StopNotFound { stop_id: String },

    /// Origin/destination are missing from the trip or the destination does not follow the origin
    #[error(
        "Trip '{trip_id}' does not serve the stops in order ({} -> {})",
        fmt_index(.origin_index),
        fmt_index(.destination_index)
    )]
    InvalidOrder {
        trip_id: String,
        origin_index: Option<usize>,
        destination_index: Option<usize>,
    },

    /// Geometry has fewer points than an animation needs
    #[error("'{label}' has {point_count} points, minimum {minimum_required} required")]
    DegenerateGeometry {
        label: String,
        point_count: usize,
        minimum_required: usize,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    InvalidConfig { message: String },

    /// Malformed reference data or planner payload
    #[error("Parse error: {message}")]
    Parse { message: String },
}

fn fmt_index(index: &Option<usize>) -> String {
    index.map_or_else(|| "-1".to_string(), |i| i.to_string())
}

impl From<serde_json::Error> for PlaybackError {
    fn from(err: serde_json::Error) -> Self {
        PlaybackError::Parse {
            message: err.to_string(),
        }
    }
}

/// Result type alias for trip-playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;

/// Extension trait for converting Option to PlaybackError.
pub trait OptionExt<T> {
    /// Convert Option to Result with a degenerate geometry error.
    fn ok_or_degenerate(self, label: &str, point_count: usize, minimum: usize) -> Result<T>;

    /// Convert Option to Result with a trip not found error.
    fn ok_or_trip_not_found(self, trip_id: &str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_degenerate(self, label: &str, point_count: usize, minimum: usize) -> Result<T> {
        self.ok_or_else(|| PlaybackError::DegenerateGeometry {
            label: label.to_string(),
            point_count,
            minimum_required: minimum,
        })
    }

    fn ok_or_trip_not_found(self, trip_id: &str) -> Result<T> {
        self.ok_or_else(|| PlaybackError::TripNotFound {
            trip_id: trip_id.to_string(),
        })
    }
}
