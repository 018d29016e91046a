//! Outputs of the playback engine: the map and the status surface.

use crate::sequencer::{PlayablePath, TravelMode};
use crate::GeoPoint;

/// Handle of a marker created by a [`MapAdapter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MarkerHandle(pub u64);

/// Map operations the engine issues while animating.
pub trait MapAdapter {
    /// Create the vehicle marker for `kind` at `at`.
    fn create_marker(&mut self, kind: TravelMode, at: GeoPoint) -> MarkerHandle;

    fn set_marker_position(&mut self, marker: MarkerHandle, at: GeoPoint);

    fn pan_to(&mut self, at: GeoPoint);

    /// Remove the marker and anything else drawn for the session.
    fn clear_transient_layer(&mut self);

    /// Called whenever a path becomes the current one.
    fn show_path(&mut self, _path: &PlayablePath) {}

    /// Restyle the marker when the next path uses a different mode.
    fn set_marker_kind(&mut self, _marker: MarkerHandle, _kind: TravelMode) {}
}

/// Progress and status outputs.
pub trait StatusSurface {
    fn set_progress_text(&mut self, text: &str);

    /// 0 to 100.
    fn set_progress_percent(&mut self, percent: u8);

    fn set_status(&mut self, text: &str);

    /// Put back whatever status was shown before playback started.
    fn restore_status(&mut self);
}
