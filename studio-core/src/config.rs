//! Editor configuration.

use serde::{Deserialize, Serialize};

/// Snap tolerance in canvas units at 100% zoom.
pub const DEFAULT_SNAP_TOLERANCE: f64 = 5.0;

/// Smallest width or height a resize can produce.
pub const DEFAULT_MIN_SIZE: f64 = 1.0;

/// Distance from the top edge to the rotate handle, in screen pixels.
pub const ROTATE_HANDLE_OFFSET_PX: f64 = 24.0;

/// Screen-space hit radius for handles, in pixels.
pub const HANDLE_RADIUS_PX: f64 = 8.0;

/// Number of snapshots kept by the undo history.
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// Offset applied to duplicated elements, in canvas units.
pub const DEFAULT_DUPLICATE_OFFSET: f64 = 10.0;

/// Tunables for interactive editing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Whether drags snap to sibling edges and centers.
    pub snap_enabled: bool,
    /// Whether the canvas edges and center are snap targets.
    pub snap_to_canvas: bool,
    /// Snap tolerance in canvas units at 100% zoom.
    pub snap_tolerance: f64,
    /// Minimum width/height produced by resizing.
    pub min_size: f64,
    /// Rotate handle distance above the top edge, in screen pixels.
    pub rotate_handle_offset_px: f64,
    /// Handle hit radius, in screen pixels.
    pub handle_radius_px: f64,
    /// Maximum number of undo snapshots.
    pub history_limit: usize,
    /// Offset applied to duplicates on both axes.
    pub duplicate_offset: f64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            snap_enabled: true,
            snap_to_canvas: true,
            snap_tolerance: DEFAULT_SNAP_TOLERANCE,
            min_size: DEFAULT_MIN_SIZE,
            rotate_handle_offset_px: ROTATE_HANDLE_OFFSET_PX,
            handle_radius_px: HANDLE_RADIUS_PX,
            history_limit: DEFAULT_HISTORY_LIMIT,
            duplicate_offset: DEFAULT_DUPLICATE_OFFSET,
        }
    }
}

impl EditorConfig {
    /// Load a configuration from JSON; missing fields take defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed.
    pub fn from_json(json: &str) -> crate::CoreResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = EditorConfig::from_json(r#"{"snap_tolerance": 8.0}"#).expect("parse");
        assert!((config.snap_tolerance - 8.0).abs() < f64::EPSILON);
        assert_eq!(config.history_limit, DEFAULT_HISTORY_LIMIT);
        assert!(config.snap_enabled);
    }
}
