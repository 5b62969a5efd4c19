//! Tunable interaction constants.

use serde::Deserialize;

/// Interaction thresholds and limits. Pixel values are screen pixels and are
/// divided by the canvas scale before use.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CanvasConfig {
    /// Distance within which a moving edge snaps to a guideline.
    pub snapping_threshold_px: f64,
    /// Dead zone a pointer must leave before a press becomes a drag.
    pub drag_threshold_px: f64,
    /// Arrow-key step.
    pub nudge_px: f64,
    /// Arrow-key step with shift held.
    pub large_nudge_px: f64,
    /// Number of committed interactions kept for undo.
    pub max_undo_depth: usize,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            snapping_threshold_px: 5.0,
            drag_threshold_px: 2.0,
            nudge_px: 1.0,
            large_nudge_px: 10.0,
            max_undo_depth: 100,
        }
    }
}

impl CanvasConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config = CanvasConfig::from_json(r#"{ "snappingThresholdPx": 8 }"#).unwrap();
        assert_eq!(config.snapping_threshold_px, 8.0);
        assert_eq!(config.drag_threshold_px, 2.0);
        assert_eq!(config.max_undo_depth, 100);
    }
}
