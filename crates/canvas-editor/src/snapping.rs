//! Snapping and guidelines.
//!
//! A moving frame snaps, per axis, to the closest line of a nearby frame
//! (sibling or parent) within a threshold. Lines are the start, center and
//! end of each candidate frame. After snapping, every exact alignment on a
//! snapped axis becomes a guideline for the overlay.

use crate::session::EdgePosition;
use canvas_core::geom::{Point, Rect};
use canvas_core::metadata::ElementInstanceMetadataMap;
use canvas_core::path::ElementPath;
use serde::Serialize;

const ALIGNMENT_EPSILON: f64 = 1e-6;

/// A guideline drawn across the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum Guideline {
    /// A vertical line at `x`.
    #[serde(rename = "XAxisGuideline")]
    XAxis { x: f64, y_top: f64, y_bottom: f64 },
    /// A horizontal line at `y`.
    #[serde(rename = "YAxisGuideline")]
    YAxis { y: f64, x_left: f64, x_right: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GuidelineWithSnappingVector {
    pub guideline: Guideline,
    /// How far the frame was moved to reach this line.
    pub snapping_vector: Point,
    /// Where the line touches the frame it was taken from.
    pub points_of_relevance: Vec<Point>,
}

/// Which lines of one axis of the moving frame may snap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisEdges {
    pub start: bool,
    pub center: bool,
    pub end: bool,
}

impl AxisEdges {
    pub const ALL: AxisEdges = AxisEdges {
        start: true,
        center: true,
        end: true,
    };
    pub const NONE: AxisEdges = AxisEdges {
        start: false,
        center: false,
        end: false,
    };

    fn for_handle(position: f64) -> Self {
        if position == 0.0 {
            AxisEdges {
                start: true,
                ..Self::NONE
            }
        } else if position == 1.0 {
            AxisEdges {
                end: true,
                ..Self::NONE
            }
        } else {
            Self::NONE
        }
    }

    fn any(&self) -> bool {
        self.start || self.center || self.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapEdges {
    pub x: AxisEdges,
    pub y: AxisEdges,
}

impl SnapEdges {
    pub const ALL: SnapEdges = SnapEdges {
        x: AxisEdges::ALL,
        y: AxisEdges::ALL,
    };

    /// Only the edges a resize handle moves.
    pub fn for_resize(edge: EdgePosition) -> Self {
        SnapEdges {
            x: AxisEdges::for_handle(edge.x),
            y: AxisEdges::for_handle(edge.y),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SnapResult {
    /// Add to the drag to land on the snapped lines.
    pub delta: Point,
    /// X-axis guidelines first, then Y-axis.
    pub guidelines: Vec<GuidelineWithSnappingVector>,
}

/// Frames the targets may snap to: their measured siblings and their
/// parents. Targets and anything inside them are excluded.
pub fn collect_snap_frames(
    metadata: &ElementInstanceMetadataMap,
    targets: &[ElementPath],
) -> Vec<Rect> {
    let is_moving = |p: &ElementPath| targets.iter().any(|t| p.is_descendant_or_equal(t));
    let mut frames: Vec<Rect> = Vec::new();
    let mut push = |frame: Rect| {
        if !frames.contains(&frame) {
            frames.push(frame);
        }
    };
    for target in targets {
        for sibling in metadata.siblings(target) {
            if is_moving(&sibling) {
                continue;
            }
            match metadata.get(&sibling) {
                Some(m) if !m.is_fragment() => {
                    if let Some(frame) = m.global_frame {
                        push(frame);
                    }
                }
                _ => {}
            }
        }
    }
    for target in targets {
        let Some(parent) = target.parent() else {
            continue;
        };
        if parent.is_storyboard() || is_moving(&parent) {
            continue;
        }
        if let Some(frame) = metadata.global_frame(&parent) {
            push(frame);
        }
    }
    frames
}

fn axis_lines(start: f64, size: f64) -> [f64; 3] {
    [start, start + size / 2.0, start + size]
}

fn moving_lines(start: f64, size: f64, edges: AxisEdges) -> Vec<f64> {
    let [s, c, e] = axis_lines(start, size);
    let mut out = Vec::with_capacity(3);
    if edges.start {
        out.push(s);
    }
    if edges.center {
        out.push(c);
    }
    if edges.end {
        out.push(e);
    }
    out
}

/// Smallest offset that aligns a moving line with a candidate line.
fn best_snap(moving: &[f64], candidates: impl Iterator<Item = [f64; 3]>, threshold: f64) -> Option<f64> {
    let mut best: Option<f64> = None;
    for lines in candidates {
        for line in lines {
            for edge in moving {
                let d = line - edge;
                if d.abs() <= threshold && best.is_none_or(|b| d.abs() < b.abs()) {
                    best = Some(d);
                }
            }
        }
    }
    best
}

/// Snap `frame` against `candidates`.
pub fn snap_frame(frame: &Rect, candidates: &[Rect], edges: SnapEdges, threshold: f64) -> SnapResult {
    let dx = if edges.x.any() {
        best_snap(
            &moving_lines(frame.x, frame.width, edges.x),
            candidates.iter().map(|c| axis_lines(c.x, c.width)),
            threshold,
        )
    } else {
        None
    };
    let dy = if edges.y.any() {
        best_snap(
            &moving_lines(frame.y, frame.height, edges.y),
            candidates.iter().map(|c| axis_lines(c.y, c.height)),
            threshold,
        )
    } else {
        None
    };
    let delta = Point::new(dx.unwrap_or(0.0), dy.unwrap_or(0.0));
    let snapped = frame.offset(delta);

    let mut guidelines: Vec<GuidelineWithSnappingVector> = Vec::new();
    let mut push = |g: GuidelineWithSnappingVector| {
        if !guidelines.iter().any(|existing| existing.guideline == g.guideline) {
            guidelines.push(g);
        }
    };
    if let Some(dx) = dx {
        let edges_x = moving_lines(snapped.x, snapped.width, edges.x);
        for c in candidates {
            for line in axis_lines(c.x, c.width) {
                if edges_x.iter().any(|e| (e - line).abs() < ALIGNMENT_EPSILON) {
                    push(GuidelineWithSnappingVector {
                        guideline: Guideline::XAxis {
                            x: line,
                            y_top: snapped.y.min(c.y),
                            y_bottom: snapped.bottom().max(c.bottom()),
                        },
                        snapping_vector: Point::new(dx, 0.0),
                        points_of_relevance: vec![Point::new(line, c.y), Point::new(line, c.bottom())],
                    });
                }
            }
        }
    }
    if let Some(dy) = dy {
        let edges_y = moving_lines(snapped.y, snapped.height, edges.y);
        for c in candidates {
            for line in axis_lines(c.y, c.height) {
                if edges_y.iter().any(|e| (e - line).abs() < ALIGNMENT_EPSILON) {
                    push(GuidelineWithSnappingVector {
                        guideline: Guideline::YAxis {
                            y: line,
                            x_left: snapped.x.min(c.x),
                            x_right: snapped.right().max(c.right()),
                        },
                        snapping_vector: Point::new(0.0, dy),
                        points_of_relevance: vec![Point::new(c.x, line), Point::new(c.right(), line)],
                    });
                }
            }
        }
    }
    SnapResult { delta, guidelines }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn snaps_to_closest_line_within_threshold() {
        let frame = Rect::new(0.0, 0.0, 10.0, 10.0);
        let other = Rect::new(13.0, 100.0, 10.0, 10.0);
        let result = snap_frame(&frame, &[other], SnapEdges::ALL, 5.0);
        assert_eq!(result.delta, Point::new(3.0, 0.0));
        assert_eq!(
            result.guidelines,
            vec![GuidelineWithSnappingVector {
                guideline: Guideline::XAxis {
                    x: 13.0,
                    y_top: 0.0,
                    y_bottom: 110.0
                },
                snapping_vector: Point::new(3.0, 0.0),
                points_of_relevance: vec![Point::new(13.0, 100.0), Point::new(13.0, 110.0)],
            }]
        );
    }

    #[test]
    fn nothing_beyond_threshold() {
        let frame = Rect::new(0.0, 0.0, 10.0, 10.0);
        let other = Rect::new(40.0, 40.0, 10.0, 10.0);
        assert_eq!(snap_frame(&frame, &[other], SnapEdges::ALL, 5.0), SnapResult::default());
    }

    #[test]
    fn resize_snaps_only_moving_edges() {
        let frame = Rect::new(0.0, 0.0, 10.0, 10.0);
        // left edge is 2px from the candidate's right edge, but only the
        // right edge moves
        let other = Rect::new(-12.0, 50.0, 10.0, 10.0);
        let edges = SnapEdges::for_resize(EdgePosition::RIGHT);
        assert_eq!(snap_frame(&frame, &[other], edges, 5.0).delta, Point::ZERO);
        let edges = SnapEdges::for_resize(EdgePosition::LEFT);
        assert_eq!(snap_frame(&frame, &[other], edges, 5.0).delta, Point::new(-2.0, 0.0));
    }

    #[test]
    fn guideline_serializes_with_type_tag() {
        let g = Guideline::XAxis {
            x: 1.0,
            y_top: 2.0,
            y_bottom: 3.0,
        };
        assert_eq!(
            serde_json::to_value(g).unwrap(),
            serde_json::json!({ "type": "XAxisGuideline", "x": 1.0, "yTop": 2.0, "yBottom": 3.0 })
        );
    }
}
