//! Bounding-box resize math and the pin commands it turns into.

use super::group_pins::has_pin;
use super::move_helpers::{adjust_pin, set_pin};
use crate::commands::{CanvasCommand, WhenToRun};
use crate::overlay::CursorStyle;
use crate::session::EdgePosition;
use crate::snapping::{Guideline, GuidelineWithSnappingVector, SnapEdges, snap_frame};
use canvas_core::css::{FlexDirection, PinProp};
use canvas_core::geom::{Point, Rect, round_to};
use canvas_core::path::ElementPath;
use serde_json::{Map, Value};

/// Prop marking an element whose width/height ratio must survive a resize.
pub const ASPECT_RATIO_LOCKED_PROP: &str = "data-aspect-ratio-locked";

/// Which box anchors a resize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeAnchor {
    /// The edges opposite the grabbed handle stay put.
    Opposite,
    /// Paired edges move symmetrically around the center.
    Center,
}

pub fn is_aspect_ratio_locked(props: Option<&Map<String, Value>>) -> bool {
    props
        .and_then(|p| p.get(ASPECT_RATIO_LOCKED_PROP))
        .is_some_and(|v| match v {
            Value::Bool(b) => *b,
            Value::String(s) => s != "false",
            Value::Null => false,
            _ => true,
        })
}

/// Width over height of `original` when shift is held or a target asks for
/// it. A box without height cannot be locked.
pub fn locked_aspect_ratio(shift: bool, any_target_locked: bool, original: &Rect) -> Option<f64> {
    if (shift || any_target_locked) && original.height != 0.0 && original.width != 0.0 {
        Some(original.width / original.height)
    } else {
        None
    }
}

/// Move one axis of a box: `handle` is `0` (start edge), `1` (end edge) or
/// `0.5` (axis untouched). Returns `(start, size)`.
fn resize_axis(start: f64, size: f64, delta: f64, handle: f64, anchor: ResizeAnchor) -> (f64, f64) {
    match (handle, anchor) {
        (h, ResizeAnchor::Opposite) if h == 0.0 => (start + delta, size - delta),
        (h, ResizeAnchor::Opposite) if h == 1.0 => (start, size + delta),
        (h, ResizeAnchor::Center) if h == 0.0 => (start + delta, size - 2.0 * delta),
        (h, ResizeAnchor::Center) if h == 1.0 => (start - delta, size + 2.0 * delta),
        _ => (start, size),
    }
}

/// Where an axis starts once its size is forced to `size`, keeping the
/// anchor of the resize fixed.
fn reanchor(original_start: f64, original_size: f64, size: f64, handle: f64, anchor: ResizeAnchor) -> f64 {
    match anchor {
        ResizeAnchor::Center => original_start + (original_size - size) / 2.0,
        ResizeAnchor::Opposite if handle == 0.0 => original_start + original_size - size,
        ResizeAnchor::Opposite if handle == 1.0 => original_start,
        // the axis was not grabbed: grow around its center
        ResizeAnchor::Opposite => original_start + (original_size - size) / 2.0,
    }
}

/// The box `original` becomes when the handle at `edge` is dragged by
/// `drag`. Dragging an edge past its opposite edge flips the box.
pub fn resize_bounding_box(
    original: &Rect,
    drag: Point,
    edge: EdgePosition,
    locked_aspect_ratio: Option<f64>,
    anchor: ResizeAnchor,
) -> Rect {
    let (x, width) = resize_axis(original.x, original.width, drag.x, edge.x, anchor);
    let (y, height) = resize_axis(original.y, original.height, drag.y, edge.y, anchor);
    let Some(ratio) = locked_aspect_ratio else {
        return Rect::new(x, y, width, height).normalized();
    };

    let width_change = (width / original.width - 1.0).abs();
    let height_change = (height / original.height - 1.0).abs();
    let width_leads = if edge.x == 0.5 {
        false
    } else if edge.y == 0.5 {
        true
    } else {
        width_change >= height_change
    };
    let (width, height) = if width_leads {
        (width, width / ratio)
    } else {
        (height * ratio, height)
    };
    Rect::new(
        reanchor(original.x, original.width, width, edge.x, anchor),
        reanchor(original.y, original.height, height, edge.y, anchor),
        width,
        height,
    )
    .normalized()
}

/// Snap a resized box on the edges its handle moves.
///
/// A centered resize moves the paired edge by the same amount. With a
/// locked ratio only one axis keeps its snap (the closer one) and the other
/// dimension is derived from the ratio again, so guidelines of the dropped
/// axis are discarded.
pub fn snap_resized_box(
    resized: &Rect,
    candidates: &[Rect],
    edge: EdgePosition,
    locked_aspect_ratio: Option<f64>,
    anchor: ResizeAnchor,
    threshold: f64,
) -> (Rect, Vec<GuidelineWithSnappingVector>) {
    let snap = snap_frame(resized, candidates, SnapEdges::for_resize(edge), threshold);
    let snapped_x = snap.guidelines.iter().any(|g| matches!(g.guideline, Guideline::XAxis { .. }));
    let snapped_y = snap.guidelines.iter().any(|g| matches!(g.guideline, Guideline::YAxis { .. }));
    let Some(ratio) = locked_aspect_ratio else {
        return (apply_resize_snap(resized, snap.delta, edge, anchor), snap.guidelines);
    };

    let keep_x = match (snapped_x, snapped_y) {
        (false, false) => return (*resized, Vec::new()),
        (true, false) => true,
        (false, true) => false,
        (true, true) => snap.delta.x.abs() <= snap.delta.y.abs(),
    };
    let guidelines = snap
        .guidelines
        .into_iter()
        .filter(|g| matches!(g.guideline, Guideline::XAxis { .. }) == keep_x)
        .collect();
    let delta = if keep_x {
        Point::new(snap.delta.x, 0.0)
    } else {
        Point::new(0.0, snap.delta.y)
    };
    let snapped = apply_resize_snap(resized, delta, edge, anchor);
    let frame = if keep_x {
        let height = snapped.width / ratio;
        Rect::new(
            snapped.x,
            reanchor(snapped.y, snapped.height, height, edge.y, anchor),
            snapped.width,
            height,
        )
    } else {
        let width = snapped.height * ratio;
        Rect::new(
            reanchor(snapped.x, snapped.width, width, edge.x, anchor),
            snapped.y,
            width,
            snapped.height,
        )
    };
    (frame, guidelines)
}

/// Shift the edges `edge` moves by a snapping `delta`.
fn apply_resize_snap(frame: &Rect, delta: Point, edge: EdgePosition, anchor: ResizeAnchor) -> Rect {
    let (x, width) = resize_axis(frame.x, frame.width, delta.x, edge.x, anchor);
    let (y, height) = resize_axis(frame.y, frame.height, delta.y, edge.y, anchor);
    Rect::new(x, y, width, height)
}

/// Pins of one axis a resize writes. Existing pins are kept; a lone
/// position pin gets the size pin, a lone size pin gets the pin of the
/// grabbed edge (`handle` is `0`, `0.5` or `1`), and an axis without pins
/// gets the start and size pins.
fn pins_for_axis(props: Option<&Map<String, Value>>, axis: [PinProp; 3], handle: f64) -> Vec<PinProp> {
    let [start, size, end] = axis;
    let existing: Vec<PinProp> = axis.into_iter().filter(|pin| has_pin(props, *pin)).collect();
    let added = match existing.as_slice() {
        [] => vec![start, size],
        [only] if *only == size => vec![if handle == 1.0 { end } else { start }],
        [_] => vec![size],
        _ => Vec::new(),
    };
    // keep left/width/right order
    axis.into_iter()
        .filter(|pin| existing.contains(pin) || added.contains(pin))
        .collect()
}

/// The pins of one element a resize from `edge` writes: at least two per
/// axis, in `left`, `width`, `right` order (`top`, `height`, `bottom`
/// vertically).
pub fn ensure_at_least_two_pins(props: Option<&Map<String, Value>>, edge: EdgePosition) -> Vec<PinProp> {
    let mut pins = pins_for_axis(props, PinProp::HORIZONTAL, edge.x);
    pins.extend(pins_for_axis(props, PinProp::VERTICAL, edge.y));
    pins
}

/// Commands taking one element from `original_frame` to `new_frame` (both
/// global) for a resize from `edge`. Existing pins are adjusted by their
/// rounded change, missing ones are set from the new frame.
pub fn resize_commands_from_frame(
    target: &ElementPath,
    props: Option<&Map<String, Value>>,
    edge: EdgePosition,
    new_frame: &Rect,
    original_frame: &Rect,
    parent_bounds: Option<Rect>,
    parent_flex_direction: Option<FlexDirection>,
) -> Vec<CanvasCommand> {
    let parent = parent_bounds.unwrap_or_default();
    let parent_size = (parent.width, parent.height);
    let original_local = original_frame.to_local(&parent);
    let new_local = new_frame.to_local(&parent);
    ensure_at_least_two_pins(props, edge)
        .into_iter()
        .filter_map(|pin| {
            // far-edge pins need a parent to measure from
            if parent_bounds.is_none() && pin.direction() < 0.0 {
                return None;
            }
            let new_value = pin.value_for_frame(&new_local, parent_size);
            let delta = round_to(new_value - pin.value_for_frame(&original_local, parent_size), 0);
            if delta == 0.0 {
                return None;
            }
            let dimension = parent_bounds.map(|p| if pin.is_horizontal() { p.width } else { p.height });
            Some(if has_pin(props, pin) {
                adjust_pin(target, pin, delta, dimension, parent_flex_direction)
            } else {
                set_pin(WhenToRun::Always, target, pin, round_to(new_value, 0), dimension)
            })
        })
        .collect()
}

pub fn pick_cursor_from_edge_position(edge: EdgePosition) -> CursorStyle {
    let is_top_left_or_bottom_right = edge == EdgePosition::TOP_LEFT || edge == EdgePosition::BOTTOM_RIGHT;
    let is_top_right_or_bottom_left = edge == EdgePosition::TOP_RIGHT || edge == EdgePosition::BOTTOM_LEFT;
    if is_top_left_or_bottom_right {
        CursorStyle::NwseResize
    } else if is_top_right_or_bottom_left {
        CursorStyle::NeswResize
    } else if edge.x == 0.5 {
        CursorStyle::NsResize
    } else {
        CursorStyle::EwResize
    }
}
