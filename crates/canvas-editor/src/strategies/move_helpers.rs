//! Helpers shared by the strategies that move elements.

use super::InteractionCanvasState;
use super::group_pins::{has_pin, owning_group, propagate_group_bounds};
use crate::commands::{CanvasCommand, WhenToRun};
use crate::overlay::IntendedBounds;
use crate::session::InteractionSession;
use crate::snapping::{GuidelineWithSnappingVector, SnapEdges, collect_snap_frames, snap_frame};
use canvas_core::classify::replace_group_like_paths_with_children;
use canvas_core::css::{CssNumber, FlexDirection, PinProp};
use canvas_core::document::PropertyPath;
use canvas_core::geom::{Point, Rect};
use canvas_core::layout::ElementsToRerender;
use canvas_core::path::{ElementPath, filter_descendants};

/// The elements a move acts on: group-like selections are replaced by their
/// children, nested selections collapse into their ancestor and unmeasured
/// elements are dropped.
pub fn retarget_measured(canvas_state: &InteractionCanvasState<'_>) -> Vec<ElementPath> {
    let metadata = canvas_state.starting_metadata;
    let retargeted = replace_group_like_paths_with_children(
        metadata,
        canvas_state.starting_all_element_props,
        canvas_state.interaction_target,
    );
    filter_descendants(&retargeted)
        .into_iter()
        .filter(|p| metadata.global_frame(p).is_some())
        .collect()
}

pub fn all_absolute(canvas_state: &InteractionCanvasState<'_>, targets: &[ElementPath]) -> bool {
    !targets.is_empty()
        && targets.iter().all(|t| {
            canvas_state
                .starting_metadata
                .get(t)
                .is_some_and(|m| m.is_absolute())
        })
}

/// With shift held, keep only the dominant axis of the drag.
pub fn constrain_drag(drag: Point, shift: bool) -> Point {
    if !shift {
        drag
    } else if drag.x.abs() >= drag.y.abs() {
        Point::new(drag.x, 0.0)
    } else {
        Point::new(0.0, drag.y)
    }
}

/// Snap the targets' bounding box, moved by `drag`, to nearby frames.
pub fn snap_drag(
    canvas_state: &InteractionCanvasState<'_>,
    targets: &[ElementPath],
    drag: Point,
) -> (Point, Vec<GuidelineWithSnappingVector>) {
    let metadata = canvas_state.starting_metadata;
    let Some(bounds) = metadata.bounding_box(targets) else {
        return (drag, Vec::new());
    };
    let candidates = collect_snap_frames(metadata, targets);
    let threshold = canvas_state.config.snapping_threshold_px / canvas_state.scale;
    let snapped = snap_frame(&bounds.offset(drag), &candidates, SnapEdges::ALL, threshold);
    (drag + snapped.delta, snapped.guidelines)
}

/// The drag to apply to `targets`: constrained with shift, then snapped.
/// Stays fractional; pins are rounded when the commands are built. `None`
/// until the drag leaves the dead zone.
pub fn snapped_drag(
    canvas_state: &InteractionCanvasState<'_>,
    targets: &[ElementPath],
    session: &InteractionSession,
) -> Option<(Point, Vec<GuidelineWithSnappingVector>)> {
    let drag = constrain_drag(session.drag()?, session.modifiers().shift);
    Some(snap_drag(canvas_state, targets, drag))
}

pub fn adjust_pin(
    target: &ElementPath,
    pin: PinProp,
    value_px: f64,
    parent_dimension_px: Option<f64>,
    parent_flex_direction: Option<FlexDirection>,
) -> CanvasCommand {
    CanvasCommand::AdjustCssLengthProperty {
        when_to_run: WhenToRun::Always,
        target: target.clone(),
        property: PropertyPath::style(pin.as_str()),
        value_px,
        parent_dimension_px,
        parent_flex_direction,
        create_if_not_existing: true,
    }
}

pub fn set_pin(
    when_to_run: WhenToRun,
    target: &ElementPath,
    pin: PinProp,
    value_px: f64,
    parent_dimension_px: Option<f64>,
) -> CanvasCommand {
    CanvasCommand::SetCssLengthProperty {
        when_to_run,
        target: target.clone(),
        property: PropertyPath::style(pin.as_str()),
        value: CssNumber::px(value_px),
        parent_dimension_px,
    }
}

/// Pin commands moving one element by `delta`, rounded to whole pixels:
/// existing position pins are adjusted (`right`/`bottom` the other way), an
/// axis without one gets `left`/`top` from its current frame.
pub fn move_pin_commands(
    canvas_state: &InteractionCanvasState<'_>,
    target: &ElementPath,
    delta: Point,
) -> Vec<CanvasCommand> {
    let Some(meta) = canvas_state.starting_metadata.get(target) else {
        return Vec::new();
    };
    let props = canvas_state.starting_all_element_props.get(target);
    let parent = meta.special_size_measurements.immediate_parent_bounds;
    let local = meta.local_frame.unwrap_or_default();
    let axes = [
        (PinProp::Left, PinProp::Right, delta.x, parent.map(|p| p.width), local.x),
        (PinProp::Top, PinProp::Bottom, delta.y, parent.map(|p| p.height), local.y),
    ];
    let mut commands = Vec::new();
    for (start, end, d, dimension, position) in axes {
        let d = d.round();
        if d == 0.0 {
            continue;
        }
        let has_start = has_pin(props, start);
        let has_end = has_pin(props, end);
        if has_start {
            commands.push(adjust_pin(target, start, d, dimension, None));
        }
        if has_end {
            commands.push(adjust_pin(target, end, -d, dimension, None));
        }
        if !has_start && !has_end {
            commands.push(set_pin(WhenToRun::Always, target, start, position + d, dimension));
        }
    }
    commands
}

/// The paths whose measurements a move of `targets` can change: the layout
/// parent of the outermost group around each target (or of the target).
pub fn rerender_scope(canvas_state: &InteractionCanvasState<'_>, targets: &[ElementPath]) -> ElementsToRerender {
    let metadata = canvas_state.starting_metadata;
    let props = canvas_state.starting_all_element_props;
    let mut paths: Vec<ElementPath> = Vec::new();
    for target in targets {
        let mut top = target.clone();
        while let Some(group) = owning_group(metadata, props, &top) {
            top = group;
        }
        let scope = top.parent().unwrap_or(top);
        if !paths.contains(&scope) {
            paths.push(scope);
        }
    }
    ElementsToRerender::Paths(paths)
}

/// Everything a move by `delta` emits: pins for targets in ordinary
/// parents, group propagation for targets inside groups, and the overlay.
pub fn move_commands(
    canvas_state: &InteractionCanvasState<'_>,
    targets: &[ElementPath],
    delta: Point,
    guidelines: Vec<GuidelineWithSnappingVector>,
) -> Vec<CanvasCommand> {
    let metadata = canvas_state.starting_metadata;
    let props = canvas_state.starting_all_element_props;
    let delta = delta.round();
    let mut commands = Vec::new();
    let mut in_groups: Vec<(ElementPath, Rect)> = Vec::new();
    let mut intended = Vec::new();
    for target in targets {
        let Some(frame) = metadata.global_frame(target) else {
            continue;
        };
        let new_frame = frame.offset(delta);
        intended.push(IntendedBounds {
            target: target.clone(),
            frame: new_frame,
        });
        if owning_group(metadata, props, target).is_some() {
            in_groups.push((target.clone(), new_frame));
        } else {
            commands.extend(move_pin_commands(canvas_state, target, delta));
        }
    }
    commands.extend(propagate_group_bounds(metadata, props, &in_groups));
    commands.push(CanvasCommand::SetSnappingGuidelines {
        when_to_run: WhenToRun::MidInteraction,
        guidelines,
    });
    commands.push(CanvasCommand::PushIntendedBounds {
        when_to_run: WhenToRun::MidInteraction,
        bounds: intended,
    });
    commands.push(CanvasCommand::SetElementsToRerender {
        when_to_run: WhenToRun::MidInteraction,
        scope: rerender_scope(canvas_state, targets),
    });
    commands
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shift_keeps_dominant_axis() {
        assert_eq!(constrain_drag(Point::new(10.0, -3.0), true), Point::new(10.0, 0.0));
        assert_eq!(constrain_drag(Point::new(1.0, -3.0), true), Point::new(0.0, -3.0));
        assert_eq!(constrain_drag(Point::new(1.0, -3.0), false), Point::new(1.0, -3.0));
    }
}
