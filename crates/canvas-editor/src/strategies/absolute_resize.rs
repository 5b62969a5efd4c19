//! Resizing a selection of absolute elements by its bounding box.
//!
//! The multiselect bounding box is resized from the grabbed handle, snapped
//! on the edges that move, and every target is mapped proportionally from
//! the old box into the new one. Targets inside groups go through group
//! propagation instead of writing their own pins.

use super::group_pins::{owning_group, propagate_group_bounds};
use super::move_helpers::{all_absolute, rerender_scope, retarget_measured};
use super::resize_helpers::{
    ResizeAnchor, is_aspect_ratio_locked, locked_aspect_ratio, pick_cursor_from_edge_position, resize_bounding_box,
    resize_commands_from_frame, snap_resized_box,
};
use super::{
    CanvasControl, CanvasStrategy, CanvasStrategyId, ControlVisibility, ControlWithProps, InteractionCanvasState,
    StrategyApplicationResult, StrategyError, StrategyState,
};
use crate::commands::{CanvasCommand, WhenToRun};
use crate::overlay::IntendedBounds;
use crate::session::{ActiveControl, InteractionSession};
use crate::snapping::collect_snap_frames;
use canvas_core::geom::Rect;
use canvas_core::path::ElementPath;

pub struct AbsoluteResizeBoundingBoxStrategy<'a> {
    canvas_state: InteractionCanvasState<'a>,
    targets: Vec<ElementPath>,
}

pub fn absolute_resize_bounding_box_strategy<'a>(
    canvas_state: &InteractionCanvasState<'a>,
    _session: &InteractionSession,
) -> Option<Box<dyn CanvasStrategy + 'a>> {
    let targets = retarget_measured(canvas_state);
    if !all_absolute(canvas_state, &targets) {
        return None;
    }
    Some(Box::new(AbsoluteResizeBoundingBoxStrategy {
        canvas_state: *canvas_state,
        targets,
    }))
}

impl CanvasStrategy for AbsoluteResizeBoundingBoxStrategy<'_> {
    fn id(&self) -> CanvasStrategyId {
        CanvasStrategyId::AbsoluteResizeBoundingBox
    }

    fn name(&self) -> &'static str {
        "Resize"
    }

    fn controls_to_render(&self) -> Vec<ControlWithProps> {
        vec![
            ControlWithProps::new(
                CanvasControl::ResizeHandles,
                ControlVisibility::VisibleExceptWhenOtherStrategyIsActive,
            ),
            ControlWithProps::new(CanvasControl::ParentOutlines, ControlVisibility::VisibleOnlyWhileActive),
            ControlWithProps::new(CanvasControl::SnappingGuidelines, ControlVisibility::VisibleOnlyWhileActive),
        ]
    }

    fn fitness(&self, session: &InteractionSession) -> f64 {
        let on_handle = matches!(session.active_control, ActiveControl::ResizeHandle { .. });
        if on_handle && session.drag_start().is_some() {
            1.0
        } else {
            0.0
        }
    }

    fn apply(
        &self,
        session: &InteractionSession,
        _strategy_state: &StrategyState,
    ) -> Result<StrategyApplicationResult, StrategyError> {
        let ActiveControl::ResizeHandle { edge_position } = session.active_control else {
            return Err(StrategyError::UnexpectedInteraction { expected: "resize handle" });
        };
        let cursor = CanvasCommand::SetCursor {
            when_to_run: WhenToRun::MidInteraction,
            cursor: pick_cursor_from_edge_position(edge_position),
        };
        let clear_highlights = CanvasCommand::UpdateHighlightedViews {
            when_to_run: WhenToRun::MidInteraction,
            paths: Vec::new(),
        };
        let Some(drag) = session.drag() else {
            return Ok(StrategyApplicationResult::new(vec![cursor, clear_highlights]));
        };

        let canvas_state = &self.canvas_state;
        let metadata = canvas_state.starting_metadata;
        let props = canvas_state.starting_all_element_props;
        let original = match metadata.bounding_box(&self.targets) {
            Some(original) => original,
            None => return Ok(StrategyApplicationResult::default()),
        };

        let modifiers = session.modifiers();
        let any_locked = self.targets.iter().any(|t| is_aspect_ratio_locked(props.get(t)));
        let locked = locked_aspect_ratio(modifiers.shift, any_locked, &original);
        let anchor = if modifiers.alt {
            ResizeAnchor::Center
        } else {
            ResizeAnchor::Opposite
        };
        let resized = resize_bounding_box(&original, drag, edge_position, locked, anchor);
        let candidates = collect_snap_frames(metadata, &self.targets);
        let threshold = canvas_state.config.snapping_threshold_px / canvas_state.scale;
        let (snapped, guidelines) = snap_resized_box(&resized, &candidates, edge_position, locked, anchor, threshold);

        let mut commands = Vec::new();
        let mut in_groups: Vec<(ElementPath, Rect)> = Vec::new();
        let mut intended = Vec::new();
        for target in &self.targets {
            let (Some(meta), Some(frame)) = (metadata.get(target), metadata.global_frame(target)) else {
                continue;
            };
            let new_frame = frame.transform_using_bounding_box(&snapped, &original).round_to_whole();
            intended.push(IntendedBounds {
                target: target.clone(),
                frame: new_frame,
            });
            if owning_group(metadata, props, target).is_some() {
                in_groups.push((target.clone(), new_frame));
                continue;
            }
            commands.extend(resize_commands_from_frame(
                target,
                props.get(target),
                edge_position,
                &new_frame,
                &frame,
                meta.special_size_measurements.immediate_parent_bounds,
                meta.special_size_measurements.parent_flex_direction,
            ));
        }
        commands.extend(propagate_group_bounds(metadata, props, &in_groups));
        commands.extend([
            CanvasCommand::SetSnappingGuidelines {
                when_to_run: WhenToRun::MidInteraction,
                guidelines,
            },
            CanvasCommand::PushIntendedBounds {
                when_to_run: WhenToRun::MidInteraction,
                bounds: intended,
            },
            clear_highlights,
            cursor,
            CanvasCommand::SetElementsToRerender {
                when_to_run: WhenToRun::MidInteraction,
                scope: rerender_scope(canvas_state, &self.targets),
            },
        ]);
        Ok(StrategyApplicationResult::new(commands))
    }
}
