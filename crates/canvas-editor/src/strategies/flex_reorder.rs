//! Reordering a flex child by dragging it along its container's axis.

use super::{
    CanvasControl, CanvasStrategy, CanvasStrategyId, ControlVisibility, ControlWithProps, CustomStrategyStatePatch,
    InteractionCanvasState, StrategyApplicationResult, StrategyError, StrategyState,
};
use crate::commands::{CanvasCommand, WhenToRun};
use crate::overlay::CursorStyle;
use crate::session::{ActiveControl, InteractionSession};
use canvas_core::css::FlexDirection;
use canvas_core::geom::Rect;
use canvas_core::layout::ElementsToRerender;
use canvas_core::metadata::ElementInstanceMetadataMap;
use canvas_core::path::ElementPath;

pub struct FlexReorderStrategy<'a> {
    canvas_state: InteractionCanvasState<'a>,
    target: ElementPath,
    direction: FlexDirection,
}

fn is_in_flow(metadata: &ElementInstanceMetadataMap, path: &ElementPath) -> bool {
    metadata
        .get(path)
        .is_some_and(|m| !m.is_absolute() && !m.is_fragment() && m.global_frame.is_some())
}

pub fn flex_reorder_strategy<'a>(
    canvas_state: &InteractionCanvasState<'a>,
    session: &InteractionSession,
) -> Option<Box<dyn CanvasStrategy + 'a>> {
    let on_target = matches!(
        session.active_control,
        ActiveControl::BoundingArea { .. } | ActiveControl::FlexReorder { .. }
    );
    if !on_target || session.modifiers().cmd {
        return None;
    }
    let [target] = canvas_state.interaction_target else {
        return None;
    };
    let metadata = canvas_state.starting_metadata;
    let meta = metadata.get(target)?;
    if !meta.is_flex_child() || !is_in_flow(metadata, target) {
        return None;
    }
    let direction = meta.special_size_measurements.parent_flex_direction?;
    if !metadata.siblings(target).iter().any(|s| is_in_flow(metadata, s)) {
        return None;
    }
    Some(Box::new(FlexReorderStrategy {
        canvas_state: *canvas_state,
        target: target.clone(),
        direction,
    }))
}

/// `(leading, center, trailing)` of a frame along the flex axis, in the
/// order the container lays children out.
fn main_axis(frame: &Rect, direction: FlexDirection) -> (f64, f64, f64) {
    let (start, size) = if direction.is_horizontal() {
        (frame.x, frame.width)
    } else {
        (frame.y, frame.height)
    };
    if direction.is_reverse() {
        // later children sit closer to the origin
        (-(start + size), -(start + size / 2.0), -start)
    } else {
        (start, start + size / 2.0, start + size)
    }
}

/// The index `dragged` should take among `children`. A sibling after the
/// target is crossed once the dragged trailing edge passes its center; a
/// sibling before it once the leading edge does.
pub fn reorder_index(
    metadata: &ElementInstanceMetadataMap,
    children: &[ElementPath],
    target: &ElementPath,
    dragged: &Rect,
    direction: FlexDirection,
) -> Option<usize> {
    let start_idx = children.iter().position(|c| c == target)?;
    let (leading, _, trailing) = main_axis(dragged, direction);
    let mut forward: Option<usize> = None;
    let mut backward: Option<usize> = None;
    for (idx, sibling) in children.iter().enumerate() {
        if idx == start_idx || !is_in_flow(metadata, sibling) {
            continue;
        }
        let Some(frame) = metadata.global_frame(sibling) else {
            continue;
        };
        let (_, center, _) = main_axis(&frame, direction);
        if idx > start_idx && trailing > center {
            forward = Some(forward.map_or(idx, |f| f.max(idx)));
        } else if idx < start_idx && leading < center {
            backward = Some(backward.map_or(idx, |b| b.min(idx)));
        }
    }
    Some(forward.or(backward).unwrap_or(start_idx))
}

impl CanvasStrategy for FlexReorderStrategy<'_> {
    fn id(&self) -> CanvasStrategyId {
        CanvasStrategyId::FlexReorder
    }

    fn name(&self) -> &'static str {
        "Flex Reorder"
    }

    fn controls_to_render(&self) -> Vec<ControlWithProps> {
        vec![
            ControlWithProps::new(CanvasControl::SelectionOutline, ControlVisibility::Always),
            ControlWithProps::new(CanvasControl::FlexReorderIndicator, ControlVisibility::VisibleOnlyWhileActive),
        ]
    }

    fn fitness(&self, session: &InteractionSession) -> f64 {
        if session.drag_start().is_some() { 1.0 } else { 0.0 }
    }

    fn apply(
        &self,
        session: &InteractionSession,
        _strategy_state: &StrategyState,
    ) -> Result<StrategyApplicationResult, StrategyError> {
        let cursor = CanvasCommand::SetCursor {
            when_to_run: WhenToRun::MidInteraction,
            cursor: CursorStyle::Grabbing,
        };
        let Some(drag) = session.drag() else {
            return Ok(StrategyApplicationResult::new(vec![cursor]));
        };
        let metadata = self.canvas_state.starting_metadata;
        let frame = metadata
            .global_frame(&self.target)
            .ok_or_else(|| StrategyError::MissingFrame(self.target.clone()))?;
        let parent = self
            .target
            .parent()
            .ok_or_else(|| StrategyError::MissingParent(self.target.clone()))?;
        let children = metadata.children(&parent);
        let start_idx = children.iter().position(|c| c == &self.target);
        let new_idx = reorder_index(metadata, &children, &self.target, &frame.offset(drag), self.direction)
            .ok_or_else(|| StrategyError::MissingParent(self.target.clone()))?;

        let mut commands = Vec::new();
        if start_idx != Some(new_idx) {
            commands.push(CanvasCommand::ReorderElement {
                when_to_run: WhenToRun::Always,
                target: self.target.clone(),
                index: new_idx,
            });
        }
        commands.push(cursor);
        commands.push(CanvasCommand::SetElementsToRerender {
            when_to_run: WhenToRun::MidInteraction,
            scope: ElementsToRerender::All,
        });
        Ok(StrategyApplicationResult {
            commands,
            baseline_commands: Vec::new(),
            custom_state_patch: CustomStrategyStatePatch {
                last_reorder_idx: Some(new_idx),
                ..CustomStrategyStatePatch::default()
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canvas_core::document::Document;
    use canvas_core::layout::{Viewport, measure_document};
    use pretty_assertions::assert_eq;

    fn row(direction: &str) -> ElementInstanceMetadataMap {
        let json = format!(
            r#"{{ "uid": "sb", "children": [
                {{ "uid": "row", "props": {{ "style": {{ "display": "flex", "flexDirection": "{direction}", "width": 300, "height": 100 }} }}, "children": [
                    {{ "uid": "a", "props": {{ "style": {{ "width": 100, "height": 50 }} }} }},
                    {{ "uid": "b", "props": {{ "style": {{ "width": 100, "height": 50 }} }} }},
                    {{ "uid": "c", "props": {{ "style": {{ "width": 100, "height": 50 }} }} }}
                ] }}
            ] }}"#
        );
        measure_document(&Document::from_json(&json).unwrap(), Viewport::default())
    }

    fn p(s: &str) -> ElementPath {
        ElementPath::parse(s).unwrap()
    }

    #[test]
    fn trailing_edge_past_center_moves_forward() {
        let metadata = row("row");
        let children = metadata.children(&p("sb/row"));
        // b's center is at 150
        let idx = reorder_index(&metadata, &children, &p("sb/row/a"), &Rect::new(51.0, 0.0, 100.0, 50.0), FlexDirection::Row);
        assert_eq!(idx, Some(1));
        let idx = reorder_index(&metadata, &children, &p("sb/row/a"), &Rect::new(50.0, 0.0, 100.0, 50.0), FlexDirection::Row);
        assert_eq!(idx, Some(0));
        let idx = reorder_index(&metadata, &children, &p("sb/row/a"), &Rect::new(160.0, 0.0, 100.0, 50.0), FlexDirection::Row);
        assert_eq!(idx, Some(2));
    }

    #[test]
    fn leading_edge_past_center_moves_backward() {
        let metadata = row("row");
        let children = metadata.children(&p("sb/row"));
        let idx = reorder_index(&metadata, &children, &p("sb/row/c"), &Rect::new(149.0, 0.0, 100.0, 50.0), FlexDirection::Row);
        assert_eq!(idx, Some(1));
    }

    #[test]
    fn reverse_direction_flips_the_sense() {
        let metadata = row("row-reverse");
        let children = metadata.children(&p("sb/row"));
        // `a` is laid out rightmost at 200..300, `b` at 100..200
        let idx = reorder_index(
            &metadata,
            &children,
            &p("sb/row/a"),
            &Rect::new(99.0, 0.0, 100.0, 50.0),
            FlexDirection::RowReverse,
        );
        assert_eq!(idx, Some(1));
        let idx = reorder_index(
            &metadata,
            &children,
            &p("sb/row/a"),
            &Rect::new(150.0, 0.0, 100.0, 50.0),
            FlexDirection::RowReverse,
        );
        assert_eq!(idx, Some(0));
    }
}
