//! Converting in-flow elements to absolute so they can be dragged freely.
//!
//! On the first tick with a drag the targets get explicit `position:
//! absolute` pins matching their measured frames. Those commands are
//! returned as baseline commands, so the conversion is folded into the
//! interaction baseline once and `escape_hatch_activated` keeps later ticks
//! from issuing it again. Every tick then moves the converted targets.

use super::move_helpers::{retarget_measured, set_pin, snapped_drag};
use super::{
    CanvasControl, CanvasStrategy, CanvasStrategyId, ControlVisibility, ControlWithProps, CustomStrategyStatePatch,
    InteractionCanvasState, StrategyApplicationResult, StrategyError, StrategyState,
};
use crate::commands::{CanvasCommand, WhenToRun};
use crate::overlay::{CursorStyle, IntendedBounds};
use crate::session::{ActiveControl, InteractionSession};
use canvas_core::css::{CssPosition, PinProp};
use canvas_core::document::PropertyPath;
use canvas_core::layout::ElementsToRerender;
use canvas_core::metadata::ElementInstanceMetadataMap;
use canvas_core::path::ElementPath;
use serde_json::Value;

/// Style props that only mean something for in-flow elements.
pub const IN_FLOW_STYLE_PROPS: &[&str] = &[
    "flex",
    "flexGrow",
    "flexShrink",
    "flexBasis",
    "alignSelf",
    "margin",
    "marginTop",
    "marginRight",
    "marginBottom",
    "marginLeft",
];

pub struct ConvertToAbsoluteAndMoveStrategy<'a> {
    canvas_state: InteractionCanvasState<'a>,
    targets: Vec<ElementPath>,
    fitness: f64,
}

/// `1` for elements in flow layout or alone in a flex container, `0.5` for
/// flex children with in-flow siblings (reordering is the better fit there).
fn escape_hatch_fitness(metadata: &ElementInstanceMetadataMap, target: &ElementPath) -> f64 {
    let Some(meta) = metadata.get(target) else {
        return 0.0;
    };
    if meta.is_absolute() || target.is_storyboard() {
        return 0.0;
    }
    if !meta.is_flex_child() {
        return 1.0;
    }
    let has_in_flow_siblings = metadata
        .siblings(target)
        .iter()
        .any(|s| metadata.get(s).is_some_and(|m| !m.is_absolute() && !m.is_fragment()));
    if has_in_flow_siblings { 0.5 } else { 1.0 }
}

pub fn convert_to_absolute_and_move_strategy<'a>(
    canvas_state: &InteractionCanvasState<'a>,
    session: &InteractionSession,
) -> Option<Box<dyn CanvasStrategy + 'a>> {
    if !matches!(session.active_control, ActiveControl::BoundingArea { .. }) {
        return None;
    }
    let targets = retarget_measured(canvas_state);
    if targets.is_empty() {
        return None;
    }
    let fitness = targets
        .iter()
        .map(|t| escape_hatch_fitness(canvas_state.starting_metadata, t))
        .fold(f64::INFINITY, f64::min);
    if fitness <= 0.0 {
        return None;
    }
    Some(Box::new(ConvertToAbsoluteAndMoveStrategy {
        canvas_state: *canvas_state,
        targets,
        fitness,
    }))
}

impl ConvertToAbsoluteAndMoveStrategy<'_> {
    /// One-time conversion: absolute position, pins from the measured
    /// frame, in-flow props removed, static parents made relative.
    fn conversion_commands(&self) -> Vec<CanvasCommand> {
        let metadata = self.canvas_state.starting_metadata;
        let mut commands = Vec::new();
        let mut positioned_parents: Vec<ElementPath> = Vec::new();
        for target in &self.targets {
            let Some(meta) = metadata.get(target) else {
                continue;
            };
            let Some(local) = meta.local_frame else {
                continue;
            };
            let parent = meta.special_size_measurements.immediate_parent_bounds;
            commands.push(CanvasCommand::SetProperty {
                when_to_run: WhenToRun::Always,
                target: target.clone(),
                property: PropertyPath::style("position"),
                value: Value::from("absolute"),
            });
            for (pin, value) in [
                (PinProp::Left, local.x),
                (PinProp::Top, local.y),
                (PinProp::Width, local.width),
                (PinProp::Height, local.height),
            ] {
                let dimension = parent.map(|p| if pin.is_horizontal() { p.width } else { p.height });
                commands.push(set_pin(WhenToRun::Always, target, pin, value.round(), dimension));
            }
            commands.push(CanvasCommand::DeleteProperties {
                when_to_run: WhenToRun::Always,
                target: target.clone(),
                properties: IN_FLOW_STYLE_PROPS.iter().map(|p| PropertyPath::style(p)).collect(),
            });

            let Some(parent_path) = target.parent() else {
                continue;
            };
            let parent_is_static = metadata
                .get(&parent_path)
                .is_some_and(|m| m.special_size_measurements.position == CssPosition::Static);
            if parent_is_static && !parent_path.is_storyboard() && !positioned_parents.contains(&parent_path) {
                commands.push(CanvasCommand::SetProperty {
                    when_to_run: WhenToRun::Always,
                    target: parent_path.clone(),
                    property: PropertyPath::style("position"),
                    value: Value::from("relative"),
                });
                positioned_parents.push(parent_path);
            }
        }
        commands
    }
}

impl CanvasStrategy for ConvertToAbsoluteAndMoveStrategy<'_> {
    fn id(&self) -> CanvasStrategyId {
        CanvasStrategyId::ConvertToAbsoluteAndMove
    }

    fn name(&self) -> &'static str {
        "Move (Abs)"
    }

    fn controls_to_render(&self) -> Vec<ControlWithProps> {
        vec![
            ControlWithProps::new(CanvasControl::SelectionOutline, ControlVisibility::Always),
            ControlWithProps::new(CanvasControl::ParentOutlines, ControlVisibility::VisibleOnlyWhileActive),
            ControlWithProps::new(CanvasControl::SnappingGuidelines, ControlVisibility::VisibleOnlyWhileActive),
        ]
    }

    fn fitness(&self, session: &InteractionSession) -> f64 {
        if session.drag_start().is_some() { self.fitness } else { 0.0 }
    }

    fn apply(
        &self,
        session: &InteractionSession,
        strategy_state: &StrategyState,
    ) -> Result<StrategyApplicationResult, StrategyError> {
        let cursor = CanvasCommand::SetCursor {
            when_to_run: WhenToRun::MidInteraction,
            cursor: CursorStyle::Move,
        };
        let canvas_state = &self.canvas_state;
        let moved = session.drag().is_some_and(|d| !d.is_zero());
        let Some((drag, guidelines)) = snapped_drag(canvas_state, &self.targets, session).filter(|_| moved) else {
            return Ok(StrategyApplicationResult::new(vec![cursor]));
        };
        let metadata = canvas_state.starting_metadata;

        let mut commands = Vec::new();
        let mut intended = Vec::new();
        for target in &self.targets {
            let Some(meta) = metadata.get(target) else {
                continue;
            };
            let (Some(local), Some(global)) = (meta.local_frame, meta.global_frame) else {
                continue;
            };
            let parent = meta.special_size_measurements.immediate_parent_bounds;
            commands.push(set_pin(
                WhenToRun::Always,
                target,
                PinProp::Left,
                (local.x + drag.x).round(),
                parent.map(|p| p.width),
            ));
            commands.push(set_pin(
                WhenToRun::Always,
                target,
                PinProp::Top,
                (local.y + drag.y).round(),
                parent.map(|p| p.height),
            ));
            intended.push(IntendedBounds {
                target: target.clone(),
                frame: global.offset(drag),
            });
        }
        commands.extend([
            CanvasCommand::SetSnappingGuidelines {
                when_to_run: WhenToRun::MidInteraction,
                guidelines,
            },
            CanvasCommand::PushIntendedBounds {
                when_to_run: WhenToRun::MidInteraction,
                bounds: intended,
            },
            cursor,
            // siblings reflow once the targets leave the flow
            CanvasCommand::SetElementsToRerender {
                when_to_run: WhenToRun::MidInteraction,
                scope: ElementsToRerender::All,
            },
        ]);

        let mut result = StrategyApplicationResult::new(commands);
        if !strategy_state.custom_strategy_state.escape_hatch_activated {
            result.baseline_commands = self.conversion_commands();
            result.custom_state_patch = CustomStrategyStatePatch {
                escape_hatch_activated: Some(true),
                ..CustomStrategyStatePatch::default()
            };
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canvas_core::document::Document;
    use canvas_core::layout::{Viewport, measure_document};

    #[test]
    fn fitness_depends_on_in_flow_siblings() {
        let doc = Document::from_json(
            r#"{ "uid": "sb", "children": [
                { "uid": "row", "props": { "style": { "display": "flex", "width": 300, "height": 100 } }, "children": [
                    { "uid": "a", "props": { "style": { "width": 50, "height": 50 } } },
                    { "uid": "b", "props": { "style": { "width": 50, "height": 50 } } }
                ] },
                { "uid": "solo", "props": { "style": { "display": "flex", "width": 300, "height": 100 } }, "children": [
                    { "uid": "c", "props": { "style": { "width": 50, "height": 50 } } }
                ] },
                { "uid": "block", "props": { "style": { "width": 50, "height": 50 } } }
            ] }"#,
        )
        .unwrap();
        let metadata = measure_document(&doc, Viewport::default());
        let p = |s: &str| ElementPath::parse(s).unwrap();
        assert_eq!(escape_hatch_fitness(&metadata, &p("sb/row/a")), 0.5);
        assert_eq!(escape_hatch_fitness(&metadata, &p("sb/solo/c")), 1.0);
        assert_eq!(escape_hatch_fitness(&metadata, &p("sb/block")), 1.0);
    }
}
