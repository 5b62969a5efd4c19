//! Cmd-drag reparenting.
//!
//! While the drag is live the element moves where it is and the prospective
//! parent is highlighted; the structural move itself only runs on commit,
//! followed by pins that keep the element where it was dropped.

use super::escape_hatch::IN_FLOW_STYLE_PROPS;
use super::move_helpers::{all_absolute, move_commands, retarget_measured, set_pin, snapped_drag};
use super::{
    CanvasControl, CanvasStrategy, CanvasStrategyId, ControlVisibility, ControlWithProps, InteractionCanvasState,
    StrategyApplicationResult, StrategyError, StrategyState,
};
use crate::commands::{CanvasCommand, WhenToRun};
use crate::hit::elements_under_point;
use crate::overlay::CursorStyle;
use crate::session::{ActiveControl, InteractionSession};
use canvas_core::css::PinProp;
use canvas_core::document::PropertyPath;
use canvas_core::geom::{Point, Rect};
use canvas_core::layout::ElementsToRerender;
use canvas_core::path::ElementPath;
use serde_json::Value;

/// The element under `pointer` that would take `targets`: the topmost one
/// that is not a target, not inside one, and lays its children out freely.
pub fn find_reparent_target(
    canvas_state: &InteractionCanvasState<'_>,
    targets: &[ElementPath],
    pointer: Point,
) -> Option<ElementPath> {
    let metadata = canvas_state.starting_metadata;
    elements_under_point(metadata, pointer).into_iter().find(|candidate| {
        !targets.iter().any(|t| candidate.is_descendant_or_equal(t))
            && metadata
                .get(candidate)
                .is_some_and(|m| !m.is_flex_container() && !m.is_fragment())
    })
}

/// The new parent when it differs from the current parent of some target.
fn new_parent_for(
    canvas_state: &InteractionCanvasState<'_>,
    targets: &[ElementPath],
    session: &InteractionSession,
) -> Option<ElementPath> {
    let pointer = session.pointer()?;
    find_reparent_target(canvas_state, targets, pointer)
        .filter(|parent| targets.iter().any(|t| t.parent().as_ref() != Some(parent)))
}

fn highlight(paths: Vec<ElementPath>) -> CanvasCommand {
    CanvasCommand::UpdateHighlightedViews {
        when_to_run: WhenToRun::MidInteraction,
        paths,
    }
}

/// On-commit commands moving `target` under `new_parent` and pinning it at
/// `frame` (global) inside the new parent, with the path the element will
/// have there.
fn reparent_commands(
    canvas_state: &InteractionCanvasState<'_>,
    target: &ElementPath,
    new_parent: &ElementPath,
    frame: Rect,
) -> Option<(ElementPath, Vec<CanvasCommand>)> {
    let parent_frame = canvas_state.starting_metadata.global_frame(new_parent)?;
    let new_path = canvas_state.document.child_path(new_parent, target.last_uid()?)?;
    let local = frame.to_local(&parent_frame);
    let mut commands = vec![CanvasCommand::ReparentElement {
        when_to_run: WhenToRun::OnComplete,
        target: target.clone(),
        new_parent: new_parent.clone(),
        index: None,
    }];
    for (pin, value) in [
        (PinProp::Left, local.x),
        (PinProp::Top, local.y),
        (PinProp::Width, local.width),
        (PinProp::Height, local.height),
    ] {
        let dimension = if pin.is_horizontal() {
            parent_frame.width
        } else {
            parent_frame.height
        };
        commands.push(set_pin(WhenToRun::OnComplete, &new_path, pin, value.round(), Some(dimension)));
    }
    commands.push(CanvasCommand::DeleteProperties {
        when_to_run: WhenToRun::OnComplete,
        target: new_path.clone(),
        properties: vec![PropertyPath::style("right"), PropertyPath::style("bottom")],
    });
    Some((new_path, commands))
}

// ─── Absolute reparent ──────────────────────────────────────────────────

pub struct AbsoluteReparentStrategy<'a> {
    canvas_state: InteractionCanvasState<'a>,
    targets: Vec<ElementPath>,
}

pub fn absolute_reparent_strategy<'a>(
    canvas_state: &InteractionCanvasState<'a>,
    session: &InteractionSession,
) -> Option<Box<dyn CanvasStrategy + 'a>> {
    if !matches!(session.active_control, ActiveControl::BoundingArea { .. }) || !session.modifiers().cmd {
        return None;
    }
    let targets = retarget_measured(canvas_state);
    if !all_absolute(canvas_state, &targets) {
        return None;
    }
    Some(Box::new(AbsoluteReparentStrategy {
        canvas_state: *canvas_state,
        targets,
    }))
}

impl CanvasStrategy for AbsoluteReparentStrategy<'_> {
    fn id(&self) -> CanvasStrategyId {
        CanvasStrategyId::AbsoluteReparent
    }

    fn name(&self) -> &'static str {
        "Reparent (Abs)"
    }

    fn controls_to_render(&self) -> Vec<ControlWithProps> {
        vec![
            ControlWithProps::new(CanvasControl::SelectionOutline, ControlVisibility::Always),
            ControlWithProps::new(CanvasControl::ReparentTargetOutline, ControlVisibility::VisibleOnlyWhileActive),
        ]
    }

    /// Cmd outranks a plain move for the whole gesture, so the strategy
    /// is already locked in when the pointer reaches another container.
    fn fitness(&self, session: &InteractionSession) -> f64 {
        if session.drag_start().is_some() { 2.0 } else { 0.0 }
    }

    fn apply(
        &self,
        session: &InteractionSession,
        _strategy_state: &StrategyState,
    ) -> Result<StrategyApplicationResult, StrategyError> {
        let canvas_state = &self.canvas_state;
        let cursor = CanvasCommand::SetCursor {
            when_to_run: WhenToRun::MidInteraction,
            cursor: CursorStyle::Move,
        };
        let Some((drag, guidelines)) = snapped_drag(canvas_state, &self.targets, session) else {
            return Ok(StrategyApplicationResult::new(vec![cursor]));
        };
        let mut commands = move_commands(canvas_state, &self.targets, drag, guidelines);
        commands.push(cursor);

        let Some(new_parent) = new_parent_for(canvas_state, &self.targets, session) else {
            commands.push(highlight(Vec::new()));
            return Ok(StrategyApplicationResult::new(commands));
        };
        commands.push(highlight(vec![new_parent.clone()]));
        for target in &self.targets {
            if target.parent().as_ref() == Some(&new_parent) {
                continue;
            }
            let frame = canvas_state
                .starting_metadata
                .global_frame(target)
                .ok_or_else(|| StrategyError::MissingFrame(target.clone()))?;
            if let Some((_, reparent)) = reparent_commands(canvas_state, target, &new_parent, frame.offset(drag)) {
                commands.extend(reparent);
            }
        }
        Ok(StrategyApplicationResult::new(commands))
    }
}

// ─── Flex reparent to absolute ──────────────────────────────────────────

pub struct FlexReparentToAbsoluteStrategy<'a> {
    canvas_state: InteractionCanvasState<'a>,
    target: ElementPath,
    parent_frame: Rect,
}

pub fn flex_reparent_to_absolute_strategy<'a>(
    canvas_state: &InteractionCanvasState<'a>,
    session: &InteractionSession,
) -> Option<Box<dyn CanvasStrategy + 'a>> {
    if !matches!(session.active_control, ActiveControl::BoundingArea { .. }) || !session.modifiers().cmd {
        return None;
    }
    let [target] = canvas_state.interaction_target else {
        return None;
    };
    let meta = canvas_state.starting_metadata.get(target)?;
    if !meta.is_flex_child() || meta.is_absolute() || meta.global_frame.is_none() {
        return None;
    }
    let parent_frame = meta.special_size_measurements.immediate_parent_bounds?;
    Some(Box::new(FlexReparentToAbsoluteStrategy {
        canvas_state: *canvas_state,
        target: target.clone(),
        parent_frame,
    }))
}

impl FlexReparentToAbsoluteStrategy<'_> {
    fn outside_parent(&self, session: &InteractionSession) -> bool {
        session.pointer().is_some_and(|p| !self.parent_frame.contains(p))
    }
}

impl CanvasStrategy for FlexReparentToAbsoluteStrategy<'_> {
    fn id(&self) -> CanvasStrategyId {
        CanvasStrategyId::FlexReparentToAbsolute
    }

    fn name(&self) -> &'static str {
        "Reparent (Flex to Abs)"
    }

    fn controls_to_render(&self) -> Vec<ControlWithProps> {
        vec![
            ControlWithProps::new(CanvasControl::SelectionOutline, ControlVisibility::Always),
            ControlWithProps::new(CanvasControl::ParentOutlines, ControlVisibility::VisibleOnlyWhileActive),
            ControlWithProps::new(CanvasControl::ReparentTargetOutline, ControlVisibility::VisibleOnlyWhileActive),
        ]
    }

    fn fitness(&self, session: &InteractionSession) -> f64 {
        if session.drag_start().is_some() { 2.0 } else { 0.0 }
    }

    fn apply(
        &self,
        session: &InteractionSession,
        _strategy_state: &StrategyState,
    ) -> Result<StrategyApplicationResult, StrategyError> {
        let canvas_state = &self.canvas_state;
        let targets = std::slice::from_ref(&self.target);
        let cursor = CanvasCommand::SetCursor {
            when_to_run: WhenToRun::MidInteraction,
            cursor: CursorStyle::Move,
        };
        let Some(drag) = session.drag().map(|d| d.round()) else {
            return Ok(StrategyApplicationResult::new(vec![cursor]));
        };
        let frame = canvas_state
            .starting_metadata
            .global_frame(&self.target)
            .ok_or_else(|| StrategyError::MissingFrame(self.target.clone()))?;

        // preview: shift the element visually without taking it out of flow
        let mut commands = vec![CanvasCommand::SetProperty {
            when_to_run: WhenToRun::MidInteraction,
            target: self.target.clone(),
            property: PropertyPath::style("position"),
            value: Value::from("relative"),
        }];
        commands.push(set_pin(WhenToRun::MidInteraction, &self.target, PinProp::Left, drag.x, None));
        commands.push(set_pin(WhenToRun::MidInteraction, &self.target, PinProp::Top, drag.y, None));
        commands.push(cursor);
        commands.push(CanvasCommand::SetElementsToRerender {
            when_to_run: WhenToRun::MidInteraction,
            scope: ElementsToRerender::All,
        });

        // inside its own container the element only previews
        let new_parent = new_parent_for(canvas_state, targets, session).filter(|_| self.outside_parent(session));
        let Some(new_parent) = new_parent else {
            commands.push(highlight(Vec::new()));
            return Ok(StrategyApplicationResult::new(commands));
        };
        commands.push(highlight(vec![new_parent.clone()]));

        if let Some((new_path, reparent)) = reparent_commands(canvas_state, &self.target, &new_parent, frame.offset(drag)) {
            commands.extend(reparent);
            commands.push(CanvasCommand::SetProperty {
                when_to_run: WhenToRun::OnComplete,
                target: new_path.clone(),
                property: PropertyPath::style("position"),
                value: Value::from("absolute"),
            });
            commands.push(CanvasCommand::DeleteProperties {
                when_to_run: WhenToRun::OnComplete,
                target: new_path,
                properties: IN_FLOW_STYLE_PROPS.iter().map(|p| PropertyPath::style(p)).collect(),
            });
        }
        Ok(StrategyApplicationResult::new(commands))
    }
}
