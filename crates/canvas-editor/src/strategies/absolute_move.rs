//! Moving absolutely positioned elements by dragging them.

use super::move_helpers::{all_absolute, move_commands, retarget_measured, snapped_drag};
use super::{
    CanvasControl, CanvasStrategy, CanvasStrategyId, ControlVisibility, ControlWithProps, InteractionCanvasState,
    StrategyApplicationResult, StrategyError, StrategyState,
};
use crate::commands::{CanvasCommand, WhenToRun};
use crate::overlay::CursorStyle;
use crate::session::{ActiveControl, InteractionSession};
use canvas_core::path::ElementPath;

pub struct AbsoluteMoveStrategy<'a> {
    canvas_state: InteractionCanvasState<'a>,
    targets: Vec<ElementPath>,
}

pub fn absolute_move_strategy<'a>(
    canvas_state: &InteractionCanvasState<'a>,
    session: &InteractionSession,
) -> Option<Box<dyn CanvasStrategy + 'a>> {
    if !matches!(session.active_control, ActiveControl::BoundingArea { .. }) {
        return None;
    }
    let targets = retarget_measured(canvas_state);
    if !all_absolute(canvas_state, &targets) {
        return None;
    }
    Some(Box::new(AbsoluteMoveStrategy {
        canvas_state: *canvas_state,
        targets,
    }))
}

/// Commands for dragging absolute `targets` by the session's drag.
pub fn drag_commands(
    canvas_state: &InteractionCanvasState<'_>,
    targets: &[ElementPath],
    session: &InteractionSession,
) -> Vec<CanvasCommand> {
    let cursor = CanvasCommand::SetCursor {
        when_to_run: WhenToRun::MidInteraction,
        cursor: CursorStyle::Move,
    };
    let Some((drag, guidelines)) = snapped_drag(canvas_state, targets, session) else {
        return vec![cursor];
    };
    let mut commands = move_commands(canvas_state, targets, drag, guidelines);
    commands.push(cursor);
    commands
}

impl CanvasStrategy for AbsoluteMoveStrategy<'_> {
    fn id(&self) -> CanvasStrategyId {
        CanvasStrategyId::AbsoluteMove
    }

    fn name(&self) -> &'static str {
        "Move"
    }

    fn controls_to_render(&self) -> Vec<ControlWithProps> {
        vec![
            ControlWithProps::new(CanvasControl::SelectionOutline, ControlVisibility::Always),
            ControlWithProps::new(CanvasControl::ParentOutlines, ControlVisibility::VisibleOnlyWhileActive),
            ControlWithProps::new(CanvasControl::SnappingGuidelines, ControlVisibility::VisibleOnlyWhileActive),
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
        Ok(StrategyApplicationResult::new(drag_commands(
            &self.canvas_state,
            &self.targets,
            session,
        )))
    }
}
