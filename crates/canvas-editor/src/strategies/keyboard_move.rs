//! Nudging absolutely positioned elements with the arrow keys.

use super::move_helpers::{all_absolute, move_commands, retarget_measured};
use super::{
    CanvasControl, CanvasStrategy, CanvasStrategyId, ControlVisibility, ControlWithProps, InteractionCanvasState,
    StrategyApplicationResult, StrategyError, StrategyState,
};
use crate::session::InteractionSession;
use canvas_core::path::ElementPath;

pub struct KeyboardAbsoluteMoveStrategy<'a> {
    canvas_state: InteractionCanvasState<'a>,
    targets: Vec<ElementPath>,
}

pub fn keyboard_absolute_move_strategy<'a>(
    canvas_state: &InteractionCanvasState<'a>,
    session: &InteractionSession,
) -> Option<Box<dyn CanvasStrategy + 'a>> {
    if !session.is_keyboard() {
        return None;
    }
    let targets = retarget_measured(canvas_state);
    if !all_absolute(canvas_state, &targets) {
        return None;
    }
    Some(Box::new(KeyboardAbsoluteMoveStrategy {
        canvas_state: *canvas_state,
        targets,
    }))
}

impl CanvasStrategy for KeyboardAbsoluteMoveStrategy<'_> {
    fn id(&self) -> CanvasStrategyId {
        CanvasStrategyId::KeyboardAbsoluteMove
    }

    fn name(&self) -> &'static str {
        "Move (Keyboard)"
    }

    fn controls_to_render(&self) -> Vec<ControlWithProps> {
        vec![
            ControlWithProps::new(CanvasControl::SelectionOutline, ControlVisibility::Always),
            ControlWithProps::new(CanvasControl::ParentOutlines, ControlVisibility::VisibleOnlyWhileActive),
        ]
    }

    fn fitness(&self, session: &InteractionSession) -> f64 {
        if session.is_keyboard() { 1.0 } else { 0.0 }
    }

    fn apply(
        &self,
        session: &InteractionSession,
        _strategy_state: &StrategyState,
    ) -> Result<StrategyApplicationResult, StrategyError> {
        let movement = session
            .keyboard_movement()
            .ok_or(StrategyError::UnexpectedInteraction { expected: "keyboard" })?;
        Ok(StrategyApplicationResult::new(move_commands(
            &self.canvas_state,
            &self.targets,
            movement,
            Vec::new(),
        )))
    }
}
