//! Canvas strategies.
//!
//! A strategy is one way of turning an interaction into commands: move an
//! absolute element, reorder a flex child, resize a selection. Every tick the
//! resolver asks each registered strategy how well it fits the session and
//! applies only the winner.
//!
//! ```text
//! session ─► factories ─► fitness ─► stable sort ─► override / stickiness ─► winner.apply
//! ```

pub mod absolute_move;
pub mod absolute_resize;
pub mod escape_hatch;
pub mod flex_reorder;
pub mod group_pins;
pub mod keyboard_move;
pub mod move_helpers;
pub mod reparent;
pub mod resize_helpers;

use crate::commands::CanvasCommand;
use crate::config::CanvasConfig;
use crate::engine::EditorState;
use crate::session::InteractionSession;
use canvas_core::document::Document;
use canvas_core::metadata::{AllElementProps, ElementInstanceMetadataMap};
use canvas_core::path::ElementPath;
use log::debug;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CanvasStrategyId {
    FlexReorder,
    FlexReparentToAbsolute,
    AbsoluteReparent,
    AbsoluteResizeBoundingBox,
    KeyboardAbsoluteMove,
    ConvertToAbsoluteAndMove,
    AbsoluteMove,
}

impl CanvasStrategyId {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FlexReorder => "FLEX_REORDER",
            Self::FlexReparentToAbsolute => "FLEX_REPARENT_TO_ABSOLUTE",
            Self::AbsoluteReparent => "ABSOLUTE_REPARENT",
            Self::AbsoluteResizeBoundingBox => "ABSOLUTE_RESIZE_BOUNDING_BOX",
            Self::KeyboardAbsoluteMove => "KEYBOARD_ABSOLUTE_MOVE",
            Self::ConvertToAbsoluteAndMove => "CONVERT_TO_ABSOLUTE_AND_MOVE",
            Self::AbsoluteMove => "ABSOLUTE_MOVE",
        }
    }
}

// ─── Controls ───────────────────────────────────────────────────────────

/// When a strategy's control is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ControlVisibility {
    Always,
    VisibleOnlyWhileActive,
    VisibleExceptWhenOtherStrategyIsActive,
}

/// Overlay controls the renderer knows how to draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CanvasControl {
    SelectionOutline,
    ParentOutlines,
    SnappingGuidelines,
    ResizeHandles,
    FlexReorderIndicator,
    ReparentTargetOutline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ControlWithProps {
    pub control: CanvasControl,
    pub show: ControlVisibility,
}

impl ControlWithProps {
    pub const fn new(control: CanvasControl, show: ControlVisibility) -> Self {
        Self { control, show }
    }
}

// ─── Strategy state ─────────────────────────────────────────────────────

/// State individual strategies keep across ticks of one interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CustomStrategyState {
    /// The escape hatch has already converted its targets to absolute.
    pub escape_hatch_activated: bool,
    pub last_reorder_idx: Option<usize>,
}

/// Fields to overwrite in [`CustomStrategyState`]; `None` leaves a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CustomStrategyStatePatch {
    pub escape_hatch_activated: Option<bool>,
    pub last_reorder_idx: Option<usize>,
}

impl CustomStrategyState {
    pub fn apply(&mut self, patch: CustomStrategyStatePatch) {
        if let Some(activated) = patch.escape_hatch_activated {
            self.escape_hatch_activated = activated;
        }
        if let Some(idx) = patch.last_reorder_idx {
            self.last_reorder_idx = Some(idx);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApplicableStrategy {
    pub id: CanvasStrategyId,
    pub name: &'static str,
    pub fitness: f64,
}

/// Resolver bookkeeping for the running interaction.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StrategyState {
    /// The strategy locked in by the previous tick.
    pub current_strategy: Option<CanvasStrategyId>,
    pub current_strategy_fitness: f64,
    pub current_strategy_commands: Vec<CanvasCommand>,
    pub current_strategy_descriptions: Vec<String>,
    pub sorted_applicable_strategies: Vec<ApplicableStrategy>,
    pub custom_strategy_state: CustomStrategyState,
    /// Chosen with Tab; wins whenever it still applies.
    pub user_preferred_strategy: Option<CanvasStrategyId>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct StrategyApplicationResult {
    /// Re-applied from the interaction baseline every tick.
    pub commands: Vec<CanvasCommand>,
    /// Folded into the baseline once and kept for the rest of the
    /// interaction.
    pub baseline_commands: Vec<CanvasCommand>,
    pub custom_state_patch: CustomStrategyStatePatch,
}

impl StrategyApplicationResult {
    pub fn new(commands: Vec<CanvasCommand>) -> Self {
        Self {
            commands,
            ..Self::default()
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum StrategyError {
    #[error("{0} has no measured frame")]
    MissingFrame(ElementPath),
    #[error("{0} has no measured parent")]
    MissingParent(ElementPath),
    #[error("strategy expects a {expected} interaction")]
    UnexpectedInteraction { expected: &'static str },
}

// ─── Strategy trait ─────────────────────────────────────────────────────

/// One way of handling an interaction.
pub trait CanvasStrategy {
    fn id(&self) -> CanvasStrategyId;

    fn name(&self) -> &'static str;

    fn controls_to_render(&self) -> Vec<ControlWithProps>;

    /// `0` means "does not apply"; higher wins.
    fn fitness(&self, session: &InteractionSession) -> f64;

    fn apply(
        &self,
        session: &InteractionSession,
        strategy_state: &StrategyState,
    ) -> Result<StrategyApplicationResult, StrategyError>;
}

/// The slice of editor state strategies are allowed to see.
#[derive(Debug, Clone, Copy)]
pub struct InteractionCanvasState<'a> {
    /// Selected elements.
    pub interaction_target: &'a [ElementPath],
    pub starting_metadata: &'a ElementInstanceMetadataMap,
    pub starting_all_element_props: &'a AllElementProps,
    pub document: &'a Document,
    pub open_file: Option<&'a str>,
    pub scale: f64,
    pub config: &'a CanvasConfig,
}

pub fn pick_canvas_state_from_editor_state<'a>(
    editor: &'a EditorState,
    session: &'a InteractionSession,
) -> InteractionCanvasState<'a> {
    InteractionCanvasState {
        interaction_target: &editor.selected_views,
        starting_metadata: &session.starting_metadata,
        starting_all_element_props: &session.starting_all_element_props,
        document: &editor.document,
        open_file: editor.open_file.as_deref(),
        scale: editor.scale,
        config: &editor.config,
    }
}

/// Builds a strategy for the session, or `None` when it cannot apply at all.
pub type StrategyFactory =
    for<'a> fn(&InteractionCanvasState<'a>, &InteractionSession) -> Option<Box<dyn CanvasStrategy + 'a>>;

/// Every strategy, in tie-breaking order.
pub const REGISTERED_CANVAS_STRATEGIES: &[StrategyFactory] = &[
    flex_reorder::flex_reorder_strategy,
    reparent::flex_reparent_to_absolute_strategy,
    reparent::absolute_reparent_strategy,
    absolute_resize::absolute_resize_bounding_box_strategy,
    keyboard_move::keyboard_absolute_move_strategy,
    escape_hatch::convert_to_absolute_and_move_strategy,
    absolute_move::absolute_move_strategy,
];

// ─── Resolver ───────────────────────────────────────────────────────────

/// Applicable strategies for one tick, best first, and the one that won.
pub struct StrategyResolution<'a> {
    candidates: Vec<(Box<dyn CanvasStrategy + 'a>, f64)>,
    winner: Option<usize>,
}

impl<'a> StrategyResolution<'a> {
    pub fn winner(&self) -> Option<(&(dyn CanvasStrategy + 'a), f64)> {
        self.winner
            .and_then(|i| self.candidates.get(i))
            .map(|(strategy, fitness)| (strategy.as_ref(), *fitness))
    }

    pub fn winner_id(&self) -> Option<CanvasStrategyId> {
        self.winner().map(|(strategy, _)| strategy.id())
    }

    pub fn sorted_applicable_strategies(&self) -> Vec<ApplicableStrategy> {
        self.candidates
            .iter()
            .map(|(strategy, fitness)| ApplicableStrategy {
                id: strategy.id(),
                name: strategy.name(),
                fitness: *fitness,
            })
            .collect()
    }

    /// Controls of every applicable strategy, filtered by visibility
    /// against the winner.
    pub fn controls_to_render(&self) -> Vec<ControlWithProps> {
        let winner_id = self.winner_id();
        let mut out: Vec<ControlWithProps> = Vec::new();
        for (strategy, _) in &self.candidates {
            let is_active = winner_id == Some(strategy.id());
            for control in strategy.controls_to_render() {
                let visible = match control.show {
                    ControlVisibility::Always => true,
                    ControlVisibility::VisibleOnlyWhileActive => is_active,
                    ControlVisibility::VisibleExceptWhenOtherStrategyIsActive => {
                        is_active || winner_id.is_none()
                    }
                };
                if visible && !out.iter().any(|c| c.control == control.control) {
                    out.push(control);
                }
            }
        }
        out
    }
}

/// Pick the strategy for this tick.
///
/// Strategies with zero fitness are dropped and the rest sorted by fitness,
/// registry order breaking ties. A user-preferred strategy wins while it
/// applies; otherwise, during a live drag, the previous winner is kept while
/// it applies; otherwise the best fit wins.
pub fn find_canvas_strategy<'a>(
    strategies: &[StrategyFactory],
    canvas_state: &InteractionCanvasState<'a>,
    session: &InteractionSession,
    strategy_state: &StrategyState,
    previous: Option<CanvasStrategyId>,
) -> StrategyResolution<'a> {
    let mut candidates: Vec<(Box<dyn CanvasStrategy + 'a>, f64)> = strategies
        .iter()
        .filter_map(|factory| factory(canvas_state, session))
        .map(|strategy| {
            let fitness = strategy.fitness(session);
            (strategy, fitness)
        })
        .filter(|(_, fitness)| *fitness > 0.0)
        .collect();
    // sort_by is stable
    candidates.sort_by(|a, b| b.1.total_cmp(&a.1));

    let position = |id: CanvasStrategyId| candidates.iter().position(|(s, _)| s.id() == id);
    let winner = strategy_state
        .user_preferred_strategy
        .and_then(position)
        .or_else(|| previous.filter(|_| session.is_live_drag()).and_then(position))
        .or(if candidates.is_empty() { None } else { Some(0) });

    if let Some(i) = winner {
        debug!(
            "strategy {} wins with fitness {} ({} applicable)",
            candidates[i].0.name(),
            candidates[i].1,
            candidates.len()
        );
    }
    StrategyResolution { candidates, winner }
}
