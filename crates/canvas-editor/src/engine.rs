//! Canvas engine: owns the document and drives interactions.
//!
//! Every input event that advances an interaction runs one tick:
//!
//! ```text
//! session ─► resolve strategy ─► apply winner ─► fold commands over baseline
//!         ─► live document + overlay ─► remeasure (overlay scope)
//! ```
//!
//! The live document is always recomputed from the interaction baseline, so
//! relative commands never accumulate across ticks. Commit folds the winner's
//! commands once more for the end of the interaction and records the result
//! in the undo history; cancel restores the document from before the
//! interaction.

use crate::apply::{CommandDiagnostic, CommandPhase, apply_commands};
use crate::config::CanvasConfig;
use crate::commands::CanvasCommand;
use crate::hit::{hit_test, hit_test_resize_handle};
use crate::history::History;
use crate::input::{InputEvent, Modifiers};
use crate::overlay::CanvasOverlay;
use crate::session::{ActiveControl, InteractionSession, create_interaction_session, create_keyboard_interaction};
use crate::shortcuts::{NudgeDirection, ShortcutAction, ShortcutMap};
use crate::strategies::{
    ApplicableStrategy, CanvasStrategy, CanvasStrategyId, ControlWithProps, CustomStrategyState, REGISTERED_CANVAS_STRATEGIES,
    StrategyApplicationResult, StrategyError, StrategyFactory, StrategyState, find_canvas_strategy,
    pick_canvas_state_from_editor_state,
};
use canvas_core::document::{Document, DocumentError};
use canvas_core::geom::Point;
use canvas_core::layout::{ElementsToRerender, LayoutMeasurer, MetadataProvider, Viewport};
use canvas_core::metadata::ElementInstanceMetadataMap;
use canvas_core::path::ElementPath;
use log::{debug, warn};
use std::rc::Rc;

/// Editor state the strategies are projected from.
#[derive(Debug, Clone)]
pub struct EditorState {
    pub document: Document,
    pub selected_views: Vec<ElementPath>,
    /// Canvas zoom; screen pixels per canvas unit.
    pub scale: f64,
    pub open_file: Option<String>,
    pub config: CanvasConfig,
}

/// The interaction in progress.
struct ActiveInteraction {
    session: InteractionSession,
    strategy_state: StrategyState,
    /// Document before the interaction started.
    original: Document,
    /// `original` plus the baseline commands folded in so far.
    baseline: Document,
}

/// What one tick resolved, before anything is written back.
struct TickOutput {
    winner: Option<(CanvasStrategyId, &'static str, f64)>,
    sorted_applicable_strategies: Vec<ApplicableStrategy>,
    controls: Vec<ControlWithProps>,
    /// The winner differs from the strategy locked in last tick.
    switched: bool,
    result: StrategyApplicationResult,
}

pub struct CanvasEngine {
    pub editor: EditorState,

    /// Metadata for the current (live) document.
    pub metadata: Rc<ElementInstanceMetadataMap>,

    pub overlay: CanvasOverlay,

    pub history: History,

    /// Failed commands of the last tick.
    pub diagnostics: Vec<CommandDiagnostic>,

    /// Controls the renderer should draw for the last tick.
    pub controls: Vec<ControlWithProps>,

    provider: Box<dyn MetadataProvider>,
    strategies: &'static [StrategyFactory],
    interaction: Option<ActiveInteraction>,
}

impl CanvasEngine {
    /// Engine measuring with the built-in layout measurer.
    pub fn new(document: Document, viewport: Viewport) -> Self {
        Self::with_provider(document, Box::new(LayoutMeasurer::new(viewport)))
    }

    pub fn from_json(json: &str, viewport: Viewport) -> Result<Self, DocumentError> {
        Ok(Self::new(Document::from_json(json)?, viewport))
    }

    pub fn with_provider(document: Document, provider: Box<dyn MetadataProvider>) -> Self {
        let config = CanvasConfig::default();
        let metadata = Rc::new(provider.measure(&document, &ElementsToRerender::All, None));
        Self {
            history: History::new(config.max_undo_depth),
            editor: EditorState {
                document,
                selected_views: Vec::new(),
                scale: 1.0,
                open_file: None,
                config,
            },
            metadata,
            overlay: CanvasOverlay::default(),
            diagnostics: Vec::new(),
            controls: Vec::new(),
            provider,
            strategies: REGISTERED_CANVAS_STRATEGIES,
            interaction: None,
        }
    }

    /// Replace the configuration. Resets the undo history to the new depth.
    pub fn with_config(mut self, config: CanvasConfig) -> Self {
        self.history = History::new(config.max_undo_depth);
        self.editor.config = config;
        self
    }

    pub fn with_strategies(mut self, strategies: &'static [StrategyFactory]) -> Self {
        self.strategies = strategies;
        self
    }

    // ─── Accessors ──────────────────────────────────────────────────────

    pub fn document(&self) -> &Document {
        &self.editor.document
    }

    pub fn selection(&self) -> &[ElementPath] {
        &self.editor.selected_views
    }

    pub fn is_interacting(&self) -> bool {
        self.interaction.is_some()
    }

    pub fn session(&self) -> Option<&InteractionSession> {
        self.interaction.as_ref().map(|i| &i.session)
    }

    pub fn strategy_state(&self) -> Option<&StrategyState> {
        self.interaction.as_ref().map(|i| &i.strategy_state)
    }

    pub fn current_strategy(&self) -> Option<CanvasStrategyId> {
        self.strategy_state().and_then(|s| s.current_strategy)
    }

    /// Commands the winning strategy produced on the last tick.
    pub fn current_commands(&self) -> &[CanvasCommand] {
        self.strategy_state()
            .map(|s| s.current_strategy_commands.as_slice())
            .unwrap_or_default()
    }

    pub fn select(&mut self, paths: Vec<ElementPath>) {
        self.editor.selected_views = paths;
    }

    pub fn set_scale(&mut self, scale: f64) {
        if scale > 0.0 {
            self.editor.scale = scale;
        }
    }

    // ─── Input ──────────────────────────────────────────────────────────

    /// Route one input event.
    pub fn handle(&mut self, event: &InputEvent) {
        match event {
            InputEvent::PointerDown { point, modifiers } => self.pointer_down(*point, *modifiers),
            InputEvent::PointerMove { point, modifiers } => self.update_drag(*point, *modifiers),
            InputEvent::PointerUp { .. } => self.pointer_up(),
            InputEvent::KeyDown { key, modifiers } => match ShortcutMap::resolve(key, *modifiers) {
                Some(ShortcutAction::Cancel) => self.cancel(),
                Some(ShortcutAction::CycleStrategy) => self.cycle_strategy(),
                Some(ShortcutAction::Nudge { direction, large }) => self.nudge(direction, large, *modifiers),
                Some(ShortcutAction::Undo) => {
                    self.undo();
                }
                Some(ShortcutAction::Redo) => {
                    self.redo();
                }
                None => self.update_modifiers(*modifiers),
            },
            InputEvent::KeyUp { key, modifiers } => {
                if ShortcutMap::is_arrow_key(key) && self.session().is_some_and(|s| s.is_keyboard()) {
                    self.commit();
                } else {
                    self.update_modifiers(*modifiers);
                }
            }
            InputEvent::Blur => self.cancel(),
        }
    }

    /// Pick the control under the pointer and start a drag on it. Clicking
    /// empty canvas clears the selection.
    fn pointer_down(&mut self, point: Point, modifiers: Modifiers) {
        if self.interaction.is_some() {
            return;
        }
        let selection_bounds = self.metadata.bounding_box(&self.editor.selected_views);
        if let Some(edge_position) =
            selection_bounds.and_then(|bounds| hit_test_resize_handle(&bounds, point, self.editor.scale))
        {
            self.start_interaction(point, modifiers, ActiveControl::ResizeHandle { edge_position });
            return;
        }
        let Some(hit) = hit_test(&self.metadata, point) else {
            self.editor.selected_views.clear();
            return;
        };
        let target = match self
            .editor
            .selected_views
            .iter()
            .find(|selected| hit.is_descendant_or_equal(selected))
        {
            Some(selected) => selected.clone(),
            None => {
                self.editor.selected_views = vec![hit.clone()];
                hit
            }
        };
        self.start_interaction(point, modifiers, ActiveControl::BoundingArea { target });
    }

    fn pointer_up(&mut self) {
        let Some(session) = self.session() else {
            return;
        };
        if session.is_keyboard() {
            return;
        }
        if session.is_live_drag() {
            self.commit();
        } else {
            self.cancel();
        }
    }

    /// Re-run the drag with new modifier keys.
    fn update_modifiers(&mut self, modifiers: Modifiers) {
        let Some(pointer) = self.session().filter(|s| !s.is_keyboard()).and_then(|s| s.pointer()) else {
            return;
        };
        self.update_drag(pointer, modifiers);
    }

    // ─── Interaction lifecycle ──────────────────────────────────────────

    /// Start a pointer interaction on `active_control`, snapshotting the
    /// current metadata and props.
    pub fn start_interaction(&mut self, point: Point, modifiers: Modifiers, active_control: ActiveControl) {
        self.cancel();
        debug!("interaction starts on {active_control:?} at {point:?}");
        let session = create_interaction_session(
            point,
            modifiers,
            active_control,
            Rc::clone(&self.metadata),
            Rc::new(self.editor.document.all_element_props()),
        );
        self.begin(session);
    }

    fn begin(&mut self, session: InteractionSession) {
        self.interaction = Some(ActiveInteraction {
            session,
            strategy_state: StrategyState::default(),
            original: self.editor.document.clone(),
            baseline: self.editor.document.clone(),
        });
        self.tick(CommandPhase::MidInteraction);
    }

    /// Advance the drag to `point`.
    pub fn update_drag(&mut self, point: Point, modifiers: Modifiers) {
        let threshold = self.editor.config.drag_threshold_px / self.editor.scale;
        match &mut self.interaction {
            Some(interaction) if interaction.session.drag_start().is_some() => {
                interaction.session = interaction.session.update_with_pointer_move(point, modifiers, threshold);
            }
            _ => return,
        }
        self.tick(CommandPhase::MidInteraction);
    }

    /// One arrow-key press. Starts a keyboard interaction when none runs.
    pub fn nudge(&mut self, direction: NudgeDirection, large: bool, modifiers: Modifiers) {
        let step = if large {
            self.editor.config.large_nudge_px
        } else {
            self.editor.config.nudge_px
        };
        let delta = Point::new(f64::from(direction.dx) * step, f64::from(direction.dy) * step);
        match &mut self.interaction {
            Some(interaction) if interaction.session.is_keyboard() => {
                interaction.session = interaction.session.add_keyboard_movement(delta, modifiers);
                self.tick(CommandPhase::MidInteraction);
            }
            Some(_) => {}
            None => {
                if self.editor.selected_views.is_empty() {
                    return;
                }
                let session = create_keyboard_interaction(
                    modifiers,
                    Rc::clone(&self.metadata),
                    Rc::new(self.editor.document.all_element_props()),
                )
                .add_keyboard_movement(delta, modifiers);
                self.begin(session);
            }
        }
    }

    /// Tab: prefer the next applicable strategy.
    pub fn cycle_strategy(&mut self) {
        let Some(interaction) = &mut self.interaction else {
            return;
        };
        let state = &mut interaction.strategy_state;
        let sorted = &state.sorted_applicable_strategies;
        if sorted.is_empty() {
            return;
        }
        let next = sorted
            .iter()
            .position(|s| Some(s.id) == state.current_strategy)
            .map_or(0, |i| (i + 1) % sorted.len());
        state.user_preferred_strategy = Some(sorted[next].id);
        debug!("user prefers {}", sorted[next].name);
        self.tick(CommandPhase::MidInteraction);
    }

    /// Finish the interaction: run its commands for the end of the
    /// interaction and record the result as one undo step.
    pub fn commit(&mut self) {
        if self.interaction.is_none() {
            return;
        }
        self.tick(CommandPhase::EndInteraction);
        let Some(interaction) = self.interaction.take() else {
            return;
        };
        let state = &interaction.strategy_state;
        let description = state
            .sorted_applicable_strategies
            .iter()
            .find(|s| Some(s.id) == state.current_strategy)
            .map_or("Interaction", |s| s.name);
        debug!("interaction committed: {description}");
        self.history
            .push(interaction.original, self.editor.document.clone(), description);
        self.finish();
    }

    /// Drop the interaction and restore the document from before it.
    pub fn cancel(&mut self) {
        let Some(interaction) = self.interaction.take() else {
            return;
        };
        debug!("interaction cancelled");
        self.editor.document = interaction.original;
        self.finish();
    }

    fn finish(&mut self) {
        self.overlay = CanvasOverlay::default();
        self.controls.clear();
        self.remeasure(&ElementsToRerender::All);
        self.fix_selection();
    }

    pub fn undo(&mut self) -> Option<String> {
        self.cancel();
        let description = self.history.undo(&mut self.editor.document)?;
        self.remeasure(&ElementsToRerender::All);
        self.fix_selection();
        Some(description)
    }

    pub fn redo(&mut self) -> Option<String> {
        self.cancel();
        let description = self.history.redo(&mut self.editor.document)?;
        self.remeasure(&ElementsToRerender::All);
        self.fix_selection();
        Some(description)
    }

    // ─── Tick ───────────────────────────────────────────────────────────

    fn tick(&mut self, phase: CommandPhase) {
        let Some(mut interaction) = self.interaction.take() else {
            return;
        };
        match resolve_tick(&self.editor, self.strategies, &interaction) {
            Ok(output) => self.write_back(&mut interaction, output, phase),
            // stale but consistent: keep the previous tick's state
            Err(error) => warn!("strategy failed, tick skipped: {error}"),
        }
        self.interaction = Some(interaction);
    }

    fn write_back(&mut self, interaction: &mut ActiveInteraction, output: TickOutput, phase: CommandPhase) {
        let state = &mut interaction.strategy_state;
        if output.switched {
            if let Some(previous) = state.current_strategy {
                debug!("strategy switched away from {}", previous.as_str());
            }
            interaction.baseline = interaction.original.clone();
            state.custom_strategy_state = CustomStrategyState::default();
        }

        let mut diagnostics = Vec::new();
        let result = output.result;
        if !result.baseline_commands.is_empty() {
            let folded = apply_commands(
                &interaction.baseline,
                &CanvasOverlay::default(),
                &result.baseline_commands,
                phase,
            );
            interaction.baseline = folded.document;
            diagnostics.extend(folded.diagnostics);
        }
        state.custom_strategy_state.apply(result.custom_state_patch);

        let applied = apply_commands(&interaction.baseline, &CanvasOverlay::default(), &result.commands, phase);
        diagnostics.extend(applied.diagnostics);

        state.current_strategy = output.winner.map(|(id, _, _)| id);
        state.current_strategy_fitness = output.winner.map_or(0.0, |(_, _, fitness)| fitness);
        state.current_strategy_commands = result.commands;
        state.current_strategy_descriptions = applied.descriptions;
        state.sorted_applicable_strategies = output.sorted_applicable_strategies;

        self.editor.document = applied.document;
        self.overlay = applied.overlay;
        self.controls = output.controls;
        self.diagnostics = diagnostics;

        let scope = self.overlay.elements_to_rerender.clone();
        self.remeasure(&scope);
        interaction.session.latest_metadata = Some(Rc::clone(&self.metadata));
    }

    fn remeasure(&mut self, scope: &ElementsToRerender) {
        let fresh = self.provider.measure(&self.editor.document, scope, Some(self.metadata.as_ref()));
        self.metadata = Rc::new(fresh);
    }

    /// Keep selected elements selected after a reparent changed their path,
    /// and drop the ones that no longer exist.
    fn fix_selection(&mut self) {
        let paths = self.editor.document.paths();
        self.editor.selected_views = self
            .editor
            .selected_views
            .iter()
            .filter_map(|selected| {
                if paths.contains(selected) {
                    return Some(selected.clone());
                }
                let uid = selected.last_uid()?;
                paths.iter().find(|p| p.last_uid() == Some(uid)).cloned()
            })
            .collect();
    }
}

/// Resolve the strategy for this tick and apply it. Nothing is written
/// back; an error leaves the interaction untouched.
fn resolve_tick(
    editor: &EditorState,
    strategies: &[StrategyFactory],
    interaction: &ActiveInteraction,
) -> Result<TickOutput, StrategyError> {
    let canvas_state = pick_canvas_state_from_editor_state(editor, &interaction.session);
    let previous = interaction.strategy_state.current_strategy;
    let resolution = find_canvas_strategy(
        strategies,
        &canvas_state,
        &interaction.session,
        &interaction.strategy_state,
        previous,
    );
    let winner_id = resolution.winner_id();
    let switched = winner_id != previous;

    let result = match resolution.winner() {
        Some((strategy, _)) if switched => {
            // a new strategy starts from a clean slate
            let mut fresh = interaction.strategy_state.clone();
            fresh.custom_strategy_state = CustomStrategyState::default();
            strategy.apply(&interaction.session, &fresh)?
        }
        Some((strategy, _)) => strategy.apply(&interaction.session, &interaction.strategy_state)?,
        None => StrategyApplicationResult::default(),
    };
    Ok(TickOutput {
        winner: resolution
            .winner()
            .map(|(strategy, fitness)| (strategy.id(), strategy.name(), fitness)),
        sorted_applicable_strategies: resolution.sorted_applicable_strategies(),
        controls: resolution.controls_to_render(),
        switched,
        result,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use canvas_core::document::PropertyPath;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const SCENE: &str = r#"{ "uid": "sb", "children": [
        { "uid": "box", "props": { "style": { "position": "absolute", "left": 10, "top": 10, "width": 100, "height": 100 } } }
    ] }"#;

    fn engine() -> CanvasEngine {
        CanvasEngine::from_json(SCENE, Viewport::default()).unwrap()
    }

    fn left(engine: &CanvasEngine) -> Option<serde_json::Value> {
        engine
            .document()
            .get_prop(&ElementPath::parse("sb/box").unwrap(), &PropertyPath::style("left"))
            .cloned()
    }

    #[test]
    fn empty_canvas_click_clears_selection() {
        let mut engine = engine();
        engine.handle(&InputEvent::pointer_down(50.0, 50.0, Modifiers::NONE));
        assert_eq!(engine.selection().len(), 1);
        engine.handle(&InputEvent::pointer_up(50.0, 50.0, Modifiers::NONE));
        engine.handle(&InputEvent::pointer_down(500.0, 500.0, Modifiers::NONE));
        assert!(engine.selection().is_empty());
        assert!(!engine.is_interacting());
    }

    #[test]
    fn blur_cancels_the_drag() {
        let mut engine = engine();
        engine.handle(&InputEvent::pointer_down(50.0, 50.0, Modifiers::NONE));
        engine.handle(&InputEvent::pointer_move(80.0, 90.0, Modifiers::NONE));
        assert_eq!(left(&engine), Some(json!(40)));
        engine.handle(&InputEvent::Blur);
        assert_eq!(left(&engine), Some(json!(10)));
        assert!(!engine.is_interacting());
    }

    #[test]
    fn shift_pressed_mid_drag_reruns_the_tick() {
        let mut engine = engine();
        engine.handle(&InputEvent::pointer_down(50.0, 50.0, Modifiers::NONE));
        engine.handle(&InputEvent::pointer_move(80.0, 60.0, Modifiers::NONE));
        engine.handle(&InputEvent::key_down("Shift", Modifiers::shift()));
        assert_eq!(left(&engine), Some(json!(40)));
        assert_eq!(
            engine.document().get_prop(&ElementPath::parse("sb/box").unwrap(), &PropertyPath::style("top")),
            Some(&json!(10))
        );
    }

    #[test]
    fn config_sets_history_depth() {
        let config = CanvasConfig {
            max_undo_depth: 1,
            ..CanvasConfig::default()
        };
        let mut engine = engine().with_config(config);
        for x in [80.0, 120.0] {
            engine.handle(&InputEvent::pointer_down(50.0, 50.0, Modifiers::NONE));
            engine.handle(&InputEvent::pointer_move(x, 50.0, Modifiers::NONE));
            engine.handle(&InputEvent::pointer_up(x, 50.0, Modifiers::NONE));
        }
        assert!(engine.undo().is_some());
        assert!(engine.undo().is_none());
    }

    #[test]
    fn cycling_without_an_interaction_is_a_no_op() {
        let mut engine = engine();
        engine.cycle_strategy();
        assert!(!engine.is_interacting());
        assert!(engine.current_commands().is_empty());
    }
}
