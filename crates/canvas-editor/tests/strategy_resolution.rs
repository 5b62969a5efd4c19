//! Integration tests: strategy fitness, stickiness, Tab cycling, flex
//! reorder and the escape hatch, against the flow scene fixture.

use canvas_core::document::PropertyPath;
use canvas_core::geom::Point;
use canvas_core::layout::Viewport;
use canvas_core::path::ElementPath;
use canvas_editor::engine::CanvasEngine;
use canvas_editor::input::{InputEvent, Modifiers};
use canvas_editor::session::{ActiveControl, InteractionSession, create_interaction_session};
use canvas_editor::strategies::{
    CanvasStrategy, CanvasStrategyId, REGISTERED_CANVAS_STRATEGIES, StrategyState, find_canvas_strategy,
    pick_canvas_state_from_editor_state,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::rc::Rc;

fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn path(s: &str) -> ElementPath {
    ElementPath::parse(s).unwrap()
}

fn engine() -> CanvasEngine {
    CanvasEngine::from_json(include_str!("fixtures/flow_scene.json"), Viewport::default()).unwrap()
}

/// A bounding-area session on `target`, dragged by `drag` when given.
fn session_on(engine: &CanvasEngine, target: &ElementPath, start: Point, drag: Option<Point>) -> InteractionSession {
    let session = create_interaction_session(
        start,
        Modifiers::NONE,
        ActiveControl::BoundingArea { target: target.clone() },
        Rc::clone(&engine.metadata),
        Rc::new(engine.document().all_element_props()),
    );
    match drag {
        Some(drag) => session.with_drag(drag),
        None => session,
    }
}

fn children_uids(engine: &CanvasEngine, parent: &str) -> Vec<String> {
    engine
        .document()
        .children_paths(&path(parent))
        .iter()
        .map(|p| p.to_string().rsplit('/').next().unwrap_or_default().to_string())
        .collect()
}

// ─── Fitness and stickiness ─────────────────────────────────────────────

#[test]
fn resolution_is_deterministic() {
    let mut engine = engine();
    let a = path("sb/row/a");
    engine.select(vec![a.clone()]);
    let session = session_on(&engine, &a, Point::new(50.0, 25.0), Some(Point::new(10.0, 0.0)));
    let canvas_state = pick_canvas_state_from_editor_state(&engine.editor, &session);
    let state = StrategyState::default();

    let first = find_canvas_strategy(REGISTERED_CANVAS_STRATEGIES, &canvas_state, &session, &state, None);
    let second = find_canvas_strategy(REGISTERED_CANVAS_STRATEGIES, &canvas_state, &session, &state, None);

    let ids: Vec<(CanvasStrategyId, f64)> = first
        .sorted_applicable_strategies()
        .iter()
        .map(|s| (s.id, s.fitness))
        .collect();
    assert_eq!(
        ids,
        vec![
            (CanvasStrategyId::FlexReorder, 1.0),
            (CanvasStrategyId::ConvertToAbsoluteAndMove, 0.5),
        ]
    );
    assert_eq!(first.sorted_applicable_strategies(), second.sorted_applicable_strategies());
    assert_eq!(first.winner_id(), Some(CanvasStrategyId::FlexReorder));
}

#[test]
fn previous_winner_sticks_during_a_live_drag() {
    let mut engine = engine();
    let a = path("sb/row/a");
    engine.select(vec![a.clone()]);
    let state = StrategyState::default();
    let previous = Some(CanvasStrategyId::ConvertToAbsoluteAndMove);

    let live = session_on(&engine, &a, Point::new(50.0, 25.0), Some(Point::new(10.0, 0.0)));
    let canvas_state = pick_canvas_state_from_editor_state(&engine.editor, &live);
    let resolution = find_canvas_strategy(REGISTERED_CANVAS_STRATEGIES, &canvas_state, &live, &state, previous);
    assert_eq!(resolution.winner_id(), previous);

    // a previous winner that no longer applies is dropped
    let resolution = find_canvas_strategy(
        REGISTERED_CANVAS_STRATEGIES,
        &canvas_state,
        &live,
        &state,
        Some(CanvasStrategyId::AbsoluteMove),
    );
    assert_eq!(resolution.winner_id(), Some(CanvasStrategyId::FlexReorder));

    // before the dead zone is left nothing sticks
    let idle = session_on(&engine, &a, Point::new(50.0, 25.0), None);
    let canvas_state = pick_canvas_state_from_editor_state(&engine.editor, &idle);
    let resolution = find_canvas_strategy(REGISTERED_CANVAS_STRATEGIES, &canvas_state, &idle, &state, previous);
    assert_eq!(resolution.winner_id(), Some(CanvasStrategyId::FlexReorder));
}

#[test]
fn tab_switches_to_the_next_applicable_strategy() {
    init_logs();
    let mut engine = engine();
    let a = path("sb/row/a");

    engine.handle(&InputEvent::pointer_down(50.0, 25.0, Modifiers::NONE));
    engine.handle(&InputEvent::pointer_move(60.0, 35.0, Modifiers::NONE));
    assert_eq!(engine.current_strategy(), Some(CanvasStrategyId::FlexReorder));

    engine.handle(&InputEvent::key_down("Tab", Modifiers::NONE));
    assert_eq!(engine.current_strategy(), Some(CanvasStrategyId::ConvertToAbsoluteAndMove));
    assert_eq!(
        engine.document().get_prop(&a, &PropertyPath::style("position")),
        Some(&json!("absolute"))
    );

    // the preference holds for the rest of the gesture
    engine.handle(&InputEvent::pointer_move(70.0, 35.0, Modifiers::NONE));
    assert_eq!(engine.current_strategy(), Some(CanvasStrategyId::ConvertToAbsoluteAndMove));

    engine.handle(&InputEvent::key_down("Tab", Modifiers::NONE));
    assert_eq!(engine.current_strategy(), Some(CanvasStrategyId::FlexReorder));
    assert_eq!(engine.document().get_prop(&a, &PropertyPath::style("position")), None);
}

// ─── Flex reorder ───────────────────────────────────────────────────────

#[test]
fn reorder_follows_the_drag_without_accumulating() {
    init_logs();
    let mut engine = engine();

    engine.handle(&InputEvent::pointer_down(50.0, 25.0, Modifiers::NONE));
    // trailing edge at 151 passes b's center at 150
    engine.handle(&InputEvent::pointer_move(101.0, 25.0, Modifiers::NONE));
    assert_eq!(children_uids(&engine, "sb/row"), vec!["b", "a", "c"]);
    assert_eq!(
        engine.strategy_state().map(|s| s.custom_strategy_state.last_reorder_idx),
        Some(Some(1))
    );

    // exactly on the center does not cross it
    engine.handle(&InputEvent::pointer_move(100.0, 25.0, Modifiers::NONE));
    assert_eq!(children_uids(&engine, "sb/row"), vec!["a", "b", "c"]);

    engine.handle(&InputEvent::pointer_move(101.0, 25.0, Modifiers::NONE));
    engine.handle(&InputEvent::pointer_up(101.0, 25.0, Modifiers::NONE));
    assert_eq!(children_uids(&engine, "sb/row"), vec!["b", "a", "c"]);
    assert_eq!(engine.selection(), &[path("sb/row/a")]);
    assert_eq!(engine.undo().as_deref(), Some("Flex Reorder"));
    assert_eq!(children_uids(&engine, "sb/row"), vec!["a", "b", "c"]);
}

// ─── Escape hatch ───────────────────────────────────────────────────────

#[test]
fn escape_hatch_converts_once() {
    let mut engine = engine();
    let target = path("sb/page/box");
    engine.select(vec![target.clone()]);
    let session = session_on(&engine, &target, Point::new(25.0, 125.0), Some(Point::new(20.0, 10.0)));
    let canvas_state = pick_canvas_state_from_editor_state(&engine.editor, &session);
    let mut state = StrategyState::default();

    let resolution = find_canvas_strategy(REGISTERED_CANVAS_STRATEGIES, &canvas_state, &session, &state, None);
    let (strategy, fitness) = resolution.winner().unwrap();
    assert_eq!(strategy.id(), CanvasStrategyId::ConvertToAbsoluteAndMove);
    assert_eq!(fitness, 1.0);

    let first = strategy.apply(&session, &state).unwrap();
    assert!(!first.baseline_commands.is_empty());
    assert_eq!(first.custom_state_patch.escape_hatch_activated, Some(true));

    state.custom_strategy_state.apply(first.custom_state_patch);
    let second = strategy.apply(&session, &state).unwrap();
    assert!(second.baseline_commands.is_empty());
    assert_eq!(second.commands, first.commands);
}

const SOLO_FLEX_SCENE: &str = r#"{ "uid": "sb", "children": [
    { "uid": "row", "props": { "style": { "display": "flex", "width": 300, "height": 100 } }, "children": [
        { "uid": "only", "props": { "style": { "width": 100, "height": 50, "flexShrink": 0 } } }
    ] }
] }"#;

#[test]
fn only_child_of_a_flex_container_takes_the_escape_hatch() {
    init_logs();
    let mut engine = CanvasEngine::from_json(SOLO_FLEX_SCENE, Viewport::default()).unwrap();
    let target = path("sb/row/only");
    engine.select(vec![target.clone()]);
    let session = session_on(&engine, &target, Point::new(25.0, 25.0), Some(Point::new(20.0, 10.0)));
    let canvas_state = pick_canvas_state_from_editor_state(&engine.editor, &session);
    let mut state = StrategyState::default();

    let resolution = find_canvas_strategy(REGISTERED_CANVAS_STRATEGIES, &canvas_state, &session, &state, None);
    let (strategy, fitness) = resolution.winner().unwrap();
    assert_eq!(strategy.id(), CanvasStrategyId::ConvertToAbsoluteAndMove);
    assert_eq!(fitness, 1.0);
    assert!(
        resolution
            .sorted_applicable_strategies()
            .iter()
            .all(|s| s.id != CanvasStrategyId::FlexReorder)
    );

    let first = strategy.apply(&session, &state).unwrap();
    assert!(!first.baseline_commands.is_empty());
    state.custom_strategy_state.apply(first.custom_state_patch);
    assert!(strategy.apply(&session, &state).unwrap().baseline_commands.is_empty());
    drop(resolution);

    engine.handle(&InputEvent::pointer_down(25.0, 25.0, Modifiers::NONE));
    engine.handle(&InputEvent::pointer_move(45.0, 35.0, Modifiers::NONE));
    engine.handle(&InputEvent::pointer_move(55.0, 45.0, Modifiers::NONE));
    engine.handle(&InputEvent::pointer_up(55.0, 45.0, Modifiers::NONE));

    let style = |key: &str| engine.document().get_prop(&target, &PropertyPath::style(key)).cloned();
    assert_eq!(style("position"), Some(json!("absolute")));
    assert_eq!(style("left"), Some(json!(30)));
    assert_eq!(style("top"), Some(json!(20)));
    assert_eq!(style("flexShrink"), None);
    assert!(engine.diagnostics.is_empty());
}

#[test]
fn escape_hatch_drag_commits_absolute_pins() {
    init_logs();
    let mut engine = engine();
    let target = path("sb/page/box");

    // box sits at (0, 100) inside the static page
    engine.handle(&InputEvent::pointer_down(25.0, 125.0, Modifiers::NONE));
    engine.handle(&InputEvent::pointer_move(45.0, 135.0, Modifiers::NONE));
    assert_eq!(engine.current_strategy(), Some(CanvasStrategyId::ConvertToAbsoluteAndMove));
    engine.handle(&InputEvent::pointer_move(55.0, 145.0, Modifiers::NONE));
    engine.handle(&InputEvent::pointer_up(55.0, 145.0, Modifiers::NONE));

    let style = |target: &ElementPath, key: &str| engine.document().get_prop(target, &PropertyPath::style(key)).cloned();
    assert_eq!(style(&target, "position"), Some(json!("absolute")));
    assert_eq!(style(&target, "left"), Some(json!(30)));
    assert_eq!(style(&target, "top"), Some(json!(20)));
    assert_eq!(style(&target, "width"), Some(json!(50)));
    assert_eq!(style(&path("sb/page"), "position"), Some(json!("relative")));
    assert!(engine.diagnostics.is_empty());
    assert_eq!(
        engine.metadata.global_frame(&target),
        Some(canvas_core::geom::Rect::new(30.0, 120.0, 50.0, 50.0))
    );
}
