//! Integration tests: dragging onto a sibling's edges produces guidelines
//! and a zero snapping vector when the alignment is already exact.

use canvas_core::document::PropertyPath;
use canvas_core::geom::Point;
use canvas_core::layout::Viewport;
use canvas_core::path::ElementPath;
use canvas_editor::engine::CanvasEngine;
use canvas_editor::input::{InputEvent, Modifiers};
use canvas_editor::snapping::{Guideline, GuidelineWithSnappingVector};
use pretty_assertions::assert_eq;
use serde_json::json;

fn engine() -> CanvasEngine {
    let _ = env_logger::builder().is_test(true).try_init();
    CanvasEngine::from_json(include_str!("fixtures/snapping_scene.json"), Viewport::default()).unwrap()
}

/// The same scene as measured at 25% zoom, where frames land on whole
/// canvas pixels.
fn quarter_zoom_engine() -> CanvasEngine {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut engine = CanvasEngine::from_json(
        include_str!("fixtures/snapping_scene_quarter_zoom.json"),
        Viewport::default(),
    )
    .unwrap();
    engine.set_scale(0.25);
    engine
}

fn assert_close(actual: Point, expected: Point) {
    assert!(
        (actual.x - expected.x).abs() < 1e-9 && (actual.y - expected.y).abs() < 1e-9,
        "{actual:?} != {expected:?}"
    );
}

fn first_div() -> ElementPath {
    ElementPath::parse("sb/div-parent/first-div").unwrap()
}

#[test]
fn exact_alignment_with_a_sibling_shows_both_guidelines() {
    let mut engine = engine();

    engine.handle(&InputEvent::pointer_down(60.0, 150.0, Modifiers::NONE));
    engine.handle(&InputEvent::pointer_move(70.0, 160.0, Modifiers::NONE));

    // first-div moves to (60.5, 156.5): its right edge meets second-div's
    // left edge and its bottom edge meets second-div's top edge
    assert_eq!(
        engine.overlay.guidelines,
        vec![
            GuidelineWithSnappingVector {
                guideline: Guideline::XAxis {
                    x: 110.5,
                    y_top: 156.5,
                    y_bottom: 215.5,
                },
                snapping_vector: Point::ZERO,
                points_of_relevance: vec![Point::new(110.5, 206.5), Point::new(110.5, 215.5)],
            },
            GuidelineWithSnappingVector {
                guideline: Guideline::YAxis {
                    y: 206.5,
                    x_left: 60.5,
                    x_right: 117.5,
                },
                snapping_vector: Point::ZERO,
                points_of_relevance: vec![Point::new(110.5, 206.5), Point::new(117.5, 206.5)],
            },
        ]
    );
    assert_eq!(
        engine.document().get_prop(&first_div(), &PropertyPath::style("left")),
        Some(&json!(60.5))
    );
}

#[test]
fn near_miss_snaps_onto_the_sibling() {
    let mut engine = engine();

    engine.handle(&InputEvent::pointer_down(60.0, 150.0, Modifiers::NONE));
    // 3px short of second-div on both axes
    engine.handle(&InputEvent::pointer_move(67.0, 157.0, Modifiers::NONE));

    let vectors: Vec<Point> = engine.overlay.guidelines.iter().map(|g| g.snapping_vector).collect();
    assert_eq!(vectors, vec![Point::new(3.0, 0.0), Point::new(0.0, 3.0)]);
    assert_eq!(
        engine.document().get_prop(&first_div(), &PropertyPath::style("left")),
        Some(&json!(60.5))
    );
    assert_eq!(
        engine.document().get_prop(&first_div(), &PropertyPath::style("top")),
        Some(&json!(156.5))
    );
}

#[test]
fn zooming_in_shrinks_the_snapping_threshold() {
    let mut engine = engine();
    engine.set_scale(4.0);

    engine.handle(&InputEvent::pointer_down(60.0, 150.0, Modifiers::NONE));
    // 3 canvas units is 12 screen pixels, past the 5px threshold
    engine.handle(&InputEvent::pointer_move(67.0, 157.0, Modifiers::NONE));

    assert!(engine.overlay.guidelines.is_empty());
    assert_eq!(
        engine.document().get_prop(&first_div(), &PropertyPath::style("left")),
        Some(&json!(57.5))
    );
}

#[test]
fn zoomed_in_exact_alignment_shows_the_same_guidelines() {
    let mut engine = engine();
    engine.set_scale(4.0);

    engine.handle(&InputEvent::pointer_down(60.0, 150.0, Modifiers::NONE));
    engine.handle(&InputEvent::pointer_move(70.0, 160.0, Modifiers::NONE));

    let guidelines: Vec<Guideline> = engine.overlay.guidelines.iter().map(|g| g.guideline).collect();
    assert_eq!(
        guidelines,
        vec![
            Guideline::XAxis {
                x: 110.5,
                y_top: 156.5,
                y_bottom: 215.5,
            },
            Guideline::YAxis {
                y: 206.5,
                x_left: 60.5,
                x_right: 117.5,
            },
        ]
    );
    assert!(engine.overlay.guidelines.iter().all(|g| g.snapping_vector == Point::ZERO));
}

#[test]
fn zoomed_out_alignment_uses_whole_pixel_frames() {
    let mut engine = quarter_zoom_engine();

    engine.handle(&InputEvent::pointer_down(60.0, 150.0, Modifiers::NONE));
    engine.handle(&InputEvent::pointer_move(70.0, 160.0, Modifiers::NONE));

    assert_eq!(
        engine.overlay.guidelines,
        vec![
            GuidelineWithSnappingVector {
                guideline: Guideline::XAxis {
                    x: 110.0,
                    y_top: 156.0,
                    y_bottom: 216.0,
                },
                snapping_vector: Point::ZERO,
                points_of_relevance: vec![Point::new(110.0, 206.0), Point::new(110.0, 216.0)],
            },
            GuidelineWithSnappingVector {
                guideline: Guideline::YAxis {
                    y: 206.0,
                    x_left: 60.0,
                    x_right: 118.0,
                },
                snapping_vector: Point::ZERO,
                points_of_relevance: vec![Point::new(110.0, 206.0), Point::new(118.0, 206.0)],
            },
        ]
    );
    assert_eq!(
        engine.document().get_prop(&first_div(), &PropertyPath::style("left")),
        Some(&json!(60))
    );
}

#[test]
fn fractional_drag_snaps_before_rounding() {
    let mut engine = engine();

    engine.handle(&InputEvent::pointer_down(60.0, 150.0, Modifiers::NONE));
    // rounding 9.6 first would land exactly and report a zero vector
    engine.handle(&InputEvent::pointer_move(69.6, 159.6, Modifiers::NONE));

    let vectors: Vec<Point> = engine.overlay.guidelines.iter().map(|g| g.snapping_vector).collect();
    assert_eq!(vectors.len(), 2);
    assert_close(vectors[0], Point::new(0.4, 0.0));
    assert_close(vectors[1], Point::new(0.0, 0.4));
    assert_eq!(
        engine.document().get_prop(&first_div(), &PropertyPath::style("left")),
        Some(&json!(60.5))
    );
    assert_eq!(
        engine.document().get_prop(&first_div(), &PropertyPath::style("top")),
        Some(&json!(156.5))
    );
}
