//! Hit testing: point → element lookup.
//!
//! Reverse-walks the metadata (document pre-order, i.e. paint order) so the
//! first match is the topmost element at a canvas position.

use crate::session::EdgePosition;
use canvas_core::geom::{Point, Rect};
use canvas_core::metadata::ElementInstanceMetadataMap;
use canvas_core::path::ElementPath;

/// Side length of a resize handle in screen pixels.
pub const RESIZE_HANDLE_SIZE: f64 = 8.0;

/// Find the topmost element at `point`. Returns `None` for the empty canvas.
pub fn hit_test(metadata: &ElementInstanceMetadataMap, point: Point) -> Option<ElementPath> {
    elements_under_point(metadata, point).into_iter().next()
}

/// Every element at `point`, topmost first. Fragments have no box of their
/// own and the storyboard is the canvas itself, so neither is ever hit.
pub fn elements_under_point(metadata: &ElementInstanceMetadataMap, point: Point) -> Vec<ElementPath> {
    metadata
        .paths()
        .iter()
        .rev()
        .filter_map(|path| metadata.get(path))
        .filter(|m| !m.is_fragment() && !m.path.is_storyboard())
        .filter(|m| m.global_frame.is_some_and(|f| f.contains(point)))
        .map(|m| m.path.clone())
        .collect()
}

/// The resize handle of `bounds` under `point`, if any. Handles keep their
/// on-screen size at every zoom level.
pub fn hit_test_resize_handle(bounds: &Rect, point: Point, scale: f64) -> Option<EdgePosition> {
    let half = RESIZE_HANDLE_SIZE / scale / 2.0;
    EdgePosition::HANDLES.into_iter().find(|edge| {
        let cx = bounds.x + bounds.width * edge.x;
        let cy = bounds.y + bounds.height * edge.y;
        (point.x - cx).abs() <= half && (point.y - cy).abs() <= half
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use canvas_core::document::Document;
    use canvas_core::layout::{Viewport, measure_document};

    const SCENE: &str = r#"{ "uid": "sb", "children": [
        { "uid": "back", "props": { "style": { "position": "absolute", "left": 0, "top": 0, "width": 100, "height": 100 } }, "children": [
            { "uid": "inner", "props": { "style": { "position": "absolute", "left": 10, "top": 10, "width": 20, "height": 20 } } }
        ] },
        { "uid": "front", "props": { "style": { "position": "absolute", "left": 50, "top": 50, "width": 100, "height": 100 } } }
    ] }"#;

    fn metadata() -> ElementInstanceMetadataMap {
        measure_document(&Document::from_json(SCENE).unwrap(), Viewport::default())
    }

    fn p(s: &str) -> ElementPath {
        ElementPath::parse(s).unwrap()
    }

    #[test]
    fn topmost_wins() {
        let metadata = metadata();
        assert_eq!(hit_test(&metadata, Point::new(75.0, 75.0)), Some(p("sb/front")));
        assert_eq!(hit_test(&metadata, Point::new(15.0, 15.0)), Some(p("sb/back/inner")));
        assert_eq!(
            elements_under_point(&metadata, Point::new(15.0, 15.0)),
            vec![p("sb/back/inner"), p("sb/back")]
        );
    }

    #[test]
    fn background_is_none() {
        assert_eq!(hit_test(&metadata(), Point::new(500.0, 500.0)), None);
    }

    #[test]
    fn resize_handles_scale_with_zoom() {
        let bounds = Rect::new(0.0, 0.0, 100.0, 100.0);
        assert_eq!(
            hit_test_resize_handle(&bounds, Point::new(101.0, 99.0), 1.0),
            Some(EdgePosition::BOTTOM_RIGHT)
        );
        assert_eq!(
            hit_test_resize_handle(&bounds, Point::new(50.0, 3.0), 1.0),
            Some(EdgePosition::TOP)
        );
        assert_eq!(hit_test_resize_handle(&bounds, Point::new(50.0, 50.0), 1.0), None);
        assert_eq!(hit_test_resize_handle(&bounds, Point::new(106.0, 100.0), 1.0), None);
        assert_eq!(
            hit_test_resize_handle(&bounds, Point::new(106.0, 100.0), 0.5),
            Some(EdgePosition::BOTTOM_RIGHT)
        );
    }
}
