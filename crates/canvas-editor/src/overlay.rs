//! Transient canvas state drawn on top of the document.
//!
//! The overlay is rebuilt from scratch on every tick by folding the tick's
//! commands, so nothing here outlives the interaction that produced it.

use crate::snapping::GuidelineWithSnappingVector;
use canvas_core::geom::Rect;
use canvas_core::layout::ElementsToRerender;
use canvas_core::path::ElementPath;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CursorStyle {
    Default,
    Move,
    Grabbing,
    NsResize,
    EwResize,
    NwseResize,
    NeswResize,
}

/// Where a strategy expects an element to end up.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntendedBounds {
    pub target: ElementPath,
    pub frame: Rect,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct CanvasOverlay {
    pub cursor: Option<CursorStyle>,
    pub guidelines: Vec<GuidelineWithSnappingVector>,
    pub highlighted_views: Vec<ElementPath>,
    pub intended_bounds: Vec<IntendedBounds>,
    pub elements_to_rerender: ElementsToRerender,
}

/// One change to the overlay.
#[derive(Debug, Clone, PartialEq)]
pub enum OverlayPatch {
    SetCursor(Option<CursorStyle>),
    SetGuidelines(Vec<GuidelineWithSnappingVector>),
    SetHighlightedViews(Vec<ElementPath>),
    SetIntendedBounds(Vec<IntendedBounds>),
    SetElementsToRerender(ElementsToRerender),
}

impl CanvasOverlay {
    pub fn apply(&mut self, patch: OverlayPatch) {
        match patch {
            OverlayPatch::SetCursor(cursor) => self.cursor = cursor,
            OverlayPatch::SetGuidelines(guidelines) => self.guidelines = guidelines,
            OverlayPatch::SetHighlightedViews(paths) => self.highlighted_views = paths,
            OverlayPatch::SetIntendedBounds(bounds) => self.intended_bounds = bounds,
            OverlayPatch::SetElementsToRerender(scope) => self.elements_to_rerender = scope,
        }
    }
}
