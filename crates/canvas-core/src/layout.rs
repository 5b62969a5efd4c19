//! Layout measurement: turns a [`Document`] into element metadata.
//!
//! A deliberately small box model standing in for DOM measurement:
//! - absolutely positioned children are placed by their pins against the
//!   padding box of their immediate (non-fragment) parent;
//! - block flow stacks in-flow children vertically, filling the parent width;
//! - `display: flex` lays children along `flexDirection` (with the `-reverse`
//!   variants), honoring `gap`, `padding`, margins and `flexBasis`;
//! - elements without a width or height shrink to their content, so a plain
//!   wrapper around absolute children sizes to the box enclosing them;
//! - fragments have no box; their children are laid out by the fragment's
//!   parent and the fragment's frame is the union of its children;
//! - `display: none` elements (and their subtrees) get no frame.
//!
//! Sizing runs bottom-up (children first, so content can size the parent),
//! placement runs once the parent size is known, and global frames are
//! accumulated top-down at the end.

use crate::css::{CssNumber, CssPosition, FlexDirection, LayoutSystem};
use crate::document::{Document, ElementKind, style_prop};
use crate::geom::{Point, Rect, bounding_rect};
use crate::metadata::{ElementInstanceMetadata, ElementInstanceMetadataMap, SpecialSizeMeasurements};
use crate::path::ElementPath;
use petgraph::graph::NodeIndex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};

/// The canvas (viewport) dimensions the storyboard fills.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
        }
    }
}

/// Which elements a measurement pass must refresh.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub enum ElementsToRerender {
    #[default]
    All,
    Paths(Vec<ElementPath>),
}

impl ElementsToRerender {
    /// A path is in scope when it is a listed path, inside one, or an
    /// ancestor of one (ancestors may be sized by their content).
    pub fn includes(&self, path: &ElementPath) -> bool {
        match self {
            ElementsToRerender::All => true,
            ElementsToRerender::Paths(paths) => paths
                .iter()
                .any(|p| path.is_descendant_or_equal(p) || p.is_descendant_of(path)),
        }
    }
}

/// Produces metadata for a document. The scope is passed explicitly on
/// every call; entries outside it may be carried over from `previous`.
pub trait MetadataProvider {
    fn measure(
        &self,
        document: &Document,
        scope: &ElementsToRerender,
        previous: Option<&ElementInstanceMetadataMap>,
    ) -> ElementInstanceMetadataMap;
}

/// The in-crate [`MetadataProvider`].
#[derive(Debug, Clone, Copy, Default)]
pub struct LayoutMeasurer {
    pub viewport: Viewport,
}

impl LayoutMeasurer {
    pub fn new(viewport: Viewport) -> Self {
        Self { viewport }
    }
}

impl MetadataProvider for LayoutMeasurer {
    fn measure(
        &self,
        document: &Document,
        scope: &ElementsToRerender,
        previous: Option<&ElementInstanceMetadataMap>,
    ) -> ElementInstanceMetadataMap {
        let fresh = measure_document(document, self.viewport);
        match (scope, previous) {
            (ElementsToRerender::Paths(_), Some(previous)) => {
                let mut merged = previous.clone();
                merged.merge_where(&fresh, |p| scope.includes(p));
                merged
            }
            _ => fresh,
        }
    }
}

/// Measure every element of the document.
pub fn measure_document(document: &Document, viewport: Viewport) -> ElementInstanceMetadataMap {
    let mut pass = Pass {
        doc: document,
        viewport,
        sizes: HashMap::new(),
        offsets: HashMap::new(),
        containers: HashMap::new(),
        hidden: HashSet::new(),
    };
    pass.layout_node(document.root, (viewport.width, viewport.height), None);
    pass.into_metadata()
}

// ─── Style access ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default)]
struct Edges {
    top: f64,
    right: f64,
    bottom: f64,
    left: f64,
}

impl Edges {
    fn horizontal(&self) -> f64 {
        self.left + self.right
    }

    fn vertical(&self) -> f64 {
        self.top + self.bottom
    }
}

fn length(props: &Map<String, Value>, key: &str, base: Option<f64>) -> Option<f64> {
    style_prop(props, key)
        .and_then(CssNumber::from_json)
        .and_then(|n| n.to_px(base))
}

fn keyword<'a>(props: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    style_prop(props, key).and_then(Value::as_str)
}

/// `padding` / `margin` shorthand (single length) overridden by the sides.
fn edges(props: &Map<String, Value>, prefix: &str) -> Edges {
    let all = length(props, prefix, None).unwrap_or(0.0);
    let side = |name: &str| length(props, &format!("{prefix}{name}"), None).unwrap_or(all);
    Edges {
        top: side("Top"),
        right: side("Right"),
        bottom: side("Bottom"),
        left: side("Left"),
    }
}

fn position_of(props: &Map<String, Value>) -> CssPosition {
    keyword(props, "position")
        .and_then(CssPosition::parse)
        .unwrap_or_default()
}

fn flex_direction_of(props: &Map<String, Value>) -> Option<FlexDirection> {
    match keyword(props, "display") {
        Some("flex") | Some("inline-flex") => Some(
            keyword(props, "flexDirection")
                .and_then(FlexDirection::parse)
                .unwrap_or_default(),
        ),
        _ => None,
    }
}

fn is_display_none(props: &Map<String, Value>) -> bool {
    keyword(props, "display") == Some("none")
}

// ─── Layout pass ────────────────────────────────────────────────────────

struct Pass<'a> {
    doc: &'a Document,
    viewport: Viewport,
    sizes: HashMap<NodeIndex, (f64, f64)>,
    /// Offset from the layout container's origin.
    offsets: HashMap<NodeIndex, Point>,
    /// Nearest non-fragment ancestor.
    containers: HashMap<NodeIndex, NodeIndex>,
    hidden: HashSet<NodeIndex>,
}

struct Placed {
    idx: NodeIndex,
    size: (f64, f64),
    margin: Edges,
}

impl Pass<'_> {
    fn props(&self, idx: NodeIndex) -> &Map<String, Value> {
        &self.doc.graph[idx].props
    }

    /// Children taking part in this element's layout, looking through fragments.
    fn layout_children(&mut self, idx: NodeIndex, container: NodeIndex, out: &mut Vec<NodeIndex>) {
        for child in self.doc.children_of(idx) {
            self.containers.insert(child, container);
            if self.doc.graph[child].kind == ElementKind::Fragment {
                self.layout_children(child, container, out);
            } else {
                out.push(child);
            }
        }
    }

    fn hide_subtree(&mut self, idx: NodeIndex) {
        self.hidden.insert(idx);
        for child in self.doc.children_of(idx) {
            self.hide_subtree(child);
        }
    }

    /// Size `idx` against its containing block `base`, laying out its children.
    fn layout_node(
        &mut self,
        idx: NodeIndex,
        base: (f64, f64),
        parent_flex: Option<FlexDirection>,
    ) -> (f64, f64) {
        let props = self.props(idx).clone();
        if is_display_none(&props) {
            self.hide_subtree(idx);
            self.sizes.insert(idx, (0.0, 0.0));
            return (0.0, 0.0);
        }

        let position = position_of(&props);
        let padding = edges(&props, "padding");
        let margin = edges(&props, "margin");

        let (mut known_w, mut known_h) = if idx == self.doc.root {
            (Some(self.viewport.width), Some(self.viewport.height))
        } else {
            (length(&props, "width", Some(base.0)), length(&props, "height", Some(base.1)))
        };
        if let Some(direction) = parent_flex
            && let Some(basis) = length(&props, "flexBasis", Some(if direction.is_horizontal() { base.0 } else { base.1 }))
        {
            if direction.is_horizontal() {
                known_w = Some(basis);
            } else {
                known_h = Some(basis);
            }
        }
        if position.is_out_of_flow() {
            if known_w.is_none()
                && let (Some(l), Some(r)) = (length(&props, "left", Some(base.0)), length(&props, "right", Some(base.0)))
            {
                known_w = Some(base.0 - l - r);
            }
            if known_h.is_none()
                && let (Some(t), Some(b)) = (length(&props, "top", Some(base.1)), length(&props, "bottom", Some(base.1)))
            {
                known_h = Some(base.1 - t - b);
            }
        } else if known_w.is_none() && parent_flex.is_none() {
            // blocks fill the available width
            known_w = Some(base.0 - margin.horizontal());
        }

        let flex = flex_direction_of(&props);
        let padding_box = (known_w.unwrap_or(base.0), known_h.unwrap_or(base.1));
        let content_base = (
            padding_box.0 - padding.horizontal(),
            padding_box.1 - padding.vertical(),
        );

        let mut kids = Vec::new();
        self.layout_children(idx, idx, &mut kids);

        let mut in_flow: Vec<Placed> = Vec::new();
        let mut absolute: Vec<Placed> = Vec::new();
        for kid in kids {
            let kid_props = self.props(kid);
            let kid_margin = edges(kid_props, "margin");
            if position_of(kid_props).is_out_of_flow() {
                let size = self.layout_node(kid, padding_box, None);
                if self.hidden.contains(&kid) {
                    continue;
                }
                absolute.push(Placed {
                    idx: kid,
                    size,
                    margin: kid_margin,
                });
            } else {
                let size = self.layout_node(kid, content_base, flex);
                if self.hidden.contains(&kid) {
                    continue;
                }
                in_flow.push(Placed {
                    idx: kid,
                    size,
                    margin: kid_margin,
                });
            }
        }

        let gap = length(&props, "gap", None).unwrap_or(0.0);
        let (content_w, content_h) = content_extent(&in_flow, flex, gap);
        let (abs_w, abs_h) = self.absolute_extent(&absolute, padding.left, padding.top);
        let width = known_w.unwrap_or_else(|| (content_w + padding.horizontal()).max(abs_w));
        let height = known_h.unwrap_or_else(|| (content_h + padding.vertical()).max(abs_h));

        match flex {
            Some(direction) => self.place_flex(&in_flow, direction, (width, height), padding, gap),
            None => self.place_flow(&in_flow, padding),
        }
        self.place_absolute(&absolute, (width, height), padding);

        self.sizes.insert(idx, (width, height));
        (width, height)
    }

    fn absolute_extent(&self, kids: &[Placed], pad_left: f64, pad_top: f64) -> (f64, f64) {
        kids.iter().fold((0.0_f64, 0.0_f64), |(w, h), kid| {
            let props = self.props(kid.idx);
            let x_extent = length(props, "left", None)
                .or_else(|| length(props, "right", None))
                .unwrap_or(pad_left)
                + kid.size.0;
            let y_extent = length(props, "top", None)
                .or_else(|| length(props, "bottom", None))
                .unwrap_or(pad_top)
                + kid.size.1;
            (w.max(x_extent), h.max(y_extent))
        })
    }

    fn place_flow(&mut self, kids: &[Placed], padding: Edges) {
        let mut cursor = padding.top;
        for kid in kids {
            let offset = Point::new(padding.left + kid.margin.left, cursor + kid.margin.top);
            cursor += kid.margin.vertical() + kid.size.1;
            self.set_offset(kid.idx, offset);
        }
    }

    fn place_flex(
        &mut self,
        kids: &[Placed],
        direction: FlexDirection,
        size: (f64, f64),
        padding: Edges,
        gap: f64,
    ) {
        let horizontal = direction.is_horizontal();
        let (main_start, main_end, main_size) = if horizontal {
            (padding.left, padding.right, size.0)
        } else {
            (padding.top, padding.bottom, size.1)
        };
        let mut cursor = if direction.is_reverse() {
            main_size - main_end
        } else {
            main_start
        };
        for kid in kids {
            let (lead, trail, extent) = if horizontal {
                (kid.margin.left, kid.margin.right, kid.size.0)
            } else {
                (kid.margin.top, kid.margin.bottom, kid.size.1)
            };
            let main = if direction.is_reverse() {
                let at = cursor - trail - extent;
                cursor = at - lead - gap;
                at
            } else {
                let at = cursor + lead;
                cursor = at + extent + trail + gap;
                at
            };
            let offset = if horizontal {
                Point::new(main, padding.top + kid.margin.top)
            } else {
                Point::new(padding.left + kid.margin.left, main)
            };
            self.set_offset(kid.idx, offset);
        }
    }

    fn place_absolute(&mut self, kids: &[Placed], size: (f64, f64), padding: Edges) {
        for kid in kids {
            let props = self.props(kid.idx);
            let x = match (length(props, "left", Some(size.0)), length(props, "right", Some(size.0))) {
                (Some(left), _) => left,
                (None, Some(right)) => size.0 - right - kid.size.0,
                (None, None) => padding.left,
            };
            let y = match (length(props, "top", Some(size.1)), length(props, "bottom", Some(size.1))) {
                (Some(top), _) => top,
                (None, Some(bottom)) => size.1 - bottom - kid.size.1,
                (None, None) => padding.top,
            };
            self.offsets.insert(kid.idx, Point::new(x, y));
        }
    }

    /// In-flow offset, shifted for `position: relative`.
    fn set_offset(&mut self, idx: NodeIndex, offset: Point) {
        let props = self.props(idx);
        let shift = if matches!(position_of(props), CssPosition::Relative | CssPosition::Sticky) {
            let dx = length(props, "left", None)
                .or_else(|| length(props, "right", None).map(|r| -r))
                .unwrap_or(0.0);
            let dy = length(props, "top", None)
                .or_else(|| length(props, "bottom", None).map(|b| -b))
                .unwrap_or(0.0);
            Point::new(dx, dy)
        } else {
            Point::ZERO
        };
        self.offsets.insert(idx, offset + shift);
    }

    fn into_metadata(self) -> ElementInstanceMetadataMap {
        let paths = self.doc.paths();
        let mut frames: HashMap<NodeIndex, Rect> = HashMap::new();

        // pre-order: containers are resolved before their children
        for path in &paths {
            let Some(idx) = self.doc.index_of(path) else {
                continue;
            };
            if self.hidden.contains(&idx) || self.doc.graph[idx].kind == ElementKind::Fragment {
                continue;
            }
            let (w, h) = self.sizes.get(&idx).copied().unwrap_or((0.0, 0.0));
            let origin = match self.containers.get(&idx) {
                Some(container) => match frames.get(container) {
                    Some(parent) => parent.origin() + self.offsets.get(&idx).copied().unwrap_or(Point::ZERO),
                    None => continue,
                },
                None => Point::ZERO,
            };
            frames.insert(idx, Rect::new(origin.x, origin.y, w, h));
        }

        // reverse pre-order visits children before parents
        for path in paths.iter().rev() {
            let Some(idx) = self.doc.index_of(path) else {
                continue;
            };
            if self.doc.graph[idx].kind != ElementKind::Fragment || self.hidden.contains(&idx) {
                continue;
            }
            let child_frames: Vec<Rect> = self
                .doc
                .children_of(idx)
                .iter()
                .filter_map(|c| frames.get(c).copied())
                .collect();
            if let Some(union) = bounding_rect(&child_frames) {
                frames.insert(idx, union);
            }
        }

        let mut map = ElementInstanceMetadataMap::new();
        for path in paths {
            let Some(idx) = self.doc.index_of(&path) else {
                continue;
            };
            let el = &self.doc.graph[idx];
            let container = self.containers.get(&idx).copied();
            let parent_bounds = container.and_then(|c| frames.get(&c).copied());
            let parent_flex = container.and_then(|c| flex_direction_of(self.props(c)));
            let own_flex = flex_direction_of(&el.props);
            let global_frame = frames.get(&idx).copied();
            let local_frame = match (global_frame, parent_bounds) {
                (Some(frame), Some(parent)) => Some(frame.to_local(&parent)),
                (Some(frame), None) => Some(frame),
                _ => None,
            };
            let position = position_of(&el.props);

            let mut computed_style = el
                .props
                .get("style")
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default();
            computed_style
                .entry("position")
                .or_insert_with(|| Value::from(format!("{position:?}").to_lowercase()));
            computed_style
                .entry("display")
                .or_insert_with(|| Value::from("block"));

            map.insert(ElementInstanceMetadata {
                path,
                name: el.name.clone(),
                kind: el.kind,
                global_frame,
                local_frame,
                special_size_measurements: SpecialSizeMeasurements {
                    immediate_parent_bounds: parent_bounds,
                    parent_layout_system: if parent_flex.is_some() {
                        LayoutSystem::Flex
                    } else {
                        LayoutSystem::Flow
                    },
                    parent_flex_direction: parent_flex,
                    position,
                    layout_system_for_children: if own_flex.is_some() {
                        LayoutSystem::Flex
                    } else {
                        LayoutSystem::Flow
                    },
                    flex_direction: own_flex,
                },
                computed_style,
            });
        }
        log::trace!("measured {} elements", map.len());
        map
    }
}

fn content_extent(kids: &[Placed], flex: Option<FlexDirection>, gap: f64) -> (f64, f64) {
    let along = |kid: &Placed| (kid.size.0 + kid.margin.horizontal(), kid.size.1 + kid.margin.vertical());
    let gaps = gap * kids.len().saturating_sub(1) as f64;
    match flex {
        Some(direction) if direction.is_horizontal() => (
            kids.iter().map(|k| along(k).0).sum::<f64>() + gaps,
            kids.iter().map(|k| along(k).1).fold(0.0, f64::max),
        ),
        Some(_) => (
            kids.iter().map(|k| along(k).0).fold(0.0, f64::max),
            kids.iter().map(|k| along(k).1).sum::<f64>() + gaps,
        ),
        None => (
            kids.iter().map(|k| along(k).0).fold(0.0, f64::max),
            kids.iter().map(|k| along(k).1).sum::<f64>(),
        ),
    }
}
