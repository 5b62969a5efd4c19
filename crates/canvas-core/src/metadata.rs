//! Measured state of rendered element instances.
//!
//! An [`ElementInstanceMetadataMap`] is rebuilt by every measurement pass and
//! is read-only afterwards: an interaction keeps the map it started with as
//! its "starting metadata" and never mutates it.

use crate::css::{CssPosition, FlexDirection, LayoutSystem};
use crate::document::ElementKind;
use crate::geom::Rect;
use crate::path::ElementPath;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Per-element prop bags keyed by path.
pub type AllElementProps = HashMap<ElementPath, Map<String, Value>>;

/// Layout facts about an element and the context it sits in.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct SpecialSizeMeasurements {
    /// Frame of the box this element is laid out in, canvas space.
    pub immediate_parent_bounds: Option<Rect>,
    pub parent_layout_system: LayoutSystem,
    pub parent_flex_direction: Option<FlexDirection>,
    pub position: CssPosition,
    pub layout_system_for_children: LayoutSystem,
    pub flex_direction: Option<FlexDirection>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ElementInstanceMetadata {
    pub path: ElementPath,
    pub name: String,
    pub kind: ElementKind,
    /// `None` when the element did not render (e.g. `display: none`).
    pub global_frame: Option<Rect>,
    /// Frame relative to `immediate_parent_bounds`.
    pub local_frame: Option<Rect>,
    pub special_size_measurements: SpecialSizeMeasurements,
    pub computed_style: Map<String, Value>,
}

impl ElementInstanceMetadata {
    pub fn is_fragment(&self) -> bool {
        self.kind == ElementKind::Fragment
    }

    pub fn is_absolute(&self) -> bool {
        self.special_size_measurements.position.is_out_of_flow()
    }

    pub fn is_flex_child(&self) -> bool {
        self.special_size_measurements.parent_layout_system == LayoutSystem::Flex
    }

    pub fn is_flex_container(&self) -> bool {
        self.special_size_measurements.layout_system_for_children == LayoutSystem::Flex
    }
}

/// Path-keyed metadata, iterated in document order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ElementInstanceMetadataMap {
    entries: HashMap<ElementPath, ElementInstanceMetadata>,
    order: Vec<ElementPath>,
}

impl ElementInstanceMetadataMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert in document order; re-inserting keeps the original position.
    pub fn insert(&mut self, metadata: ElementInstanceMetadata) {
        let path = metadata.path.clone();
        if self.entries.insert(path.clone(), metadata).is_none() {
            self.order.push(path);
        }
    }

    pub fn get(&self, path: &ElementPath) -> Option<&ElementInstanceMetadata> {
        self.entries.get(path)
    }

    pub fn contains(&self, path: &ElementPath) -> bool {
        self.entries.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Paths in document (pre-)order, i.e. back to front.
    pub fn paths(&self) -> &[ElementPath] {
        &self.order
    }

    pub fn iter(&self) -> impl Iterator<Item = &ElementInstanceMetadata> {
        self.order.iter().filter_map(|p| self.entries.get(p))
    }

    pub fn global_frame(&self, path: &ElementPath) -> Option<Rect> {
        self.get(path).and_then(|m| m.global_frame)
    }

    pub fn local_frame(&self, path: &ElementPath) -> Option<Rect> {
        self.get(path).and_then(|m| m.local_frame)
    }

    /// Direct children in document order.
    pub fn children(&self, path: &ElementPath) -> Vec<ElementPath> {
        self.order
            .iter()
            .filter(|p| p.is_child_of(path))
            .cloned()
            .collect()
    }

    /// Other children of the same parent.
    pub fn siblings(&self, path: &ElementPath) -> Vec<ElementPath> {
        match path.parent() {
            Some(parent) => self
                .children(&parent)
                .into_iter()
                .filter(|p| p != path)
                .collect(),
            None => Vec::new(),
        }
    }

    /// Parent entry, if it was measured.
    pub fn parent(&self, path: &ElementPath) -> Option<&ElementInstanceMetadata> {
        path.parent().and_then(|parent| self.get(&parent))
    }

    /// Union of the global frames of `paths`, skipping unmeasured ones.
    pub fn bounding_box(&self, paths: &[ElementPath]) -> Option<Rect> {
        let frames: Vec<Rect> = paths.iter().filter_map(|p| self.global_frame(p)).collect();
        crate::geom::bounding_rect(&frames)
    }

    /// Replace entries with those from `fresh` for paths matching `keep`,
    /// drop stale entries matching `keep` that `fresh` no longer has.
    pub fn merge_where(&mut self, fresh: &ElementInstanceMetadataMap, keep: impl Fn(&ElementPath) -> bool) {
        self.order.retain(|p| !keep(p) || fresh.contains(p));
        self.entries.retain(|p, _| !keep(p) || fresh.contains(p));
        for m in fresh.iter().filter(|m| keep(&m.path)) {
            self.insert(m.clone());
        }
    }
}
