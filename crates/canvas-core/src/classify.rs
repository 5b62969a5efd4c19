//! Group-like classification.
//!
//! Whether an element behaves like a group is never stored: it depends on
//! the element's current children and props, so it is recomputed on every
//! query from the metadata snapshot at hand.

use crate::document::style_prop;
use crate::metadata::{AllElementProps, ElementInstanceMetadataMap};
use crate::path::ElementPath;
use serde::Serialize;

/// Component name that always sizes itself to its children.
pub const GROUP_COMPONENT_NAME: &str = "Group";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GroupLikeKind {
    /// A fragment: no box, its frame is the union of its children.
    Fragment,
    /// A wrapper whose size comes from its absolutely positioned children.
    SimpleGroup,
    Ordinary,
}

impl GroupLikeKind {
    pub fn is_group_like(&self) -> bool {
        !matches!(self, GroupLikeKind::Ordinary)
    }
}

/// Classify `path` from the given snapshot.
pub fn classify(
    metadata: &ElementInstanceMetadataMap,
    props: &AllElementProps,
    path: &ElementPath,
) -> GroupLikeKind {
    let Some(element) = metadata.get(path) else {
        return GroupLikeKind::Ordinary;
    };
    if element.is_fragment() {
        return GroupLikeKind::Fragment;
    }
    if element.is_flex_container() || path.is_storyboard() {
        return GroupLikeKind::Ordinary;
    }
    let children = flattened_children(metadata, path);
    if children.is_empty() {
        return GroupLikeKind::Ordinary;
    }
    // a single in-flow child turns the wrapper back into a normal box
    if children
        .iter()
        .any(|c| metadata.get(c).is_some_and(|m| !m.is_absolute()))
    {
        return GroupLikeKind::Ordinary;
    }
    if element.name == GROUP_COMPONENT_NAME {
        return GroupLikeKind::SimpleGroup;
    }
    let own_props = props.get(path);
    let has_size = own_props.is_some_and(|p| {
        style_prop(p, "width").is_some_and(|v| !v.is_null())
            || style_prop(p, "height").is_some_and(|v| !v.is_null())
    });
    if has_size {
        GroupLikeKind::Ordinary
    } else {
        GroupLikeKind::SimpleGroup
    }
}

pub fn is_group_like(
    metadata: &ElementInstanceMetadataMap,
    props: &AllElementProps,
    path: &ElementPath,
) -> bool {
    classify(metadata, props, path).is_group_like()
}

/// Direct children, with fragments replaced by their own children.
pub fn flattened_children(metadata: &ElementInstanceMetadataMap, path: &ElementPath) -> Vec<ElementPath> {
    metadata
        .children(path)
        .into_iter()
        .flat_map(|child| match metadata.get(&child) {
            Some(m) if m.is_fragment() => flattened_children(metadata, &child),
            _ => vec![child],
        })
        .collect()
}

/// Replace every group-like path by its children, recursively. A group-like
/// element without children stays in the list.
pub fn replace_group_like_paths_with_children(
    metadata: &ElementInstanceMetadataMap,
    props: &AllElementProps,
    paths: &[ElementPath],
) -> Vec<ElementPath> {
    paths
        .iter()
        .flat_map(|path| {
            if !is_group_like(metadata, props, path) {
                return vec![path.clone()];
            }
            let children = metadata.children(path);
            if children.is_empty() {
                vec![path.clone()]
            } else {
                replace_group_like_paths_with_children(metadata, props, &children)
            }
        })
        .collect()
}
