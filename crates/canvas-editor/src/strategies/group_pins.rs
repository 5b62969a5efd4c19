//! Group bounding-box propagation.
//!
//! A group-like element is sized by its children, so moving or resizing a
//! child changes the group's frame, which changes the frame every other
//! child is pinned against. Propagation works on an arena of the affected
//! groups (edges go from a group to the groups nested in it):
//!
//! 1. bottom-up, each group's new frame is the union of its flattened
//!    children's new frames (nested groups use their freshly computed frame,
//!    untouched children their starting frame);
//! 2. top-down, each group is re-pinned against its parent's new frame and
//!    each of its children against the group's new frame, so untouched
//!    children keep their visual position.
//!
//! Only pins whose value changes are written.

use crate::commands::{CanvasCommand, WhenToRun};
use canvas_core::classify::{GroupLikeKind, classify, flattened_children, GROUP_COMPONENT_NAME};
use canvas_core::css::{CssNumber, PinProp};
use canvas_core::document::{PropertyPath, style_prop};
use canvas_core::geom::{Rect, bounding_rect, round_to};
use canvas_core::metadata::{AllElementProps, ElementInstanceMetadataMap};
use canvas_core::path::ElementPath;
use log::trace;
use petgraph::algo::toposort;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Closest ancestor that is not a fragment; the element is laid out and
/// pinned against it.
pub fn layout_parent(metadata: &ElementInstanceMetadataMap, path: &ElementPath) -> Option<ElementPath> {
    let mut parent = path.parent()?;
    while metadata.get(&parent).is_some_and(|m| m.is_fragment()) {
        parent = parent.parent()?;
    }
    Some(parent)
}

/// The simple group `path` is pinned inside, if any.
pub fn owning_group(
    metadata: &ElementInstanceMetadataMap,
    props: &AllElementProps,
    path: &ElementPath,
) -> Option<ElementPath> {
    layout_parent(metadata, path).filter(|parent| classify(metadata, props, parent) == GroupLikeKind::SimpleGroup)
}

pub fn has_pin(props: Option<&Map<String, Value>>, pin: PinProp) -> bool {
    props.is_some_and(|p| style_prop(p, pin.as_str()).is_some_and(|v| !v.is_null()))
}

#[derive(Debug, Clone)]
struct GroupNode {
    path: ElementPath,
    start_frame: Rect,
    new_frame: Rect,
}

/// Commands re-pinning the groups around `moved` (targets with their new
/// global frames) and every child of those groups. Targets without an owning
/// group are ignored.
pub fn propagate_group_bounds(
    metadata: &ElementInstanceMetadataMap,
    props: &AllElementProps,
    moved: &[(ElementPath, Rect)],
) -> Vec<CanvasCommand> {
    let moved_frames: HashMap<&ElementPath, Rect> = moved.iter().map(|(p, r)| (p, *r)).collect();
    let mut arena: StableDiGraph<GroupNode, ()> = StableDiGraph::new();
    let mut index: HashMap<ElementPath, NodeIndex> = HashMap::new();

    for (target, _) in moved {
        let mut child = target.clone();
        let mut child_node: Option<NodeIndex> = None;
        while let Some(group) = owning_group(metadata, props, &child) {
            let Some(start_frame) = metadata.global_frame(&group) else {
                break;
            };
            let (node, existed) = match index.get(&group) {
                Some(&node) => (node, true),
                None => {
                    let node = arena.add_node(GroupNode {
                        path: group.clone(),
                        start_frame,
                        new_frame: start_frame,
                    });
                    index.insert(group.clone(), node);
                    (node, false)
                }
            };
            if let Some(child_node) = child_node {
                arena.update_edge(node, child_node, ());
            }
            if existed {
                break;
            }
            child_node = Some(node);
            child = group;
        }
    }
    if arena.node_count() == 0 {
        return Vec::new();
    }
    let Ok(order) = toposort(&arena, None) else {
        return Vec::new();
    };

    let new_frame_of = |arena: &StableDiGraph<GroupNode, ()>, path: &ElementPath| -> Option<Rect> {
        moved_frames
            .get(path)
            .copied()
            .or_else(|| index.get(path).map(|n| arena[*n].new_frame))
            .or_else(|| metadata.global_frame(path))
    };

    // ── Bottom-up: group frames from their children ──
    for &node in order.iter().rev() {
        let children = flattened_children(metadata, &arena[node].path);
        let frames: Vec<Rect> = children
            .iter()
            .filter(|c| metadata.global_frame(c).is_some())
            .filter_map(|c| new_frame_of(&arena, c))
            .collect();
        if let Some(frame) = bounding_rect(&frames) {
            arena[node].new_frame = frame;
        }
    }

    // ── Top-down: re-pin groups and their children ──
    let mut commands = Vec::new();
    for &node in &order {
        let group = arena[node].clone();
        trace!("group {} {:?} -> {:?}", group.path, group.start_frame, group.new_frame);

        let parent_node = owning_group(metadata, props, &group.path).and_then(|p| index.get(&p).copied());
        let parent_frames = match parent_node {
            Some(parent) => Some((arena[parent].start_frame, arena[parent].new_frame)),
            None => metadata
                .get(&group.path)
                .and_then(|m| m.special_size_measurements.immediate_parent_bounds)
                .map(|bounds| (bounds, bounds)),
        };
        if let Some((parent_start, parent_new)) = parent_frames {
            let group_props = props.get(&group.path);
            let is_named_group = metadata
                .get(&group.path)
                .is_some_and(|m| m.name == GROUP_COMPONENT_NAME);
            // content sizing cannot place far-edge pinned children, so such
            // groups get an explicit size on that axis
            let children = flattened_children(metadata, &group.path);
            let pinned_from = |pin: PinProp| children.iter().any(|c| has_pin(props.get(c), pin));
            let force_size = (
                is_named_group || pinned_from(PinProp::Right),
                is_named_group || pinned_from(PinProp::Bottom),
            );
            commands.extend(repin(
                &group.path,
                group_props,
                &pins_to_write(group_props, force_size),
                (&group.start_frame, &parent_start),
                (&group.new_frame, &parent_new),
            ));
        }

        for child in flattened_children(metadata, &group.path) {
            // nested groups are re-pinned in their own iteration
            if index.contains_key(&child) {
                continue;
            }
            let Some(start) = metadata.global_frame(&child) else {
                continue;
            };
            let new = moved_frames.get(&child).copied().unwrap_or(start);
            let child_props = props.get(&child);
            commands.extend(repin(
                &child,
                child_props,
                &pins_to_write(child_props, (false, false)),
                (&start, &group.start_frame),
                (&new, &group.new_frame),
            ));
        }
    }
    commands
}

/// Existing pins, plus a position pin per axis (`left`/`top` unless the
/// element is pinned from the far edge). Size pins are added per axis when
/// `force_size` says so.
fn pins_to_write(props: Option<&Map<String, Value>>, force_size: (bool, bool)) -> Vec<PinProp> {
    let mut pins = Vec::new();
    for ([start, size, end], force_size) in [
        (PinProp::HORIZONTAL, force_size.0),
        (PinProp::VERTICAL, force_size.1),
    ] {
        let has_start = has_pin(props, start);
        let has_end = has_pin(props, end);
        if has_start || !has_end {
            pins.push(start);
        }
        if has_end {
            pins.push(end);
        }
        if force_size || has_pin(props, size) {
            pins.push(size);
        }
    }
    pins
}

/// Set every pin whose value for the new frame differs from its value for
/// the starting frame. Frames are global; `(frame, parent)` pairs.
fn repin(
    target: &ElementPath,
    props: Option<&Map<String, Value>>,
    pins: &[PinProp],
    start: (&Rect, &Rect),
    new: (&Rect, &Rect),
) -> Vec<CanvasCommand> {
    let (start_frame, start_parent) = start;
    let (new_frame, new_parent) = new;
    let start_local = start_frame.to_local(start_parent);
    let new_local = new_frame.to_local(new_parent);
    let start_size = (start_parent.width, start_parent.height);
    let new_size = (new_parent.width, new_parent.height);
    pins.iter()
        .filter_map(|&pin| {
            let old_value = round_to(pin.value_for_frame(&start_local, start_size), 2);
            let new_value = round_to(pin.value_for_frame(&new_local, new_size), 2);
            if has_pin(props, pin) && old_value == new_value {
                return None;
            }
            let parent_dimension = if pin.is_horizontal() {
                new_size.0
            } else {
                new_size.1
            };
            Some(CanvasCommand::SetCssLengthProperty {
                when_to_run: WhenToRun::Always,
                target: target.clone(),
                property: PropertyPath::style(pin.as_str()),
                value: CssNumber::px(new_value),
                parent_dimension_px: Some(parent_dimension),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use canvas_core::document::Document;
    use canvas_core::layout::{Viewport, measure_document};
    use pretty_assertions::assert_eq;

    const SCENE: &str = r#"{ "uid": "sb", "children": [
        { "uid": "wrapper", "props": { "style": { "position": "absolute", "left": 10, "top": 10 } }, "children": [
            { "uid": "a", "props": { "style": { "position": "absolute", "left": 0, "top": 0, "width": 10, "height": 10 } } },
            { "uid": "b", "props": { "style": { "position": "absolute", "right": 0, "top": 20, "width": 10, "height": 10 } } }
        ] }
    ] }"#;

    fn p(s: &str) -> ElementPath {
        ElementPath::parse(s).unwrap()
    }

    fn set(target: &str, pin: &str, value: f64, parent: f64) -> CanvasCommand {
        CanvasCommand::SetCssLengthProperty {
            when_to_run: WhenToRun::Always,
            target: p(target),
            property: PropertyPath::style(pin),
            value: CssNumber::px(value),
            parent_dimension_px: Some(parent),
        }
    }

    #[test]
    fn moving_a_child_left_moves_the_group_origin() {
        let doc = Document::from_json(SCENE).unwrap();
        let metadata = measure_document(&doc, Viewport::default());
        let props = doc.all_element_props();
        // wrapper is 10x30 at (10, 10); `b` is pinned to its right edge
        let commands = propagate_group_bounds(
            &metadata,
            &props,
            &[(p("sb/wrapper/a"), Rect::new(5.0, 10.0, 10.0, 10.0))],
        );
        // the group widens to the left and, holding a right-pinned child,
        // gets an explicit width; `a` stays at its origin, `b` keeps right: 0
        assert_eq!(
            commands,
            vec![
                set("sb/wrapper", "left", 5.0, 800.0),
                set("sb/wrapper", "width", 15.0, 800.0),
            ]
        );
    }

    #[test]
    fn moving_the_top_child_down_shrinks_the_group() {
        let doc = Document::from_json(SCENE).unwrap();
        let metadata = measure_document(&doc, Viewport::default());
        let props = doc.all_element_props();
        let commands = propagate_group_bounds(
            &metadata,
            &props,
            &[(p("sb/wrapper/a"), Rect::new(10.0, 50.0, 10.0, 10.0))],
        );
        assert_eq!(
            commands,
            vec![
                set("sb/wrapper", "width", 10.0, 800.0),
                set("sb/wrapper", "top", 30.0, 600.0),
                set("sb/wrapper/a", "top", 20.0, 30.0),
                set("sb/wrapper/b", "top", 0.0, 30.0),
            ]
        );
    }

    #[test]
    fn nested_groups_propagate_outwards() {
        let doc = Document::from_json(
            r#"{ "uid": "sb", "children": [
                { "uid": "outer", "props": { "style": { "position": "absolute", "left": 10, "top": 10 } }, "children": [
                    { "uid": "inner", "props": { "style": { "position": "absolute", "left": 0, "top": 0 } }, "children": [
                        { "uid": "x", "props": { "style": { "position": "absolute", "left": 0, "top": 0, "width": 10, "height": 10 } } },
                        { "uid": "y", "props": { "style": { "position": "absolute", "left": 20, "top": 0, "width": 10, "height": 10 } } }
                    ] },
                    { "uid": "z", "props": { "style": { "position": "absolute", "left": 0, "top": 40, "width": 10, "height": 10 } } }
                ] }
            ] }"#,
        )
        .unwrap();
        let metadata = measure_document(&doc, Viewport::default());
        let props = doc.all_element_props();
        // x moves 10 left, out of both groups' starting boxes
        let commands = propagate_group_bounds(
            &metadata,
            &props,
            &[(p("sb/outer/inner/x"), Rect::new(0.0, 10.0, 10.0, 10.0))],
        );
        assert_eq!(
            commands,
            vec![
                set("sb/outer", "left", 0.0, 800.0),
                set("sb/outer/z", "left", 10.0, 40.0),
                set("sb/outer/inner/y", "left", 30.0, 40.0),
            ]
        );
    }

    #[test]
    fn ungrouped_targets_produce_nothing() {
        let doc = Document::from_json(SCENE).unwrap();
        let metadata = measure_document(&doc, Viewport::default());
        let props = doc.all_element_props();
        let commands = propagate_group_bounds(&metadata, &props, &[(p("sb/wrapper"), Rect::new(0.0, 0.0, 5.0, 5.0))]);
        assert_eq!(commands, Vec::new());
    }
}
