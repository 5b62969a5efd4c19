//! Interaction sessions.
//!
//! A session describes one in-progress gesture: where it started, which
//! control it started on, how far it has travelled, and the metadata and
//! props snapshot taken when it began. Sessions are values; every pointer
//! move produces a new one.

use crate::input::Modifiers;
use canvas_core::geom::Point;
use canvas_core::metadata::{AllElementProps, ElementInstanceMetadataMap};
use canvas_core::path::ElementPath;
use serde::Serialize;
use std::rc::Rc;

/// Position of a resize handle on a bounding box: `0`, `0.5` or `1` per axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EdgePosition {
    pub x: f64,
    pub y: f64,
}

impl EdgePosition {
    pub const TOP_LEFT: EdgePosition = EdgePosition { x: 0.0, y: 0.0 };
    pub const TOP: EdgePosition = EdgePosition { x: 0.5, y: 0.0 };
    pub const TOP_RIGHT: EdgePosition = EdgePosition { x: 1.0, y: 0.0 };
    pub const RIGHT: EdgePosition = EdgePosition { x: 1.0, y: 0.5 };
    pub const BOTTOM_RIGHT: EdgePosition = EdgePosition { x: 1.0, y: 1.0 };
    pub const BOTTOM: EdgePosition = EdgePosition { x: 0.5, y: 1.0 };
    pub const BOTTOM_LEFT: EdgePosition = EdgePosition { x: 0.0, y: 1.0 };
    pub const LEFT: EdgePosition = EdgePosition { x: 0.0, y: 0.5 };

    /// The eight handles, clockwise from the top-left corner.
    pub const HANDLES: [EdgePosition; 8] = [
        Self::TOP_LEFT,
        Self::TOP,
        Self::TOP_RIGHT,
        Self::RIGHT,
        Self::BOTTOM_RIGHT,
        Self::BOTTOM,
        Self::BOTTOM_LEFT,
        Self::LEFT,
    ];

    pub fn is_corner(&self) -> bool {
        self.x != 0.5 && self.y != 0.5
    }
}

/// The control a gesture started on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ActiveControl {
    /// The body of a selected element.
    BoundingArea { target: ElementPath },
    ResizeHandle { edge_position: EdgePosition },
    /// The reorder affordance of a flex child.
    FlexReorder { target: ElementPath },
    /// Focus is on the canvas and keys are being captured.
    KeyboardCatcher,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DragInteractionData {
    pub drag_start: Point,
    /// `None` until the pointer leaves the dead zone around `drag_start`.
    pub drag: Option<Point>,
    pub modifiers: Modifiers,
    pub threshold_passed: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct KeyboardInteractionData {
    /// Sum of all nudges so far.
    pub movement: Point,
    pub modifiers: Modifiers,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InteractionData {
    Drag(DragInteractionData),
    Keyboard(KeyboardInteractionData),
}

/// One gesture, from pointer-down (or first key press) to commit or cancel.
#[derive(Debug, Clone)]
pub struct InteractionSession {
    pub interaction_data: InteractionData,
    pub active_control: ActiveControl,
    /// Metadata at the start of the gesture; never updated.
    pub starting_metadata: Rc<ElementInstanceMetadataMap>,
    pub starting_all_element_props: Rc<AllElementProps>,
    /// Metadata measured after the previous tick.
    pub latest_metadata: Option<Rc<ElementInstanceMetadataMap>>,
}

/// Start a pointer gesture. The drag is empty until the first move passes
/// the dead zone.
pub fn create_interaction_session(
    point: Point,
    modifiers: Modifiers,
    active_control: ActiveControl,
    starting_metadata: Rc<ElementInstanceMetadataMap>,
    starting_all_element_props: Rc<AllElementProps>,
) -> InteractionSession {
    InteractionSession {
        interaction_data: InteractionData::Drag(DragInteractionData {
            drag_start: point,
            drag: None,
            modifiers,
            threshold_passed: false,
        }),
        active_control,
        starting_metadata,
        starting_all_element_props,
        latest_metadata: None,
    }
}

pub fn create_keyboard_interaction(
    modifiers: Modifiers,
    starting_metadata: Rc<ElementInstanceMetadataMap>,
    starting_all_element_props: Rc<AllElementProps>,
) -> InteractionSession {
    InteractionSession {
        interaction_data: InteractionData::Keyboard(KeyboardInteractionData {
            movement: Point::ZERO,
            modifiers,
        }),
        active_control: ActiveControl::KeyboardCatcher,
        starting_metadata,
        starting_all_element_props,
        latest_metadata: None,
    }
}

impl InteractionSession {
    /// Force a drag vector, bypassing the dead zone.
    pub fn with_drag(mut self, drag: Point) -> Self {
        if let InteractionData::Drag(data) = &mut self.interaction_data {
            data.drag = Some(drag);
            data.threshold_passed = true;
        }
        self
    }

    /// The session after the pointer moved to `point`. `threshold` is the
    /// dead-zone radius in canvas units.
    pub fn update_with_pointer_move(
        &self,
        point: Point,
        modifiers: Modifiers,
        threshold: f64,
    ) -> InteractionSession {
        let mut next = self.clone();
        match &mut next.interaction_data {
            InteractionData::Drag(data) => {
                let vector = point - data.drag_start;
                data.threshold_passed = data.threshold_passed || vector.magnitude() >= threshold;
                data.drag = data.threshold_passed.then_some(vector);
                data.modifiers = modifiers;
            }
            InteractionData::Keyboard(_) => {}
        }
        next
    }

    /// The session after one more arrow-key nudge.
    pub fn add_keyboard_movement(&self, delta: Point, modifiers: Modifiers) -> InteractionSession {
        let mut next = self.clone();
        if let InteractionData::Keyboard(data) = &mut next.interaction_data {
            data.movement = data.movement + delta;
            data.modifiers = modifiers;
        }
        next
    }

    pub fn drag(&self) -> Option<Point> {
        match &self.interaction_data {
            InteractionData::Drag(data) => data.drag,
            _ => None,
        }
    }

    pub fn drag_start(&self) -> Option<Point> {
        match &self.interaction_data {
            InteractionData::Drag(data) => Some(data.drag_start),
            _ => None,
        }
    }

    /// Current pointer position of a drag, or the start while the drag is
    /// still inside the dead zone.
    pub fn pointer(&self) -> Option<Point> {
        match &self.interaction_data {
            InteractionData::Drag(data) => Some(data.drag_start + data.drag.unwrap_or(Point::ZERO)),
            InteractionData::Keyboard(_) => None,
        }
    }

    pub fn modifiers(&self) -> Modifiers {
        match &self.interaction_data {
            InteractionData::Drag(data) => data.modifiers,
            InteractionData::Keyboard(data) => data.modifiers,
        }
    }

    pub fn keyboard_movement(&self) -> Option<Point> {
        match &self.interaction_data {
            InteractionData::Keyboard(data) => Some(data.movement),
            _ => None,
        }
    }

    /// A drag that has passed the dead zone.
    pub fn is_live_drag(&self) -> bool {
        self.drag().is_some()
    }

    pub fn is_keyboard(&self) -> bool {
        matches!(self.interaction_data, InteractionData::Keyboard(_))
    }

    /// The metadata strategies should read: latest if measured, else the
    /// starting snapshot.
    pub fn metadata(&self) -> &ElementInstanceMetadataMap {
        self.latest_metadata
            .as_deref()
            .unwrap_or(self.starting_metadata.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> InteractionSession {
        create_interaction_session(
            Point::new(10.0, 10.0),
            Modifiers::NONE,
            ActiveControl::KeyboardCatcher,
            Rc::new(ElementInstanceMetadataMap::new()),
            Rc::new(AllElementProps::new()),
        )
    }

    #[test]
    fn drag_stays_empty_inside_dead_zone() {
        let s = session().update_with_pointer_move(Point::new(11.0, 10.0), Modifiers::NONE, 2.0);
        assert_eq!(s.drag(), None);
        assert!(!s.is_live_drag());
        assert_eq!(s.pointer(), Some(Point::new(10.0, 10.0)));
    }

    #[test]
    fn threshold_stays_passed() {
        let s = session()
            .update_with_pointer_move(Point::new(15.0, 10.0), Modifiers::NONE, 2.0)
            .update_with_pointer_move(Point::new(10.5, 10.0), Modifiers::shift(), 2.0);
        assert_eq!(s.drag(), Some(Point::new(0.5, 0.0)));
        assert!(s.modifiers().shift);
    }

    #[test]
    fn keyboard_movement_accumulates() {
        let s = create_keyboard_interaction(
            Modifiers::NONE,
            Rc::new(ElementInstanceMetadataMap::new()),
            Rc::new(AllElementProps::new()),
        )
        .add_keyboard_movement(Point::new(1.0, 0.0), Modifiers::NONE)
        .add_keyboard_movement(Point::new(0.0, 10.0), Modifiers::shift());
        assert_eq!(s.keyboard_movement(), Some(Point::new(1.0, 10.0)));
        assert_eq!(s.drag(), None);
    }
}
