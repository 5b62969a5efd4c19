//! Input abstraction layer.
//!
//! Pointer and keyboard events arrive already normalized: coordinates are in
//! canvas space (pan and zoom removed) and modifier keys are flattened into
//! [`Modifiers`].

use canvas_core::geom::Point;
use serde::{Deserialize, Serialize};

/// Modifier-key state. On macOS `cmd` is ⌘; elsewhere it is the control key
/// a platform uses for commands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifiers {
    pub cmd: bool,
    pub alt: bool,
    pub shift: bool,
    pub ctrl: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        cmd: false,
        alt: false,
        shift: false,
        ctrl: false,
    };

    pub const fn shift() -> Self {
        Modifiers {
            shift: true,
            ..Self::NONE
        }
    }

    pub const fn alt() -> Self {
        Modifiers {
            alt: true,
            ..Self::NONE
        }
    }

    pub const fn cmd() -> Self {
        Modifiers {
            cmd: true,
            ..Self::NONE
        }
    }
}

/// A normalized input event.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    PointerDown { point: Point, modifiers: Modifiers },
    PointerMove { point: Point, modifiers: Modifiers },
    PointerUp { point: Point, modifiers: Modifiers },
    /// Key pressed; `key` is the `KeyboardEvent.key` value.
    KeyDown { key: String, modifiers: Modifiers },
    KeyUp { key: String, modifiers: Modifiers },
    /// The canvas lost focus.
    Blur,
}

impl InputEvent {
    pub fn pointer_down(x: f64, y: f64, modifiers: Modifiers) -> Self {
        Self::PointerDown {
            point: Point::new(x, y),
            modifiers,
        }
    }

    pub fn pointer_move(x: f64, y: f64, modifiers: Modifiers) -> Self {
        Self::PointerMove {
            point: Point::new(x, y),
            modifiers,
        }
    }

    pub fn pointer_up(x: f64, y: f64, modifiers: Modifiers) -> Self {
        Self::PointerUp {
            point: Point::new(x, y),
            modifiers,
        }
    }

    pub fn key_down(key: &str, modifiers: Modifiers) -> Self {
        Self::KeyDown {
            key: key.to_string(),
            modifiers,
        }
    }

    pub fn key_up(key: &str, modifiers: Modifiers) -> Self {
        Self::KeyUp {
            key: key.to_string(),
            modifiers,
        }
    }

    /// Extract position if this is a pointer event.
    pub fn position(&self) -> Option<Point> {
        match self {
            Self::PointerDown { point, .. }
            | Self::PointerMove { point, .. }
            | Self::PointerUp { point, .. } => Some(*point),
            _ => None,
        }
    }

    pub fn modifiers(&self) -> Modifiers {
        match self {
            Self::PointerDown { modifiers, .. }
            | Self::PointerMove { modifiers, .. }
            | Self::PointerUp { modifiers, .. }
            | Self::KeyDown { modifiers, .. }
            | Self::KeyUp { modifiers, .. } => *modifiers,
            Self::Blur => Modifiers::NONE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_only_for_pointer_events() {
        let down = InputEvent::pointer_down(1.0, 2.0, Modifiers::shift());
        assert_eq!(down.position(), Some(Point::new(1.0, 2.0)));
        assert!(down.modifiers().shift);
        assert_eq!(InputEvent::key_down("a", Modifiers::NONE).position(), None);
        assert_eq!(InputEvent::Blur.modifiers(), Modifiers::NONE);
    }
}
