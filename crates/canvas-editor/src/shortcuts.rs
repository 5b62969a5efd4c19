//! Keyboard shortcut mapping.
//!
//! Maps key + modifier combos to semantic `ShortcutAction`s:
//! - Escape cancels the running interaction
//! - Tab cycles through the strategies that could handle it
//! - Arrow keys nudge the selection (Shift = large step)
//! - ⌘Z / ⌘⇧Z / ⌘Y undo and redo

use crate::input::Modifiers;

/// Direction of an arrow-key nudge, in unit steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NudgeDirection {
    pub dx: i8,
    pub dy: i8,
}

/// Actions that keyboard shortcuts can trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortcutAction {
    /// Abort the interaction and roll back its preview.
    Cancel,
    /// Prefer the next applicable strategy.
    CycleStrategy,
    Nudge {
        direction: NudgeDirection,
        large: bool,
    },
    Undo,
    Redo,
}

/// Resolves key events into shortcut actions.
pub struct ShortcutMap;

impl ShortcutMap {
    /// Resolve a key event to an action.
    ///
    /// `key` is the `KeyboardEvent.key` value (e.g. `"z"`, `"ArrowLeft"`).
    /// Returns `None` if the key combo has no binding.
    pub fn resolve(key: &str, modifiers: Modifiers) -> Option<ShortcutAction> {
        let cmd = modifiers.cmd || modifiers.ctrl;

        // ── Modifier combos first (most specific) ──
        if cmd && modifiers.shift {
            return match key {
                "z" | "Z" => Some(ShortcutAction::Redo),
                _ => None,
            };
        }

        if cmd {
            return match key {
                "z" | "Z" => Some(ShortcutAction::Undo),
                "y" | "Y" => Some(ShortcutAction::Redo),
                _ => None,
            };
        }

        if let Some(direction) = arrow_direction(key) {
            return Some(ShortcutAction::Nudge {
                direction,
                large: modifiers.shift,
            });
        }

        match key {
            "Escape" => Some(ShortcutAction::Cancel),
            "Tab" => Some(ShortcutAction::CycleStrategy),
            _ => None,
        }
    }

    pub fn is_arrow_key(key: &str) -> bool {
        arrow_direction(key).is_some()
    }
}

fn arrow_direction(key: &str) -> Option<NudgeDirection> {
    match key {
        "ArrowLeft" => Some(NudgeDirection { dx: -1, dy: 0 }),
        "ArrowRight" => Some(NudgeDirection { dx: 1, dy: 0 }),
        "ArrowUp" => Some(NudgeDirection { dx: 0, dy: -1 }),
        "ArrowDown" => Some(NudgeDirection { dx: 0, dy: 1 }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_undo_redo() {
        assert_eq!(
            ShortcutMap::resolve("z", Modifiers::cmd()),
            Some(ShortcutAction::Undo)
        );
        let cmd_shift = Modifiers {
            shift: true,
            ..Modifiers::cmd()
        };
        assert_eq!(
            ShortcutMap::resolve("Z", cmd_shift),
            Some(ShortcutAction::Redo)
        );
        let ctrl = Modifiers {
            ctrl: true,
            ..Modifiers::NONE
        };
        assert_eq!(ShortcutMap::resolve("y", ctrl), Some(ShortcutAction::Redo));
    }

    #[test]
    fn resolve_interaction_keys() {
        assert_eq!(
            ShortcutMap::resolve("Escape", Modifiers::NONE),
            Some(ShortcutAction::Cancel)
        );
        assert_eq!(
            ShortcutMap::resolve("Tab", Modifiers::NONE),
            Some(ShortcutAction::CycleStrategy)
        );
    }

    #[test]
    fn resolve_nudges() {
        assert_eq!(
            ShortcutMap::resolve("ArrowLeft", Modifiers::NONE),
            Some(ShortcutAction::Nudge {
                direction: NudgeDirection { dx: -1, dy: 0 },
                large: false
            })
        );
        assert_eq!(
            ShortcutMap::resolve("ArrowDown", Modifiers::shift()),
            Some(ShortcutAction::Nudge {
                direction: NudgeDirection { dx: 0, dy: 1 },
                large: true
            })
        );
    }

    #[test]
    fn resolve_modifier_precedence() {
        assert_eq!(ShortcutMap::resolve("z", Modifiers::NONE), None);
        assert_eq!(ShortcutMap::resolve("ArrowLeft", Modifiers::cmd()), None);
    }
}
