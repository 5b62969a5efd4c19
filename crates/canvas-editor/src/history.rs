//! Undo/redo history.
//!
//! Interactions use **document-snapshot batching**: the whole document is
//! captured before the interaction and after its commit, so undo/redo swaps
//! the document in a single step no matter how many ticks or commands the
//! interaction went through.

use canvas_core::document::Document;

/// One committed interaction.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub before: Document,
    pub after: Document,
    pub description: String,
}

/// Bounded undo/redo stacks of document snapshots.
pub struct History {
    undo_stack: Vec<Snapshot>,
    redo_stack: Vec<Snapshot>,
    /// Maximum undo depth.
    max_depth: usize,
}

impl History {
    pub fn new(max_depth: usize) -> Self {
        Self {
            undo_stack: Vec::with_capacity(max_depth),
            redo_stack: Vec::new(),
            max_depth,
        }
    }

    /// Record a commit. Nothing is recorded when the document did not change.
    pub fn push(&mut self, before: Document, after: Document, description: &str) {
        if before.to_scene() == after.to_scene() {
            return;
        }
        self.undo_stack.push(Snapshot {
            before,
            after,
            description: description.to_string(),
        });
        if self.undo_stack.len() > self.max_depth {
            self.undo_stack.remove(0);
        }
        // Clear redo stack on new action
        self.redo_stack.clear();
    }

    /// Restore the document from before the last commit.
    pub fn undo(&mut self, document: &mut Document) -> Option<String> {
        let snapshot = self.undo_stack.pop()?;
        *document = snapshot.before.clone();
        let desc = snapshot.description.clone();
        self.redo_stack.push(snapshot);
        Some(desc)
    }

    /// Re-apply the last undone commit.
    pub fn redo(&mut self, document: &mut Document) -> Option<String> {
        let snapshot = self.redo_stack.pop()?;
        *document = snapshot.after.clone();
        let desc = snapshot.description.clone();
        self.undo_stack.push(snapshot);
        Some(desc)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }
}
