#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Bounded undo/redo stacks of scene snapshots.
//!
//! The history never looks inside the snapshots it stores. Callers record
//! the live scene right before mutating it and hand the live scene back in
//! when undoing or redoing, so whichever stack is popped always receives
//! the state being replaced.

use std::collections::VecDeque;

use battlemap_core::SceneSnapshot;

/// Number of snapshots each stack retains by default.
pub const DEFAULT_HISTORY_DEPTH: usize = 50;

/// Undo and redo stacks with a shared capacity.
#[derive(Clone, Debug)]
pub struct History {
    undo: VecDeque<SceneSnapshot>,
    redo: VecDeque<SceneSnapshot>,
    capacity: usize,
}

impl History {
    /// Creates an empty history retaining at most `capacity` entries per stack.
    ///
    /// A capacity of zero is raised to one.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            undo: VecDeque::new(),
            redo: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    /// Maximum number of entries kept on each stack.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Records the scene as it was right before a mutation.
    ///
    /// Recording a new edit invalidates everything that could be redone.
    pub fn record(&mut self, before: SceneSnapshot) {
        push_bounded(&mut self.undo, before, self.capacity);
        self.redo.clear();
    }

    /// Pops the most recent undo entry, parking `current` on the redo stack.
    ///
    /// Returns `None` without touching either stack when there is nothing to undo.
    pub fn undo(&mut self, current: SceneSnapshot) -> Option<SceneSnapshot> {
        let previous = self.undo.pop_back()?;
        push_bounded(&mut self.redo, current, self.capacity);
        tracing::debug!(restored = %previous.id, "undo");
        Some(previous)
    }

    /// Pops the most recent redo entry, parking `current` on the undo stack.
    ///
    /// Returns `None` without touching either stack when there is nothing to redo.
    pub fn redo(&mut self, current: SceneSnapshot) -> Option<SceneSnapshot> {
        let next = self.redo.pop_back()?;
        push_bounded(&mut self.undo, current, self.capacity);
        tracing::debug!(restored = %next.id, "redo");
        Some(next)
    }

    /// Whether an undo is possible.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    /// Whether a redo is possible.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Number of entries on the undo stack.
    #[must_use]
    pub fn undo_depth(&self) -> usize {
        self.undo.len()
    }

    /// Number of entries on the redo stack.
    #[must_use]
    pub fn redo_depth(&self) -> usize {
        self.redo.len()
    }

    /// Forgets every recorded entry.
    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }
}

impl Default for History {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_DEPTH)
    }
}

fn push_bounded(stack: &mut VecDeque<SceneSnapshot>, snapshot: SceneSnapshot, capacity: usize) {
    stack.push_back(snapshot);
    while stack.len() > capacity {
        let _ = stack.pop_front();
    }
}
