//! Undo and redo stacks of committed change sets.

use crate::transaction::ChangeSet;
use std::collections::VecDeque;

/// Undo/redo stacks.
///
/// Each entry is the change set of one committed transaction. Recording a
/// new commit clears the redo stack; the undo stack keeps at most `limit`
/// entries, dropping the oldest.
#[derive(Debug, Default)]
pub struct UndoHistory {
    undo_stack: VecDeque<ChangeSet>,
    redo_stack: Vec<ChangeSet>,
    limit: usize,
}

impl UndoHistory {
    /// Creates an empty history keeping at most `limit` undo steps.
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: Vec::new(),
            limit,
        }
    }

    /// Records a committed change set.
    pub fn record(&mut self, set: ChangeSet) {
        self.redo_stack.clear();
        if self.limit == 0 || set.is_empty() {
            return;
        }
        self.undo_stack.push_back(set);
        while self.undo_stack.len() > self.limit {
            self.undo_stack.pop_front();
        }
    }

    /// Takes the most recent set to undo.
    pub fn take_undo(&mut self) -> Option<ChangeSet> {
        self.undo_stack.pop_back()
    }

    /// Files an undone set for redo.
    pub fn undone(&mut self, set: ChangeSet) {
        self.redo_stack.push(set);
    }

    /// Takes the most recently undone set.
    pub fn take_redo(&mut self) -> Option<ChangeSet> {
        self.redo_stack.pop()
    }

    /// Files a redone set back for undo, keeping the redo stack.
    pub fn redone(&mut self, set: ChangeSet) {
        self.undo_stack.push_back(set);
    }

    /// Puts back a set whose undo failed.
    pub fn restore_undo(&mut self, set: ChangeSet) {
        self.undo_stack.push_back(set);
    }

    /// Puts back a set whose redo failed.
    pub fn restore_redo(&mut self, set: ChangeSet) {
        self.redo_stack.push(set);
    }

    /// Returns true if there is something to undo.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Returns true if there is something to redo.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Label of the next undo step.
    #[must_use]
    pub fn undo_label(&self) -> Option<String> {
        self.undo_stack.back().map(ChangeSet::label)
    }

    /// Label of the next redo step.
    #[must_use]
    pub fn redo_label(&self) -> Option<String> {
        self.redo_stack.last().map(ChangeSet::label)
    }

    /// Number of undo steps.
    #[must_use]
    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    /// Forgets every step.
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}
