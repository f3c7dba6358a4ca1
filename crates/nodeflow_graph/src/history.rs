// SPDX-License-Identifier: MIT OR Apache-2.0
//! Undo/redo history built on committed transaction diffs.
//!
//! Every committed diff carries enough old state to be inverted, so the
//! history stores diffs rather than whole-graph snapshots.

use crate::diff::GraphDiff;
use std::collections::VecDeque;
use thiserror::Error;

/// Default maximum undo history depth
pub const MAX_HISTORY: usize = 100;

/// History errors
#[derive(Debug, Error)]
pub enum HistoryError {
    /// Nothing to undo
    #[error("Nothing to undo")]
    NothingToUndo,

    /// Nothing to redo
    #[error("Nothing to redo")]
    NothingToRedo,
}

/// Result type for history operations
pub type Result<T> = std::result::Result<T, HistoryError>;

/// History statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HistoryStats {
    /// Transactions in the undo stack
    pub undo_count: usize,
    /// Transactions in the redo stack
    pub redo_count: usize,
    /// Maximum history depth
    pub max_depth: usize,
}

/// Undo/redo history manager
#[derive(Debug)]
pub struct History {
    /// Undo stack, most recent at the back
    undo_stack: VecDeque<GraphDiff>,
    /// Redo stack, most recent at the back
    redo_stack: VecDeque<GraphDiff>,
    /// Maximum history depth
    max_depth: usize,
}

impl History {
    /// Create a new history with the given depth (0 disables recording)
    pub fn new(max_depth: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: VecDeque::new(),
            max_depth,
        }
    }

    /// Record a freshly committed transaction; clears the redo stack
    pub fn record(&mut self, diff: GraphDiff) {
        self.redo_stack.clear();
        self.push_undo(diff);
    }

    /// Take the most recent transaction to undo
    pub fn pop_undo(&mut self) -> Result<GraphDiff> {
        self.undo_stack.pop_back().ok_or(HistoryError::NothingToUndo)
    }

    /// Take the most recently undone transaction to redo
    pub fn pop_redo(&mut self) -> Result<GraphDiff> {
        self.redo_stack.pop_back().ok_or(HistoryError::NothingToRedo)
    }

    /// Park an undone transaction on the redo stack
    pub fn push_redo(&mut self, diff: GraphDiff) {
        if self.max_depth == 0 {
            return;
        }
        self.redo_stack.push_back(diff);
        while self.redo_stack.len() > self.max_depth {
            self.redo_stack.pop_front();
        }
    }

    /// Put a redone transaction back on the undo stack without clearing redo
    pub fn push_undo(&mut self, diff: GraphDiff) {
        if self.max_depth == 0 {
            return;
        }
        self.undo_stack.push_back(diff);
        while self.undo_stack.len() > self.max_depth {
            self.undo_stack.pop_front();
        }
    }

    /// Whether undo is possible
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Whether redo is possible
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Label of the transaction the next undo would revert
    pub fn undo_label(&self) -> Option<&str> {
        self.undo_stack.back().and_then(|d| d.label.as_deref())
    }

    /// Label of the transaction the next redo would re-apply
    pub fn redo_label(&self) -> Option<&str> {
        self.redo_stack.back().and_then(|d| d.label.as_deref())
    }

    /// Forget everything
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    /// Current statistics
    pub fn stats(&self) -> HistoryStats {
        HistoryStats {
            undo_count: self.undo_stack.len(),
            redo_count: self.redo_stack.len(),
            max_depth: self.max_depth,
        }
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new(MAX_HISTORY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diff(revision: u64, label: &str) -> GraphDiff {
        GraphDiff {
            revision,
            label: Some(label.to_string()),
            ..GraphDiff::default()
        }
    }

    #[test]
    fn test_record_clears_redo() {
        let mut history = History::new(10);
        history.record(diff(1, "a"));
        let undone = history.pop_undo().unwrap();
        history.push_redo(undone);
        assert!(history.can_redo());

        history.record(diff(2, "b"));
        assert!(!history.can_redo());
        assert_eq!(history.undo_label(), Some("b"));
    }

    #[test]
    fn test_depth_limit_drops_oldest() {
        let mut history = History::new(2);
        history.record(diff(1, "a"));
        history.record(diff(2, "b"));
        history.record(diff(3, "c"));
        assert_eq!(history.stats().undo_count, 2);
        assert_eq!(history.pop_undo().unwrap().revision, 3);
        assert_eq!(history.pop_undo().unwrap().revision, 2);
        assert!(matches!(history.pop_undo(), Err(HistoryError::NothingToUndo)));
    }

    #[test]
    fn test_zero_depth_disables_recording() {
        let mut history = History::new(0);
        history.record(diff(1, "a"));
        assert!(!history.can_undo());
        assert!(matches!(history.pop_redo(), Err(HistoryError::NothingToRedo)));
    }
}
