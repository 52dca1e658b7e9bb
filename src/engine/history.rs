// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Undo/redo snapshot history.
//!
//! The history holds full snapshots of the committed state. `index` always
//! points at the snapshot currently applied; committing truncates any redo
//! tail before appending, and the oldest snapshots are dropped once the
//! stack exceeds its maximum depth.

use std::collections::VecDeque;

pub const DEFAULT_MAX_DEPTH: usize = 50;

#[derive(Debug, Clone)]
pub struct History<T> {
    snapshots: VecDeque<T>,
    index: usize,
    max_depth: usize,
}

impl<T: Clone> History<T> {
    /// Start a history whose only entry is `initial`.
    pub fn new(initial: T, max_depth: usize) -> Self {
        let mut snapshots = VecDeque::new();
        snapshots.push_back(initial);
        Self {
            snapshots,
            index: 0,
            max_depth: max_depth.max(1),
        }
    }

    /// Record a new committed state.
    pub fn commit(&mut self, snapshot: T) {
        self.snapshots.truncate(self.index + 1);
        self.snapshots.push_back(snapshot);
        while self.snapshots.len() > self.max_depth {
            self.snapshots.pop_front();
        }
        self.index = self.snapshots.len() - 1;
    }

    /// Step back one snapshot and return it.
    pub fn undo(&mut self) -> Option<&T> {
        if !self.can_undo() {
            return None;
        }
        self.index -= 1;
        self.snapshots.get(self.index)
    }

    /// Step forward one snapshot and return it.
    pub fn redo(&mut self) -> Option<&T> {
        if !self.can_redo() {
            return None;
        }
        self.index += 1;
        self.snapshots.get(self.index)
    }

    pub fn can_undo(&self) -> bool {
        self.index > 0
    }

    pub fn can_redo(&self) -> bool {
        self.index + 1 < self.snapshots.len()
    }

    pub fn current(&self) -> Option<&T> {
        self.snapshots.get(self.index)
    }

    /// Drop everything and restart from `initial`.
    pub fn reset(&mut self, initial: T) {
        self.snapshots.clear();
        self.snapshots.push_back(initial);
        self.index = 0;
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn undo_redo_walks_the_stack() {
        let mut history = History::new(vec![0], 10);
        history.commit(vec![0, 1]);
        history.commit(vec![0, 1, 2]);

        assert_eq!(history.undo(), Some(&vec![0, 1]));
        assert_eq!(history.undo(), Some(&vec![0]));
        assert_eq!(history.undo(), None);
        assert_eq!(history.redo(), Some(&vec![0, 1]));
        assert_eq!(history.redo(), Some(&vec![0, 1, 2]));
        assert_eq!(history.redo(), None);
    }

    #[test]
    fn undo_then_redo_restores_exact_state() {
        let mut history = History::new(String::new(), 10);
        history.commit("a".to_string());
        history.commit("ab".to_string());
        let before = history.current().cloned();
        history.undo();
        let after = history.redo().cloned();
        assert_eq!(before, after);
    }

    #[test]
    fn commit_truncates_redo_tail() {
        let mut history = History::new(0, 10);
        history.commit(1);
        history.commit(2);
        history.undo();
        history.commit(3);
        assert!(!history.can_redo());
        assert_eq!(history.current(), Some(&3));
        assert_eq!(history.undo(), Some(&1));
    }

    #[test]
    fn max_depth_drops_oldest() {
        let mut history = History::new(0, 3);
        for i in 1..=5 {
            history.commit(i);
        }
        assert_eq!(history.len(), 3);
        assert_eq!(history.current(), Some(&5));
        assert_eq!(history.undo(), Some(&4));
        assert_eq!(history.undo(), Some(&3));
        assert_eq!(history.undo(), None);
    }
}
