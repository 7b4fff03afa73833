//! Snapshot undo/redo history.

use crate::config::DEFAULT_HISTORY_LIMIT;

/// A bounded stack of full snapshots with a cursor.
///
/// The cursor always points at the snapshot matching the live state.
#[derive(Debug, Clone)]
pub struct History<T> {
    snapshots: Vec<T>,
    cursor: usize,
    limit: usize,
}

impl<T: Clone> Default for History<T> {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

impl<T: Clone> History<T> {
    /// Create an empty history keeping at most `limit` snapshots (minimum 1).
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self {
            snapshots: Vec::new(),
            cursor: 0,
            limit: limit.max(1),
        }
    }

    /// Record `state` as the newest snapshot, discarding any redo branch.
    pub fn save_snapshot(&mut self, state: &T) {
        if !self.snapshots.is_empty() {
            self.snapshots.truncate(self.cursor + 1);
        }
        self.snapshots.push(state.clone());
        if self.snapshots.len() > self.limit {
            let excess = self.snapshots.len() - self.limit;
            self.snapshots.drain(..excess);
        }
        self.cursor = self.snapshots.len() - 1;
    }

    /// Step back one snapshot.
    pub fn undo(&mut self) -> Option<&T> {
        if !self.can_undo() {
            return None;
        }
        self.cursor -= 1;
        self.snapshots.get(self.cursor)
    }

    /// Step forward one snapshot.
    pub fn redo(&mut self) -> Option<&T> {
        if !self.can_redo() {
            return None;
        }
        self.cursor += 1;
        self.snapshots.get(self.cursor)
    }

    /// Whether [`History::undo`] would return a snapshot.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    /// Whether [`History::redo`] would return a snapshot.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.snapshots.len()
    }

    /// Snapshot at the cursor.
    #[must_use]
    pub fn current(&self) -> Option<&T> {
        self.snapshots.get(self.cursor)
    }

    /// Number of stored snapshots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Whether no snapshot has been stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Drop every snapshot and start over from `baseline`.
    pub fn clear(&mut self, baseline: &T) {
        self.snapshots.clear();
        self.cursor = 0;
        self.save_snapshot(baseline);
    }
}
