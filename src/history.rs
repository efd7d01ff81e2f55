use std::collections::VecDeque;

use crate::document::PathSequence;

/// Maximum number of snapshots kept for undo/redo
pub const MAX_HISTORY: usize = 50;

/// Bounded undo/redo history of full path-sequence snapshots.
///
/// `index` always points at a retained entry; entries past `index` form the
/// redo branch and are discarded by the next push.
#[derive(Debug, Clone)]
pub struct History {
    entries: VecDeque<PathSequence>,
    index: usize,
}

impl History {
    /// Start a history whose only entry is `initial`
    pub fn new(initial: PathSequence) -> Self {
        let mut entries = VecDeque::with_capacity(MAX_HISTORY);
        entries.push_back(initial);
        Self { entries, index: 0 }
    }

    /// Record a new snapshot after the cursor, dropping any redo branch
    pub fn push(&mut self, snapshot: PathSequence) {
        self.entries.truncate(self.index + 1);
        self.entries.push_back(snapshot);
        while self.entries.len() > MAX_HISTORY {
            self.entries.pop_front();
        }
        self.index = self.entries.len() - 1;
    }

    /// Step back; returns the snapshot to restore
    pub fn undo(&mut self) -> Option<&PathSequence> {
        if !self.can_undo() {
            return None;
        }
        self.index -= 1;
        self.entries.get(self.index)
    }

    /// Step forward; returns the snapshot to restore
    pub fn redo(&mut self) -> Option<&PathSequence> {
        if !self.can_redo() {
            return None;
        }
        self.index += 1;
        self.entries.get(self.index)
    }

    pub fn can_undo(&self) -> bool {
        self.index > 0
    }

    pub fn can_redo(&self) -> bool {
        self.index + 1 < self.entries.len()
    }

    pub fn current(&self) -> &PathSequence {
        &self.entries[self.index]
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new(PathSequence::new())
    }
}
