//! Bounded snapshot history with linear undo/redo.

/// Maximum number of history entries to keep.
pub const MAX_HISTORY: usize = 50;

/// Cursor-based linear history over full-state snapshots.
///
/// The entry at the cursor is always value-equal to the live state right
/// after a push, undo or redo. Entries never alias the live state: pushes
/// store a clone, and undo/redo hand back a clone rather than the stored
/// snapshot, so later edits cannot corrupt history.
#[derive(Debug, Clone)]
pub struct History<T: Clone> {
    entries: Vec<T>,
    cursor: usize,
}

impl<T: Clone> History<T> {
    /// Create a history seeded with the initial state.
    pub fn new(initial: T) -> Self {
        Self {
            entries: vec![initial],
            cursor: 0,
        }
    }

    /// Record a new state after a mutation.
    ///
    /// Any redo branch past the cursor is discarded, the snapshot is
    /// appended, and the oldest entries are dropped once the cap is hit.
    pub fn push(&mut self, state: &T) {
        self.entries.truncate(self.cursor + 1);
        self.entries.push(state.clone());
        if self.entries.len() > MAX_HISTORY {
            let excess = self.entries.len() - MAX_HISTORY;
            log::trace!("history at capacity, dropping {excess} oldest snapshot(s)");
            self.entries.drain(..excess);
        }
        self.cursor = self.entries.len() - 1;
    }

    /// Step back one entry. Returns a clone of the restored state, or
    /// `None` when already at the oldest entry.
    pub fn undo(&mut self) -> Option<T> {
        if self.cursor == 0 {
            return None;
        }
        self.cursor -= 1;
        Some(self.entries[self.cursor].clone())
    }

    /// Step forward one entry. Returns a clone of the restored state, or
    /// `None` when already at the newest entry.
    pub fn redo(&mut self) -> Option<T> {
        if self.cursor + 1 >= self.entries.len() {
            return None;
        }
        self.cursor += 1;
        Some(self.entries[self.cursor].clone())
    }

    /// Check if undo is available.
    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    /// Check if redo is available.
    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.entries.len()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when only the seed entry is stored (nothing to undo or redo).
    pub fn at_initial(&self) -> bool {
        self.entries.len() <= 1
    }

    /// Current cursor position.
    pub fn cursor(&self) -> usize {
        self.cursor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_undo_redo_round_trip() {
        let mut history = History::new(0);
        for i in 1..=5 {
            history.push(&i);
        }

        for expected in (0..5).rev() {
            assert_eq!(history.undo(), Some(expected));
        }
        assert_eq!(history.undo(), None);

        for expected in 1..=5 {
            assert_eq!(history.redo(), Some(expected));
        }
        assert_eq!(history.redo(), None);
    }

    #[test]
    fn test_cap_drops_oldest() {
        let mut history = History::new(0);
        for i in 1..=60 {
            history.push(&i);
        }

        assert_eq!(history.len(), MAX_HISTORY);
        assert_eq!(history.cursor(), MAX_HISTORY - 1);
        // Oldest surviving entry is 11; walking all the way back lands there.
        let mut last = None;
        while let Some(state) = history.undo() {
            last = Some(state);
        }
        assert_eq!(last, Some(11));
    }

    #[test]
    fn test_at_initial_tracks_stored_entries() {
        let mut history = History::new(0);
        assert!(history.at_initial());
        assert_eq!(history.len(), 1);

        history.push(&1);
        assert!(!history.at_initial());
    }

    #[test]
    fn test_push_discards_redo_branch() {
        let mut history = History::new(0);
        history.push(&1);
        history.push(&2);

        assert_eq!(history.undo(), Some(1));
        history.push(&9);

        assert!(!history.can_redo());
        assert_eq!(history.redo(), None);
        assert_eq!(history.undo(), Some(1));
    }

    #[test]
    fn test_restored_state_is_independent() {
        let mut history = History::new(vec![1, 2, 3]);
        history.push(&vec![4, 5, 6]);

        let mut restored = history.undo().unwrap();
        restored.push(99);

        // Mutating the restored clone must not leak into stored entries.
        assert_eq!(history.redo(), Some(vec![4, 5, 6]));
        assert_eq!(history.undo(), Some(vec![1, 2, 3]));
    }
}
