//! Multi-part selection tracking.

use crate::group::GroupId;
use crate::memo::MemoId;
use crate::part::PartId;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Composite selection key identifying a part within its group.
///
/// Rendered as `"<group>:<part>"`, matching the wire format the UI panels
/// exchange with the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PartKey {
    pub group: GroupId,
    pub part: PartId,
}

impl PartKey {
    pub fn new(group: GroupId, part: PartId) -> Self {
        Self { group, part }
    }
}

impl fmt::Display for PartKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group, self.part)
    }
}

/// Error parsing a composite selection key.
#[derive(Debug, Error)]
#[error("invalid part key: {0}")]
pub struct ParseKeyError(String);

impl FromStr for PartKey {
    type Err = ParseKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (group, part) = s
            .split_once(':')
            .ok_or_else(|| ParseKeyError(s.to_string()))?;
        let group = Uuid::parse_str(group).map_err(|_| ParseKeyError(s.to_string()))?;
        let part = Uuid::parse_str(part).map_err(|_| ParseKeyError(s.to_string()))?;
        Ok(Self { group, part })
    }
}

/// The current selection: a deduplicated set of part keys plus selected
/// memos. Membership has no ordering guarantee.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    parts: HashSet<PartKey>,
    memos: HashSet<MemoId>,
}

impl Selection {
    /// Create an empty selection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the part selection with the given keys.
    pub fn select(&mut self, keys: impl IntoIterator<Item = PartKey>) {
        self.parts = keys.into_iter().collect();
    }

    /// Toggle a single part key in or out of the selection.
    pub fn toggle(&mut self, key: PartKey) {
        if !self.parts.remove(&key) {
            self.parts.insert(key);
        }
    }

    /// Clear both part and memo selections.
    pub fn clear(&mut self) {
        self.parts.clear();
        self.memos.clear();
    }

    /// Clear only the part selection.
    pub fn clear_parts(&mut self) {
        self.parts.clear();
    }

    /// Check part membership.
    pub fn contains(&self, key: &PartKey) -> bool {
        self.parts.contains(key)
    }

    /// Selected part keys.
    pub fn parts(&self) -> &HashSet<PartKey> {
        &self.parts
    }

    /// Partition the selected part keys by group.
    ///
    /// Bulk edits do one grouping pass here, then one map pass per group,
    /// instead of scanning the whole selection for every group.
    pub fn by_group(&self) -> HashMap<GroupId, HashSet<PartId>> {
        let mut map: HashMap<GroupId, HashSet<PartId>> = HashMap::new();
        for key in &self.parts {
            map.entry(key.group).or_default().insert(key.part);
        }
        map
    }

    /// Toggle a memo in or out of the selection.
    pub fn toggle_memo(&mut self, id: MemoId) {
        if !self.memos.remove(&id) {
            self.memos.insert(id);
        }
    }

    /// Check memo membership.
    pub fn contains_memo(&self, id: MemoId) -> bool {
        self.memos.contains(&id)
    }

    /// Drop a memo from the selection (used when the memo is deleted).
    pub fn remove_memo(&mut self, id: MemoId) {
        self.memos.remove(&id);
    }

    /// True when nothing is selected.
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty() && self.memos.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> PartKey {
        PartKey::new(Uuid::new_v4(), Uuid::new_v4())
    }

    #[test]
    fn test_key_display_parse_round_trip() {
        let k = key();
        let parsed: PartKey = k.to_string().parse().unwrap();
        assert_eq!(k, parsed);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("not-a-key".parse::<PartKey>().is_err());
        assert!("abc:def".parse::<PartKey>().is_err());
    }

    #[test]
    fn test_select_replaces_and_dedups() {
        let mut sel = Selection::new();
        let a = key();
        let b = key();
        sel.select([a, b, a]);
        assert_eq!(sel.parts().len(), 2);

        sel.select([b]);
        assert!(!sel.contains(&a));
        assert!(sel.contains(&b));
    }

    #[test]
    fn test_toggle() {
        let mut sel = Selection::new();
        let k = key();
        sel.toggle(k);
        assert!(sel.contains(&k));
        sel.toggle(k);
        assert!(!sel.contains(&k));
    }

    #[test]
    fn test_by_group_partitions() {
        let mut sel = Selection::new();
        let group = Uuid::new_v4();
        let p1 = Uuid::new_v4();
        let p2 = Uuid::new_v4();
        let other = key();
        sel.select([PartKey::new(group, p1), PartKey::new(group, p2), other]);

        let by_group = sel.by_group();
        assert_eq!(by_group.len(), 2);
        assert_eq!(by_group[&group].len(), 2);
        assert!(by_group[&group].contains(&p1));
    }

    #[test]
    fn test_memo_selection() {
        let mut sel = Selection::new();
        let id = Uuid::new_v4();
        sel.toggle_memo(id);
        assert!(sel.contains_memo(id));
        sel.remove_memo(id);
        assert!(sel.is_empty());
    }
}
