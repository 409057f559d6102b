//! Drawing document and engine facade.
//!
//! [`Drawing`] is the single entry point UI collaborators mutate through:
//! group/part CRUD, memo CRUD, selection, bulk edits, and undo/redo. Every
//! mutator ends with exactly one history push.

use crate::bulk::{BulkScope, BulkValues, MergeMode};
use crate::group::{Group, GroupId, GroupUpdate};
use crate::history::History;
use crate::memo::{Memo, MemoId};
use crate::part::{Part, PartId};
use crate::selection::{PartKey, Selection};
use serde::{Deserialize, Serialize};

/// The undoable state of a drawing: groups, memos and loose parts.
///
/// This is the snapshot unit for history. Selection is runtime-only state
/// and is deliberately not part of it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DrawingState {
    pub groups: Vec<Group>,
    pub memos: Vec<Memo>,
    pub loose_parts: Vec<Part>,
}

/// A scaffold drawing with bounded undo history and selection tracking.
#[derive(Debug, Clone)]
pub struct Drawing {
    state: DrawingState,
    history: History<DrawingState>,
    selection: Selection,
}

impl Default for Drawing {
    fn default() -> Self {
        Self::new()
    }
}

impl Drawing {
    /// Create a new empty drawing.
    pub fn new() -> Self {
        let state = DrawingState::default();
        Self {
            history: History::new(state.clone()),
            state,
            selection: Selection::new(),
        }
    }

    /// Create a drawing from an existing state (e.g. loaded by the host).
    pub fn from_state(state: DrawingState) -> Self {
        Self {
            history: History::new(state.clone()),
            state,
            selection: Selection::new(),
        }
    }

    /// The current state.
    pub fn state(&self) -> &DrawingState {
        &self.state
    }

    /// The groups in the drawing.
    pub fn groups(&self) -> &[Group] {
        &self.state.groups
    }

    /// Get a group by id.
    pub fn group(&self, id: GroupId) -> Option<&Group> {
        self.state.groups.iter().find(|g| g.id == id)
    }

    /// The memos in the drawing.
    pub fn memos(&self) -> &[Memo] {
        &self.state.memos
    }

    /// Get a memo by id.
    pub fn memo(&self, id: MemoId) -> Option<&Memo> {
        self.state.memos.iter().find(|m| m.id == id)
    }

    /// Parts not owned by any group.
    pub fn loose_parts(&self) -> &[Part] {
        &self.state.loose_parts
    }

    /// The current selection.
    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    fn commit(&mut self) {
        self.history.push(&self.state);
    }

    // --- group / part CRUD -------------------------------------------------

    /// Add a group.
    pub fn add_group(&mut self, group: Group) {
        self.state.groups.push(group);
        self.commit();
    }

    /// Apply a partial update to a group. Stale ids are a silent no-op.
    pub fn update_group(&mut self, id: GroupId, update: GroupUpdate) {
        let Some(index) = self.state.groups.iter().position(|g| g.id == id) else {
            return;
        };
        let mut group = self.state.groups[index].clone();
        if let Some(name) = update.name {
            group.name = name;
        }
        if let Some(parts) = update.parts {
            group.set_parts(parts);
        }
        self.state.groups[index] = group;
        self.commit();
    }

    /// Remove a group. Stale ids are a silent no-op.
    pub fn remove_group(&mut self, id: GroupId) {
        let before = self.state.groups.len();
        self.state.groups.retain(|g| g.id != id);
        if self.state.groups.len() == before {
            return;
        }
        let survivors: Vec<PartKey> = self
            .selection
            .parts()
            .iter()
            .copied()
            .filter(|key| key.group != id)
            .collect();
        self.selection.select(survivors);
        self.commit();
    }

    /// Remove every group.
    pub fn clear_groups(&mut self) {
        self.state.groups.clear();
        self.selection.clear_parts();
        self.commit();
    }

    /// Add a part to a group. A stale group id is a silent no-op.
    pub fn add_part(&mut self, group_id: GroupId, part: Part) {
        let Some(group) = self.state.groups.iter_mut().find(|g| g.id == group_id)
        else {
            return;
        };
        group.insert_part(part);
        self.commit();
    }

    /// Update a part in place via `f`, re-normalizing its metadata.
    /// Stale group or part ids are a silent no-op.
    pub fn update_part<F>(&mut self, group_id: GroupId, part_id: PartId, f: F)
    where
        F: Fn(&mut Part),
    {
        let Some(group) = self.state.groups.iter_mut().find(|g| g.id == group_id)
        else {
            return;
        };
        if group.map_parts(|p| p.id == part_id, f) > 0 {
            self.commit();
        }
    }

    /// Remove a part from a group. Stale ids are a silent no-op.
    pub fn remove_part(&mut self, group_id: GroupId, part_id: PartId) {
        let Some(group) = self.state.groups.iter_mut().find(|g| g.id == group_id)
        else {
            return;
        };
        if group.remove_part(part_id).is_some() {
            let survivors: Vec<PartKey> = self
                .selection
                .parts()
                .iter()
                .copied()
                .filter(|key| !(key.group == group_id && key.part == part_id))
                .collect();
            self.selection.select(survivors);
            self.commit();
        }
    }

    /// Add a loose part (not owned by any group).
    pub fn add_loose_part(&mut self, mut part: Part) {
        part.meta.normalize();
        self.state.loose_parts.push(part);
        self.commit();
    }

    /// Remove a loose part. Stale ids are a silent no-op.
    pub fn remove_loose_part(&mut self, id: PartId) {
        let before = self.state.loose_parts.len();
        self.state.loose_parts.retain(|p| p.id != id);
        if self.state.loose_parts.len() < before {
            self.commit();
        }
    }

    // --- memo CRUD ---------------------------------------------------------

    /// Add a memo.
    pub fn add_memo(&mut self, memo: Memo) {
        self.state.memos.push(memo);
        self.commit();
    }

    /// Update a memo in place via `f`, bumping its updated timestamp.
    /// Stale ids are a silent no-op.
    pub fn update_memo<F>(&mut self, id: MemoId, f: F)
    where
        F: FnOnce(&mut Memo),
    {
        let Some(memo) = self.state.memos.iter_mut().find(|m| m.id == id) else {
            return;
        };
        f(memo);
        memo.touch();
        self.commit();
    }

    /// Remove a memo, also evicting it from the selection if selected.
    /// Stale ids are a silent no-op.
    pub fn remove_memo(&mut self, id: MemoId) {
        let before = self.state.memos.len();
        self.state.memos.retain(|m| m.id != id);
        if self.state.memos.len() < before {
            self.selection.remove_memo(id);
            self.commit();
        }
    }

    // --- selection ---------------------------------------------------------

    /// Replace the part selection.
    pub fn select(&mut self, keys: impl IntoIterator<Item = PartKey>) {
        self.selection.select(keys);
    }

    /// Toggle a part key in the selection.
    pub fn toggle_selected(&mut self, key: PartKey) {
        self.selection.toggle(key);
    }

    /// Toggle a memo in the selection.
    pub fn toggle_selected_memo(&mut self, id: MemoId) {
        self.selection.toggle_memo(id);
    }

    /// Clear the selection.
    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    // --- bulk edit ---------------------------------------------------------

    /// Apply one bulk action across the chosen scope.
    ///
    /// `Selected` scope touches only selected parts of the matching type and
    /// clears the part selection afterwards; `All` touches every matching
    /// part in every group and in the loose list. Either way the action
    /// lands in history exactly once.
    pub fn bulk_edit(&mut self, scope: BulkScope, mode: MergeMode, values: &BulkValues) {
        let kind = values.target_kind();
        log::debug!("bulk edit: {scope:?}/{mode:?} on {kind:?} parts");
        match scope {
            BulkScope::All => {
                for group in &mut self.state.groups {
                    group.map_parts(
                        |part| part.kind() == kind,
                        |part| values.apply(&mut part.meta, mode),
                    );
                }
                for part in &mut self.state.loose_parts {
                    if part.kind() == kind {
                        values.apply(&mut part.meta, mode);
                        part.meta.normalize();
                    }
                }
            }
            BulkScope::Selected => {
                let by_group = self.selection.by_group();
                for group in &mut self.state.groups {
                    let Some(members) = by_group.get(&group.id) else {
                        continue;
                    };
                    group.map_parts(
                        |part| part.kind() == kind && members.contains(&part.id),
                        |part| values.apply(&mut part.meta, mode),
                    );
                }
                self.selection.clear_parts();
            }
        }
        self.commit();
    }

    // --- history -----------------------------------------------------------

    /// Undo the last change. Returns true if a state was restored.
    pub fn undo(&mut self) -> bool {
        match self.history.undo() {
            Some(state) => {
                self.state = state;
                true
            }
            None => false,
        }
    }

    /// Redo the last undone change. Returns true if a state was restored.
    pub fn redo(&mut self) -> bool {
        match self.history.redo() {
            Some(state) => {
                self.state = state;
                true
            }
            None => false,
        }
    }

    /// Check if undo is available.
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    /// Check if redo is available.
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Number of history entries (for UI badges).
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Serialize the state to JSON for the host's persistence layer.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.state)
    }

    /// Build a drawing from the host's persisted JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        Ok(Self::from_state(serde_json::from_str(json)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::MAX_HISTORY;
    use crate::part::{PartMeta, PillarMeta, PillarType};
    use kurbo::Point;
    use std::collections::BTreeMap;

    fn pillar(counts: &[(PillarType, u32)]) -> Part {
        Part::new(
            Point::new(0.0, 0.0),
            PartMeta::Pillar(PillarMeta {
                pillar_counts: counts.iter().copied().collect(),
                pillar_type: None,
                quantity: None,
            }),
        )
    }

    fn pillar_counts(drawing: &Drawing, group: GroupId, part: PartId) -> BTreeMap<PillarType, u32> {
        let PartMeta::Pillar(meta) = &drawing
            .group(group)
            .unwrap()
            .part(part)
            .unwrap()
            .meta
        else {
            panic!("expected pillar");
        };
        meta.pillar_counts.clone()
    }

    #[test]
    fn test_n_mutations_n_undos_return_to_initial() {
        let mut drawing = Drawing::new();
        let initial = drawing.state().clone();

        for i in 0..4 {
            drawing.add_group(Group::new(format!("g{i}")));
        }
        for _ in 0..4 {
            assert!(drawing.undo());
        }

        assert_eq!(drawing.state(), &initial);
        assert!(!drawing.undo());

        for _ in 0..4 {
            assert!(drawing.redo());
        }
        assert_eq!(drawing.groups().len(), 4);
    }

    #[test]
    fn test_history_cap_after_sixty_mutations() {
        let mut drawing = Drawing::new();
        for i in 0..60 {
            drawing.add_group(Group::new(format!("g{i}")));
        }

        assert_eq!(drawing.history_len(), MAX_HISTORY);
        // Walking back stops at the oldest surviving snapshot, which has
        // the first 11 groups already applied.
        while drawing.undo() {}
        assert_eq!(drawing.groups().len(), 11);
    }

    #[test]
    fn test_new_mutation_discards_redo_branch() {
        let mut drawing = Drawing::new();
        drawing.add_group(Group::new("a"));
        drawing.add_group(Group::new("b"));

        assert!(drawing.undo());
        drawing.add_group(Group::new("c"));

        assert!(!drawing.can_redo());
        assert!(!drawing.redo());
        let names: Vec<_> = drawing.groups().iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, ["a", "c"]);
    }

    #[test]
    fn test_update_stale_group_is_noop() {
        let mut drawing = Drawing::new();
        let entries = drawing.history_len();
        drawing.update_group(uuid::Uuid::new_v4(), GroupUpdate::default());
        assert_eq!(drawing.history_len(), entries);
    }

    #[test]
    fn test_selected_scope_touches_only_selected() {
        let mut drawing = Drawing::new();
        let mut group = Group::new("g");
        let p1 = pillar(&[]);
        let p2 = pillar(&[]);
        let (id1, id2) = (p1.id, p2.id);
        group.insert_part(p1);
        group.insert_part(p2);
        let gid = group.id;
        drawing.add_group(group);

        drawing.select([PartKey::new(gid, id1)]);
        let values = BulkValues::Pillar([(PillarType::A, 2)].into_iter().collect());
        drawing.bulk_edit(BulkScope::Selected, MergeMode::Replace, &values);

        assert_eq!(pillar_counts(&drawing, gid, id1).get(&PillarType::A), Some(&2));
        assert!(pillar_counts(&drawing, gid, id2).is_empty());
        // Selected-scope bulk edits clear the selection.
        assert!(drawing.selection().is_empty());
    }

    #[test]
    fn test_all_scope_touches_every_matching_part() {
        let mut drawing = Drawing::new();
        let mut g1 = Group::new("g1");
        let mut g2 = Group::new("g2");
        let p1 = pillar(&[]);
        let p2 = pillar(&[]);
        let (id1, id2) = (p1.id, p2.id);
        g1.insert_part(p1);
        g2.insert_part(p2);
        let (gid1, gid2) = (g1.id, g2.id);
        drawing.add_group(g1);
        drawing.add_group(g2);

        let values = BulkValues::Pillar([(PillarType::B, 1)].into_iter().collect());
        drawing.bulk_edit(BulkScope::All, MergeMode::Replace, &values);

        assert_eq!(pillar_counts(&drawing, gid1, id1).get(&PillarType::B), Some(&1));
        assert_eq!(pillar_counts(&drawing, gid2, id2).get(&PillarType::B), Some(&1));
    }

    #[test]
    fn test_bulk_edit_pushes_history_once() {
        let mut drawing = Drawing::new();
        let mut group = Group::new("g");
        for _ in 0..5 {
            group.insert_part(pillar(&[]));
        }
        drawing.add_group(group);
        let before = drawing.history_len();

        let values = BulkValues::Pillar([(PillarType::A, 1)].into_iter().collect());
        drawing.bulk_edit(BulkScope::All, MergeMode::Replace, &values);

        assert_eq!(drawing.history_len(), before + 1);
    }

    #[test]
    fn test_replace_zero_removes_category_through_model() {
        let mut drawing = Drawing::new();
        let mut group = Group::new("g");
        let part = pillar(&[(PillarType::A, 3)]);
        let pid = part.id;
        group.insert_part(part);
        let gid = group.id;
        drawing.add_group(group);

        let values = BulkValues::Pillar([(PillarType::A, 0)].into_iter().collect());
        drawing.bulk_edit(BulkScope::All, MergeMode::Replace, &values);

        assert!(!pillar_counts(&drawing, gid, pid).contains_key(&PillarType::A));
    }

    #[test]
    fn test_memo_removal_clears_selection() {
        let mut drawing = Drawing::new();
        let memo = Memo::new(Point::new(0.0, 0.0), "note");
        let id = memo.id;
        drawing.add_memo(memo);
        drawing.toggle_selected_memo(id);
        assert!(drawing.selection().contains_memo(id));

        drawing.remove_memo(id);

        assert!(drawing.memos().is_empty());
        assert!(!drawing.selection().contains_memo(id));
    }

    #[test]
    fn test_update_memo_bumps_timestamp_and_commits() {
        let mut drawing = Drawing::new();
        let memo = Memo::new(Point::new(0.0, 0.0), "old");
        let id = memo.id;
        drawing.add_memo(memo);
        let entries = drawing.history_len();

        drawing.update_memo(id, |m| m.text = "new".to_string());

        assert_eq!(drawing.memo(id).unwrap().text, "new");
        assert_eq!(drawing.history_len(), entries + 1);
    }

    #[test]
    fn test_remove_group_drops_its_selection_keys() {
        let mut drawing = Drawing::new();
        let mut group = Group::new("g");
        let part = pillar(&[]);
        let pid = part.id;
        group.insert_part(part);
        let gid = group.id;
        drawing.add_group(group);
        drawing.select([PartKey::new(gid, pid)]);

        drawing.remove_group(gid);

        assert!(drawing.selection().is_empty());
        assert!(drawing.groups().is_empty());
    }

    #[test]
    fn test_json_round_trip() {
        let mut drawing = Drawing::new();
        let mut group = Group::new("g");
        group.insert_part(pillar(&[(PillarType::C, 2)]));
        drawing.add_group(group);
        drawing.add_memo(Memo::new(Point::new(5.0, 5.0), "note"));

        let json = drawing.to_json().unwrap();
        let back = Drawing::from_json(&json).unwrap();

        assert_eq!(back.state(), drawing.state());
    }
}
