//! Bulk-edit semantics: scoped, mode-aware batch mutations.

use crate::part::{PanelSize, PartKind, PartMeta, PillarType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Which parts a bulk edit targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BulkScope {
    /// Only parts whose key is in the current selection.
    Selected,
    /// Every part of the matching type across every group.
    All,
}

/// How a bulk value combines with the prior value per category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MergeMode {
    /// The new value supersedes any prior value. A value of 0 removes the
    /// category entirely (the normalization rule: absent, not zero).
    Replace,
    /// The new value is summed with the prior value, floored at 0. A value
    /// of 0 is a pure no-op, not a reset.
    Add,
}

/// Values for one bulk action, one variant per bulk-editable attribute.
/// Inputs are signed so `Add` can decrement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BulkValues {
    /// Per-category pillar quantities.
    Pillar(BTreeMap<PillarType, i32>),
    /// Bracket quantity.
    Bracket { quantity: i32 },
    /// Anti-slip panel per-size quantities and/or level count.
    AntiPanel {
        counts: BTreeMap<PanelSize, i32>,
        levels: Option<i32>,
    },
}

impl BulkValues {
    /// The part type this bulk action targets.
    pub fn target_kind(&self) -> PartKind {
        match self {
            BulkValues::Pillar(_) => PartKind::Pillar,
            BulkValues::Bracket { .. } => PartKind::Bracket,
            BulkValues::AntiPanel { .. } => PartKind::AntiPanel,
        }
    }

    /// Apply this bulk action to one part's metadata.
    ///
    /// The caller is responsible for only passing metas of the matching
    /// type; anything else is left untouched.
    pub fn apply(&self, meta: &mut PartMeta, mode: MergeMode) {
        match (self, meta) {
            (BulkValues::Pillar(values), PartMeta::Pillar(pillar)) => {
                // Merge on top of the migrated representation.
                let mut probe = PartMeta::Pillar(std::mem::take(pillar));
                probe.normalize();
                let PartMeta::Pillar(mut migrated) = probe else {
                    unreachable!()
                };
                for (category, &value) in values {
                    merge_count(&mut migrated.pillar_counts, *category, value, mode);
                }
                *pillar = migrated;
            }
            (BulkValues::Bracket { quantity }, PartMeta::Bracket(bracket)) => {
                bracket.quantity = merge_scalar(bracket.quantity, *quantity, mode);
            }
            (
                BulkValues::AntiPanel { counts, levels },
                PartMeta::AntiPanel(panel),
            ) => {
                for (size, &value) in counts {
                    merge_count(&mut panel.counts, *size, value, mode);
                }
                if let Some(levels) = levels {
                    panel.levels = match mode {
                        MergeMode::Replace => (*levels).max(0) as u32,
                        MergeMode::Add if *levels == 0 => panel.levels,
                        MergeMode::Add => (panel.levels as i32 + levels).max(0) as u32,
                    };
                }
            }
            _ => {}
        }
    }
}

/// Merge one category's value into a count map.
fn merge_count<K: Ord + Copy>(
    map: &mut BTreeMap<K, u32>,
    key: K,
    value: i32,
    mode: MergeMode,
) {
    match mode {
        MergeMode::Replace => {
            if value <= 0 {
                map.remove(&key);
            } else {
                map.insert(key, value as u32);
            }
        }
        MergeMode::Add => {
            if value == 0 {
                return;
            }
            let prior = map.get(&key).copied().unwrap_or(0) as i32;
            let next = (prior + value).max(0);
            if next == 0 {
                map.remove(&key);
            } else {
                map.insert(key, next as u32);
            }
        }
    }
}

/// Merge a scalar optional quantity (absent means zero).
fn merge_scalar(prior: Option<u32>, value: i32, mode: MergeMode) -> Option<u32> {
    match mode {
        MergeMode::Replace => (value > 0).then_some(value as u32),
        MergeMode::Add => {
            if value == 0 {
                return prior;
            }
            let next = (prior.unwrap_or(0) as i32 + value).max(0);
            (next > 0).then_some(next as u32)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::part::{BracketMeta, PillarMeta};

    fn pillar_meta(counts: &[(PillarType, u32)]) -> PartMeta {
        PartMeta::Pillar(PillarMeta {
            pillar_counts: counts.iter().copied().collect(),
            pillar_type: None,
            quantity: None,
        })
    }

    fn counts_of(meta: &PartMeta) -> &BTreeMap<PillarType, u32> {
        let PartMeta::Pillar(pillar) = meta else {
            panic!("expected pillar");
        };
        &pillar.pillar_counts
    }

    #[test]
    fn test_replace_is_idempotent() {
        let mut meta = pillar_meta(&[(PillarType::A, 5)]);
        let values = BulkValues::Pillar([(PillarType::A, 2)].into_iter().collect());

        values.apply(&mut meta, MergeMode::Replace);
        let once = meta.clone();
        values.apply(&mut meta, MergeMode::Replace);

        assert_eq!(meta, once);
        assert_eq!(counts_of(&meta).get(&PillarType::A), Some(&2));
    }

    #[test]
    fn test_add_accumulates() {
        let mut meta = pillar_meta(&[(PillarType::A, 1)]);
        let values = BulkValues::Pillar([(PillarType::A, 3)].into_iter().collect());

        values.apply(&mut meta, MergeMode::Add);
        values.apply(&mut meta, MergeMode::Add);

        assert_eq!(counts_of(&meta).get(&PillarType::A), Some(&7));
    }

    #[test]
    fn test_add_floors_at_zero_and_removes() {
        let mut meta = pillar_meta(&[(PillarType::A, 3)]);
        let values = BulkValues::Pillar([(PillarType::A, -10)].into_iter().collect());

        values.apply(&mut meta, MergeMode::Add);

        assert!(!counts_of(&meta).contains_key(&PillarType::A));
    }

    #[test]
    fn test_add_zero_is_noop() {
        let mut meta = pillar_meta(&[(PillarType::A, 3)]);
        let before = meta.clone();
        let values = BulkValues::Pillar([(PillarType::A, 0)].into_iter().collect());

        values.apply(&mut meta, MergeMode::Add);

        assert_eq!(meta, before);
    }

    #[test]
    fn test_replace_zero_removes_category() {
        let mut meta = pillar_meta(&[(PillarType::A, 3), (PillarType::B, 1)]);
        let values = BulkValues::Pillar([(PillarType::A, 0)].into_iter().collect());

        values.apply(&mut meta, MergeMode::Replace);

        assert!(!counts_of(&meta).contains_key(&PillarType::A));
        assert_eq!(counts_of(&meta).get(&PillarType::B), Some(&1));
    }

    #[test]
    fn test_pillar_apply_migrates_legacy_first() {
        let mut meta = PartMeta::Pillar(PillarMeta {
            pillar_counts: BTreeMap::new(),
            pillar_type: Some(PillarType::A),
            quantity: Some(2),
        });
        let values = BulkValues::Pillar([(PillarType::A, 1)].into_iter().collect());

        values.apply(&mut meta, MergeMode::Add);

        assert_eq!(counts_of(&meta).get(&PillarType::A), Some(&3));
        let PartMeta::Pillar(pillar) = &meta else {
            panic!("expected pillar");
        };
        assert!(pillar.pillar_type.is_none());
    }

    #[test]
    fn test_bracket_scalar_merge() {
        let mut meta = PartMeta::Bracket(BracketMeta::default());
        BulkValues::Bracket { quantity: 4 }.apply(&mut meta, MergeMode::Replace);
        BulkValues::Bracket { quantity: -1 }.apply(&mut meta, MergeMode::Add);

        let PartMeta::Bracket(bracket) = &meta else {
            panic!("expected bracket");
        };
        assert_eq!(bracket.quantity, Some(3));

        BulkValues::Bracket { quantity: 0 }.apply(&mut meta, MergeMode::Replace);
        let PartMeta::Bracket(bracket) = &meta else {
            panic!("expected bracket");
        };
        assert!(bracket.quantity.is_none());
    }

    #[test]
    fn test_mismatched_kind_untouched() {
        let mut meta = PartMeta::Bracket(BracketMeta::default());
        let before = meta.clone();
        let values = BulkValues::Pillar([(PillarType::A, 2)].into_iter().collect());

        values.apply(&mut meta, MergeMode::Replace);

        assert_eq!(meta, before);
    }
}
