//! Drawing groups: independent containers of parts.

use crate::part::{Part, PartId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for groups.
pub type GroupId = Uuid;

/// An independent drawing unit owning an ordered list of parts.
///
/// Part ids are unique within a group; a part's full identity is the
/// `group:part` pair (see [`crate::selection::PartKey`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    parts: Vec<Part>,
}

impl Group {
    /// Create a new empty group.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            parts: Vec::new(),
        }
    }

    /// The parts in insertion order.
    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    /// Get a part by id.
    pub fn part(&self, id: PartId) -> Option<&Part> {
        self.parts.iter().find(|p| p.id == id)
    }

    /// Add a part. A part with the same id replaces the existing entry in
    /// place, keeping ids unique within the group.
    pub fn insert_part(&mut self, mut part: Part) {
        part.meta.normalize();
        if let Some(slot) = self.parts.iter_mut().find(|p| p.id == part.id) {
            *slot = part;
        } else {
            self.parts.push(part);
        }
    }

    /// Remove a part by id. Returns the removed part, or `None` for a stale id.
    pub fn remove_part(&mut self, id: PartId) -> Option<Part> {
        let index = self.parts.iter().position(|p| p.id == id)?;
        Some(self.parts.remove(index))
    }

    /// Rebuild the part list, applying `f` to every part whose id satisfies
    /// `filter`. Updated parts are re-normalized. Returns how many parts
    /// were touched.
    pub fn map_parts<F, P>(&mut self, filter: P, f: F) -> usize
    where
        P: Fn(&Part) -> bool,
        F: Fn(&mut Part),
    {
        let mut touched = 0;
        self.parts = std::mem::take(&mut self.parts)
            .into_iter()
            .map(|mut part| {
                if filter(&part) {
                    f(&mut part);
                    part.meta.normalize();
                    touched += 1;
                }
                part
            })
            .collect();
        touched
    }

    /// Replace the whole part list. Parts are normalized and deduplicated
    /// by id on the way in.
    pub fn set_parts(&mut self, parts: Vec<Part>) {
        self.parts.clear();
        for part in parts {
            self.insert_part(part);
        }
    }

    /// Check if the group has no parts.
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Get the number of parts.
    pub fn len(&self) -> usize {
        self.parts.len()
    }
}

/// Partial update for a group, applied by `Drawing::update_group`.
#[derive(Debug, Clone, Default)]
pub struct GroupUpdate {
    /// New display name, if set.
    pub name: Option<String>,
    /// Full replacement part list, if set. Parts are re-normalized.
    pub parts: Option<Vec<Part>>,
}
