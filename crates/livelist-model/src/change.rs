//! Change records emitted by an observable sequence about its own elements.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::error::{Result, check_permutation, check_range};

/// One step of a sequence mutation, in the sequence's local coordinates.
///
/// A record's indices refer to the sequence as left by the previous record of
/// the same [`SequenceChange`] batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ListChange<T> {
    /// Elements in `[from, from + permutation.len())` were reordered;
    /// `permutation[i]` is the new position, relative to `from`, of the
    /// element previously at `from + i`.
    Permutation { from: usize, permutation: Vec<usize> },
    /// Elements at `[from, from + values.len())` were replaced by `values`.
    Update { from: usize, values: Vec<T> },
    /// `removed` was taken out at `from`, then `added` was inserted there.
    Structural {
        from: usize,
        removed: Vec<T>,
        added: Vec<T>,
    },
}

impl<T> ListChange<T> {
    pub fn from(&self) -> usize {
        match self {
            Self::Permutation { from, .. }
            | Self::Update { from, .. }
            | Self::Structural { from, .. } => *from,
        }
    }

    /// Local range affected before the change was applied.
    pub fn old_range(&self) -> Range<usize> {
        let from = self.from();
        match self {
            Self::Permutation { permutation, .. } => from..from + permutation.len(),
            Self::Update { values, .. } => from..from + values.len(),
            Self::Structural { removed, .. } => from..from + removed.len(),
        }
    }

    /// Local range affected after the change was applied.
    pub fn new_range(&self) -> Range<usize> {
        let from = self.from();
        match self {
            Self::Structural { added, .. } => from..from + added.len(),
            _ => self.old_range(),
        }
    }

    /// True if applying this record changes nothing.
    pub fn is_noop(&self) -> bool {
        match self {
            Self::Permutation { permutation, .. } => {
                permutation.iter().enumerate().all(|(i, &p)| i == p)
            }
            Self::Update { values, .. } => values.is_empty(),
            Self::Structural { removed, added, .. } => removed.is_empty() && added.is_empty(),
        }
    }
}

impl<T: Clone> ListChange<T> {
    /// Apply this record to a local copy of the sequence.
    pub fn apply_to(&self, items: &mut Vec<T>) -> Result<()> {
        let old = self.old_range();
        check_range(old.start, old.end, items.len())?;
        match self {
            Self::Permutation { from, permutation } => {
                check_permutation(permutation)?;
                let before: Vec<T> = items[old].to_vec();
                for (position, &target) in permutation.iter().enumerate() {
                    items[from + target] = before[position].clone();
                }
            }
            Self::Update { values, .. } => {
                for (slot, value) in items[old].iter_mut().zip(values) {
                    *slot = value.clone();
                }
            }
            Self::Structural { added, .. } => {
                items.splice(old, added.iter().cloned());
            }
        }
        Ok(())
    }
}

/// An ordered batch of records produced by a single mutation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SequenceChange<T> {
    changes: Vec<ListChange<T>>,
}

impl<T> Default for SequenceChange<T> {
    fn default() -> Self {
        Self {
            changes: Vec::new(),
        }
    }
}

impl<T> SequenceChange<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record, dropping records that change nothing.
    pub fn push(&mut self, change: ListChange<T>) {
        if !change.is_noop() {
            self.changes.push(change);
        }
    }

    pub fn changes(&self) -> &[ListChange<T>] {
        &self.changes
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ListChange<T>> {
        self.changes.iter()
    }
}

impl<T: Clone> SequenceChange<T> {
    /// Apply every record in order to a local copy of the sequence.
    pub fn apply_to(&self, items: &mut Vec<T>) -> Result<()> {
        for change in &self.changes {
            change.apply_to(items)?;
        }
        Ok(())
    }
}

impl<'a, T> IntoIterator for &'a SequenceChange<T> {
    type Item = &'a ListChange<T>;
    type IntoIter = std::slice::Iter<'a, ListChange<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.iter()
    }
}
