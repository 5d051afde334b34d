//! Change events expressed in concatenated-view coordinates.

use std::fmt;
use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::error::{LiveListError, Result, check_permutation, check_range};

/// Kind of a [`ChangeEvent`], used for logging and summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Initialization,
    Insertion,
    Removal,
    Update,
    Permutation,
}

impl ChangeKind {
    /// Get display label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Initialization => "init",
            Self::Insertion => "insert",
            Self::Removal => "remove",
            Self::Update => "update",
            Self::Permutation => "permute",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A single change of the concatenated view.
///
/// Every variant covers a contiguous index range of the view as it was when
/// the event was produced. Events inside a [`Transaction`] apply in order, so
/// each event's coordinates already account for the events before it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ChangeEvent<E> {
    /// The view was populated with `elements`, covering `[0, elements.len())`.
    Initialization { elements: Vec<E> },
    /// `added` was inserted at `[from, from + added.len())`.
    Insertion { from: usize, added: Vec<E> },
    /// `removed` was taken out of `[from, from + removed.len())`.
    Removal { from: usize, removed: Vec<E> },
    /// Elements at `[from, from + values.len())` were replaced in place by `values`.
    Update { from: usize, values: Vec<E> },
    /// Elements in `[from, from + permutation.len())` were reordered.
    ///
    /// `permutation[i]` is the new position, relative to `from`, of the
    /// element previously at `from + i`.
    Permutation { from: usize, permutation: Vec<usize> },
}

impl<E> ChangeEvent<E> {
    /// Create an Initialization event.
    pub fn initialization(elements: Vec<E>) -> Self {
        Self::Initialization { elements }
    }

    /// Create an Insertion event; `added` must not be empty.
    pub fn insertion(from: usize, added: Vec<E>) -> Result<Self> {
        non_empty("insertion", added.len())?;
        Ok(Self::Insertion { from, added })
    }

    /// Create a Removal event; `removed` must not be empty.
    pub fn removal(from: usize, removed: Vec<E>) -> Result<Self> {
        non_empty("removal", removed.len())?;
        Ok(Self::Removal { from, removed })
    }

    /// Create an Update event; `values` must not be empty.
    pub fn update(from: usize, values: Vec<E>) -> Result<Self> {
        non_empty("update", values.len())?;
        Ok(Self::Update { from, values })
    }

    /// Create a Permutation event; `permutation` must be a non-empty bijection.
    pub fn permutation(from: usize, permutation: Vec<usize>) -> Result<Self> {
        non_empty("permutation", permutation.len())?;
        check_permutation(&permutation)?;
        Ok(Self::Permutation { from, permutation })
    }

    /// Kind of this event.
    pub fn kind(&self) -> ChangeKind {
        match self {
            Self::Initialization { .. } => ChangeKind::Initialization,
            Self::Insertion { .. } => ChangeKind::Insertion,
            Self::Removal { .. } => ChangeKind::Removal,
            Self::Update { .. } => ChangeKind::Update,
            Self::Permutation { .. } => ChangeKind::Permutation,
        }
    }

    /// View index range covered by this event.
    pub fn range(&self) -> Range<usize> {
        match self {
            Self::Initialization { elements } => 0..elements.len(),
            Self::Insertion { from, added } => *from..*from + added.len(),
            Self::Removal { from, removed } => *from..*from + removed.len(),
            Self::Update { from, values } => *from..*from + values.len(),
            Self::Permutation { from, permutation } => *from..*from + permutation.len(),
        }
    }

    /// Change in view size caused by this event, relative to the size before it.
    ///
    /// Initialization reports the populated size.
    pub fn size_delta(&self) -> isize {
        match self {
            Self::Initialization { elements } => elements.len() as isize,
            Self::Insertion { added, .. } => added.len() as isize,
            Self::Removal { removed, .. } => -(removed.len() as isize),
            Self::Update { .. } | Self::Permutation { .. } => 0,
        }
    }
}

impl<E: Clone> ChangeEvent<E> {
    /// Replay this event onto a materialized copy of the view.
    pub fn apply_to(&self, mirror: &mut Vec<E>) -> Result<()> {
        match self {
            Self::Initialization { elements } => {
                mirror.clear();
                mirror.extend(elements.iter().cloned());
            }
            Self::Insertion { from, added } => {
                check_range(*from, *from, mirror.len())?;
                mirror.splice(*from..*from, added.iter().cloned());
            }
            Self::Removal { from, .. } => {
                let range = self.range();
                check_range(*from, range.end, mirror.len())?;
                mirror.drain(range);
            }
            Self::Update { from, values } => {
                let range = self.range();
                check_range(*from, range.end, mirror.len())?;
                for (slot, value) in mirror[range].iter_mut().zip(values) {
                    *slot = value.clone();
                }
            }
            Self::Permutation { from, permutation } => {
                let range = self.range();
                check_range(*from, range.end, mirror.len())?;
                let before: Vec<E> = mirror[range.clone()].to_vec();
                for (old, &new) in permutation.iter().enumerate() {
                    mirror[from + new] = before[old].clone();
                }
            }
        }
        Ok(())
    }
}

fn non_empty(kind: &str, len: usize) -> Result<()> {
    if len == 0 {
        Err(LiveListError::precondition(format!(
            "{kind} event must cover at least one element"
        )))
    } else {
        Ok(())
    }
}

/// An ordered group of events delivered between begin/end markers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transaction<E> {
    events: Vec<ChangeEvent<E>>,
}

impl<E> Default for Transaction<E> {
    fn default() -> Self {
        Self { events: Vec::new() }
    }
}

impl<E> Transaction<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: ChangeEvent<E>) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[ChangeEvent<E>] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ChangeEvent<E>> {
        self.events.iter()
    }

    /// Count events of the given kind.
    pub fn count(&self, kind: ChangeKind) -> usize {
        self.events.iter().filter(|e| e.kind() == kind).count()
    }

    /// Net change in view size across the whole transaction.
    pub fn size_delta(&self) -> isize {
        self.events
            .iter()
            .filter(|e| e.kind() != ChangeKind::Initialization)
            .map(ChangeEvent::size_delta)
            .sum()
    }
}

impl<E: Clone> Transaction<E> {
    /// Replay every event in order onto a materialized copy of the view.
    pub fn apply_to(&self, mirror: &mut Vec<E>) -> Result<()> {
        for event in &self.events {
            event.apply_to(mirror)?;
        }
        Ok(())
    }
}

impl<E> From<Vec<ChangeEvent<E>>> for Transaction<E> {
    fn from(events: Vec<ChangeEvent<E>>) -> Self {
        Self { events }
    }
}

impl<E> IntoIterator for Transaction<E> {
    type Item = ChangeEvent<E>;
    type IntoIter = std::vec::IntoIter<ChangeEvent<E>>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.into_iter()
    }
}

impl<'a, E> IntoIterator for &'a Transaction<E> {
    type Item = &'a ChangeEvent<E>;
    type IntoIter = std::slice::Iter<'a, ChangeEvent<E>>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_reject_empty_ranges() {
        assert!(ChangeEvent::<char>::insertion(0, vec![]).is_err());
        assert!(ChangeEvent::<char>::removal(0, vec![]).is_err());
        assert!(ChangeEvent::<char>::update(0, vec![]).is_err());
        assert!(ChangeEvent::<char>::permutation(0, vec![]).is_err());
        assert!(ChangeEvent::<char>::permutation(0, vec![1, 1]).is_err());
    }

    #[test]
    fn ranges_follow_payload_length() {
        let event = ChangeEvent::removal(2, vec!['c', 'd', 'e']).unwrap();
        assert_eq!(event.range(), 2..5);
        assert_eq!(event.kind(), ChangeKind::Removal);
        assert_eq!(event.size_delta(), -3);

        let event = ChangeEvent::<char>::permutation(1, vec![1, 0]).unwrap();
        assert_eq!(event.range(), 1..3);
    }

    #[test]
    fn permutation_replays_relative_positions() {
        let mut mirror = vec!['a', 'b', 'c', 'x', 'y'];
        let event = ChangeEvent::permutation(0, vec![2, 3, 4, 0, 1]).unwrap();
        event.apply_to(&mut mirror).unwrap();
        assert_eq!(mirror, vec!['x', 'y', 'a', 'b', 'c']);

        let mut mirror = vec!['q', 'a', 'b', 'c'];
        let event = ChangeEvent::permutation(1, vec![2, 0, 1]).unwrap();
        event.apply_to(&mut mirror).unwrap();
        assert_eq!(mirror, vec!['q', 'b', 'c', 'a']);
    }

    #[test]
    fn transaction_replays_in_order() {
        let mut mirror = vec![1, 2, 3, 4];
        let tx = Transaction::from(vec![
            ChangeEvent::update(0, vec![10]).unwrap(),
            ChangeEvent::update(1, vec![20]).unwrap(),
            ChangeEvent::removal(2, vec![3, 4]).unwrap(),
            ChangeEvent::insertion(0, vec![0]).unwrap(),
        ]);
        tx.apply_to(&mut mirror).unwrap();
        assert_eq!(mirror, vec![0, 10, 20]);
        assert_eq!(tx.count(ChangeKind::Update), 2);
        assert_eq!(tx.size_delta(), -1);
    }

    #[test]
    fn replay_rejects_out_of_bounds_events() {
        let mut mirror = vec![1, 2];
        let event = ChangeEvent::removal(1, vec![2, 3]).unwrap();
        assert!(event.apply_to(&mut mirror).is_err());
        let event = ChangeEvent::insertion(3, vec![9]).unwrap();
        assert!(event.apply_to(&mut mirror).is_err());
    }
}
