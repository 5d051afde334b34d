//! Per-segment snapshots of the concatenated sources.
//!
//! The cache mirrors the outer source: one entry per segment, in source
//! order, holding the segment's handle (for identity) and an owned copy of
//! the contents the last emitted event accounted for. Reactors compute event
//! ranges from these snapshots first and update them afterwards.

use livelist_model::{LiveListError, Result, check_index, check_permutation, check_range};

use crate::sequence::{Sequence, SequenceId, SourceOfSequences};
use crate::translate::{self, Location};

pub(crate) struct SegmentEntry<E> {
    pub(crate) sequence: Sequence<E>,
    pub(crate) snapshot: Vec<E>,
}

pub(crate) struct SegmentCache<E> {
    entries: Vec<SegmentEntry<E>>,
}

impl<E> Default for SegmentCache<E> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<E: Clone> SegmentCache<E> {
    /// Snapshot every segment currently in `source`.
    pub(crate) fn from_source(source: &SourceOfSequences<E>) -> Result<Self> {
        let entries = source
            .try_to_vec()?
            .into_iter()
            .map(|sequence| {
                let snapshot = sequence.try_to_vec()?;
                Ok(SegmentEntry { sequence, snapshot })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { entries })
    }

    pub(crate) fn element_at(&self, view_index: usize) -> Result<E> {
        let location = self.locate(view_index)?;
        Ok(self.entries[location.segment].snapshot[location.offset].clone())
    }

    pub(crate) fn flatten(&self) -> Vec<E> {
        self.entries
            .iter()
            .flat_map(|entry| entry.snapshot.iter().cloned())
            .collect()
    }

    /// Recompute the prefix-sum table from the live sources and compare it
    /// with the snapshot lengths.
    pub(crate) fn verify(&self, source: &SourceOfSequences<E>) -> Result<()> {
        let live = source.try_to_vec()?;
        if live.len() != self.entries.len() {
            return Err(LiveListError::precondition(format!(
                "source has {} segments, cache tracks {}",
                live.len(),
                self.entries.len()
            )));
        }
        let mut live_lengths = Vec::with_capacity(live.len());
        for (segment, (sequence, entry)) in live.iter().zip(&self.entries).enumerate() {
            if sequence.id() != entry.sequence.id() {
                return Err(LiveListError::precondition(format!(
                    "segment {segment} is {} in the source but {} in the cache",
                    sequence.id(),
                    entry.sequence.id()
                )));
            }
            live_lengths.push(sequence.try_len()?);
        }
        let expected = translate::prefix_sums(live_lengths);
        let actual = translate::prefix_sums(self.lengths());
        if expected != actual {
            return Err(LiveListError::precondition(format!(
                "prefix sums diverged: live {expected:?}, cached {actual:?}"
            )));
        }
        Ok(())
    }
}

impl<E> SegmentCache<E> {
    /// Number of segments.
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn lengths(&self) -> impl Iterator<Item = usize> + '_ {
        self.entries.iter().map(|entry| entry.snapshot.len())
    }

    pub(crate) fn total_len(&self) -> usize {
        translate::total(self.lengths())
    }

    /// First view index of `segment`; `segment == len()` gives the total.
    pub(crate) fn first_index(&self, segment: usize) -> Result<usize> {
        check_range(segment, segment, self.entries.len())?;
        Ok(translate::first_index(self.lengths(), segment))
    }

    pub(crate) fn last_index_exclusive(&self, segment: usize) -> Result<usize> {
        check_index(segment, self.entries.len())?;
        Ok(translate::last_index_exclusive(self.lengths(), segment))
    }

    pub(crate) fn locate(&self, view_index: usize) -> Result<Location> {
        translate::segment_of(self.lengths(), view_index)
    }

    pub(crate) fn sequence(&self, segment: usize) -> Result<&Sequence<E>> {
        check_index(segment, self.entries.len())?;
        Ok(&self.entries[segment].sequence)
    }

    pub(crate) fn snapshot(&self, segment: usize) -> Result<&[E]> {
        check_index(segment, self.entries.len())?;
        Ok(&self.entries[segment].snapshot)
    }

    pub(crate) fn snapshot_mut(&mut self, segment: usize) -> Result<&mut Vec<E>> {
        check_index(segment, self.entries.len())?;
        Ok(&mut self.entries[segment].snapshot)
    }

    /// Every segment position holding the sequence `id`, ascending.
    pub(crate) fn positions_of(&self, id: SequenceId) -> Vec<usize> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.sequence.id() == id)
            .map(|(position, _)| position)
            .collect()
    }

    pub(crate) fn insert(
        &mut self,
        segment: usize,
        sequence: Sequence<E>,
        snapshot: Vec<E>,
    ) -> Result<()> {
        check_range(segment, segment, self.entries.len())?;
        self.entries.insert(segment, SegmentEntry { sequence, snapshot });
        Ok(())
    }

    pub(crate) fn remove(&mut self, segment: usize) -> Result<SegmentEntry<E>> {
        check_index(segment, self.entries.len())?;
        Ok(self.entries.remove(segment))
    }

    pub(crate) fn replace(
        &mut self,
        segment: usize,
        sequence: Sequence<E>,
        snapshot: Vec<E>,
    ) -> Result<SegmentEntry<E>> {
        check_index(segment, self.entries.len())?;
        Ok(std::mem::replace(
            &mut self.entries[segment],
            SegmentEntry { sequence, snapshot },
        ))
    }

    /// Move the entry at `from + i` to `from + permutation[i]`.
    pub(crate) fn permute(&mut self, from: usize, permutation: &[usize]) -> Result<()> {
        check_range(from, from + permutation.len(), self.entries.len())?;
        check_permutation(permutation)?;
        let mut moved: Vec<Option<SegmentEntry<E>>> = self
            .entries
            .drain(from..from + permutation.len())
            .map(Some)
            .collect();
        let mut arranged: Vec<Option<SegmentEntry<E>>> =
            (0..permutation.len()).map(|_| None).collect();
        for (old, &new) in permutation.iter().enumerate() {
            arranged[new] = moved[old].take();
        }
        self.entries.splice(from..from, arranged.into_iter().flatten());
        Ok(())
    }

    pub(crate) fn sequences(&self) -> impl Iterator<Item = &Sequence<E>> + '_ {
        self.entries.iter().map(|entry| &entry.sequence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache(segments: &[&[char]]) -> (SourceOfSequences<char>, SegmentCache<char>) {
        let source: SourceOfSequences<char> = segments
            .iter()
            .map(|items| Sequence::from(items.to_vec()))
            .collect();
        let cache = SegmentCache::from_source(&source).unwrap();
        (source, cache)
    }

    #[test]
    fn element_at_walks_snapshots() {
        let (_, cache) = cache(&[&['a', 'b'], &[], &['c', 'd', 'e']]);
        assert_eq!(cache.total_len(), 5);
        assert_eq!(cache.element_at(2).unwrap(), 'c');
        assert_eq!(cache.element_at(4).unwrap(), 'e');
        assert!(cache.element_at(5).is_err());
        assert_eq!(cache.first_index(3).unwrap(), 5);
        assert!(cache.first_index(4).is_err());
        assert_eq!(cache.last_index_exclusive(1).unwrap(), 2);
    }

    #[test]
    fn permute_moves_entries() {
        let (_, mut cache) = cache(&[&['a'], &['b', 'c'], &['d']]);
        cache.permute(0, &[2, 0, 1]).unwrap();
        assert_eq!(cache.flatten(), vec!['b', 'c', 'd', 'a']);
        assert!(cache.permute(1, &[0, 1, 2]).is_err());
    }

    #[test]
    fn verify_detects_stale_snapshots() {
        let (source, cache) = cache(&[&['a'], &['b']]);
        assert!(cache.verify(&source).is_ok());
        source.get(1).unwrap().push('z').unwrap();
        assert!(matches!(
            cache.verify(&source),
            Err(LiveListError::PreconditionViolation { .. })
        ));
    }

    #[test]
    fn positions_of_finds_repeated_segments() {
        let shared = Sequence::from(vec!['x']);
        let source: SourceOfSequences<char> =
            Sequence::from(vec![shared.clone(), Sequence::from(vec!['y']), shared.clone()]);
        let cache = SegmentCache::from_source(&source).unwrap();
        assert_eq!(cache.positions_of(shared.id()), vec![0, 2]);
    }
}
