//! Translation of changes to the list of segments itself.

use livelist_model::{
    ChangeEvent, ListChange, LiveListError, Result, SequenceChange, Transaction,
    check_permutation, check_range,
};
use tracing::debug;

use crate::cache::SegmentCache;
use crate::registry::ListenerRegistry;
use crate::sequence::Sequence;
use crate::translate;

/// Translate one outer batch into a single transaction, updating the cache
/// and the inner listener registrations as each record is processed.
pub(crate) fn translate<E: Clone + 'static>(
    cache: &mut SegmentCache<E>,
    registry: &mut ListenerRegistry<E>,
    change: &SequenceChange<Sequence<E>>,
) -> Result<Transaction<E>> {
    let mut transaction = Transaction::new();
    for record in change {
        match record {
            ListChange::Permutation { from, permutation } => {
                permute(cache, *from, permutation, &mut transaction)?;
            }
            ListChange::Update { from, values } => {
                replace(cache, registry, *from, values, &mut transaction)?;
            }
            ListChange::Structural {
                from,
                removed,
                added,
            } => {
                remove_segments(cache, registry, *from, removed, &mut transaction)?;
                insert_segments(cache, registry, *from, added, &mut transaction)?;
            }
        }
    }
    Ok(transaction)
}

/// Segments `[from, from + permutation.len())` were reordered.
///
/// Each element keeps its offset inside its segment, so its new view index
/// is the new start of its segment plus that offset. Elements are relocated
/// by position, never by comparing values.
fn permute<E: Clone>(
    cache: &mut SegmentCache<E>,
    from: usize,
    permutation: &[usize],
    transaction: &mut Transaction<E>,
) -> Result<()> {
    let to = from + permutation.len();
    check_range(from, to, cache.len())?;
    check_permutation(permutation)?;
    if permutation.is_empty() {
        return Ok(());
    }

    let view_from = cache.first_index(from)?;
    let view_to = cache.last_index_exclusive(to - 1)?;
    let old_lengths: Vec<usize> = cache.lengths().skip(from).take(permutation.len()).collect();
    let mut new_lengths = vec![0; permutation.len()];
    for (old, &new) in permutation.iter().enumerate() {
        new_lengths[new] = old_lengths[old];
    }
    let old_starts = translate::prefix_sums(old_lengths.iter().copied());
    let new_starts = translate::prefix_sums(new_lengths);

    let mut derived = vec![0; view_to - view_from];
    for (old, &new) in permutation.iter().enumerate() {
        for offset in 0..old_lengths[old] {
            derived[old_starts[old] + offset] = new_starts[new] + offset;
        }
    }

    cache.permute(from, permutation)?;
    let moved = derived.iter().enumerate().any(|(old, &new)| old != new);
    if moved {
        debug!(
            segments = permutation.len(),
            view_from,
            view_to,
            "segments permuted"
        );
        transaction.push(ChangeEvent::permutation(view_from, derived)?);
    }
    Ok(())
}

/// Segments at `[from, from + values.len())` were replaced by other sequences.
fn replace<E: Clone + 'static>(
    cache: &mut SegmentCache<E>,
    registry: &mut ListenerRegistry<E>,
    from: usize,
    values: &[Sequence<E>],
    transaction: &mut Transaction<E>,
) -> Result<()> {
    check_range(from, from + values.len(), cache.len())?;
    for (position, sequence) in (from..).zip(values) {
        let base = cache.first_index(position)?;
        let new_items = sequence.try_to_vec()?;
        let old_items = cache.snapshot(position)?;
        let overlap = old_items.len().min(new_items.len());

        for (offset, value) in new_items[..overlap].iter().enumerate() {
            transaction.push(ChangeEvent::update(base + offset, vec![value.clone()])?);
        }
        if old_items.len() > new_items.len() {
            let tail = old_items[overlap..].to_vec();
            transaction.push(ChangeEvent::removal(base + overlap, tail)?);
        } else if new_items.len() > old_items.len() {
            let tail = new_items[overlap..].to_vec();
            transaction.push(ChangeEvent::insertion(base + overlap, tail)?);
        }
        debug!(
            segment = position,
            old_len = old_items.len(),
            new_len = new_items.len(),
            "segment replaced"
        );

        registry.attach(sequence);
        let previous = cache.replace(position, sequence.clone(), new_items)?;
        registry.detach(previous.sequence.id());
    }
    Ok(())
}

/// Segments `removed` were taken out at `from`, highest position first so
/// offsets of the not-yet-removed segments stay valid.
fn remove_segments<E: Clone + 'static>(
    cache: &mut SegmentCache<E>,
    registry: &mut ListenerRegistry<E>,
    from: usize,
    removed: &[Sequence<E>],
    transaction: &mut Transaction<E>,
) -> Result<()> {
    check_range(from, from + removed.len(), cache.len())?;
    for (position, sequence) in (from..from + removed.len()).zip(removed).rev() {
        let tracked = cache.sequence(position)?;
        if tracked.id() != sequence.id() {
            return Err(LiveListError::precondition(format!(
                "removed segment {position} is {} but {} is tracked there",
                sequence.id(),
                tracked.id()
            )));
        }
        let base = cache.first_index(position)?;
        let entry = cache.remove(position)?;
        registry.detach(entry.sequence.id());
        debug!(segment = position, len = entry.snapshot.len(), "segment removed");
        if !entry.snapshot.is_empty() {
            transaction.push(ChangeEvent::removal(base, entry.snapshot)?);
        }
    }
    Ok(())
}

/// Segments `added` were inserted at `from`, lowest position first.
fn insert_segments<E: Clone + 'static>(
    cache: &mut SegmentCache<E>,
    registry: &mut ListenerRegistry<E>,
    from: usize,
    added: &[Sequence<E>],
    transaction: &mut Transaction<E>,
) -> Result<()> {
    check_range(from, from, cache.len())?;
    for (position, sequence) in (from..).zip(added) {
        let base = cache.first_index(position)?;
        let items = sequence.try_to_vec()?;
        debug!(segment = position, len = items.len(), "segment inserted");
        if !items.is_empty() {
            transaction.push(ChangeEvent::insertion(base, items.clone())?);
        }
        cache.insert(position, sequence.clone(), items)?;
        registry.attach(sequence);
    }
    Ok(())
}
