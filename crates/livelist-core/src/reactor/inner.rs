//! Translation of changes inside one segment.

use livelist_model::{
    ChangeEvent, ListChange, LiveListError, Result, SequenceChange, Transaction, check_range,
};
use tracing::debug;

use crate::cache::SegmentCache;
use crate::sequence::SequenceId;

/// Translate one inner batch of the sequence `id` into a single transaction.
///
/// The segment's position is looked up by identity for every record, since
/// the outer order may have changed since the listener was attached. A
/// sequence occupying several positions is translated for each of them,
/// lowest position first.
pub(crate) fn translate<E: Clone>(
    cache: &mut SegmentCache<E>,
    id: SequenceId,
    change: &SequenceChange<E>,
) -> Result<Transaction<E>> {
    let positions = cache.positions_of(id);
    if positions.is_empty() {
        return Err(LiveListError::precondition(format!(
            "{id} reported a change but is not tracked"
        )));
    }
    let mut transaction = Transaction::new();
    for record in change {
        for &position in &positions {
            translate_record(cache, position, record, &mut transaction)?;
        }
    }
    debug!(
        sequence = %id,
        occurrences = positions.len(),
        records = change.len(),
        events = transaction.len(),
        "segment changed"
    );
    Ok(transaction)
}

fn translate_record<E: Clone>(
    cache: &mut SegmentCache<E>,
    position: usize,
    record: &ListChange<E>,
    transaction: &mut Transaction<E>,
) -> Result<()> {
    let base = cache.first_index(position)?;
    let old = record.old_range();
    check_range(old.start, old.end, cache.snapshot(position)?.len())?;

    match record {
        ListChange::Permutation { from, permutation } => {
            transaction.push(ChangeEvent::permutation(base + from, permutation.clone())?);
        }
        ListChange::Update { from, values } => {
            for (offset, value) in values.iter().enumerate() {
                transaction.push(ChangeEvent::update(
                    base + from + offset,
                    vec![value.clone()],
                )?);
            }
        }
        ListChange::Structural {
            from,
            removed,
            added,
        } => {
            if !removed.is_empty() {
                transaction.push(ChangeEvent::removal(base + from, removed.clone())?);
            }
            if !added.is_empty() {
                transaction.push(ChangeEvent::insertion(base + from, added.clone())?);
            }
        }
    }

    record.apply_to(cache.snapshot_mut(position)?)
}
