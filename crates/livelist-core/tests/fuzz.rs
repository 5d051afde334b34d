//! Randomized mutations of the source and its segments, one record at a
//! time and in multi-record `edit` batches.
//!
//! After every step the view must agree with a naive flatten of the live
//! sequences, and a subscriber replaying the events must hold the same list.

mod support;

use livelist_core::{Editor, Result, Sequence, translate};
use proptest::prelude::*;

use support::{Fixture, fixture, flatten};

#[derive(Debug, Clone)]
enum Op {
    InnerPush { segment: usize, value: u8 },
    InnerRemove { segment: usize, index: usize },
    InnerSet { segment: usize, index: usize, value: u8 },
    InnerSplice { segment: usize, at: usize, remove: usize, values: Vec<u8> },
    InnerReverse { segment: usize },
    InnerSort { segment: usize },
    OuterInsert { at: usize, values: Vec<u8> },
    OuterRemove { at: usize },
    OuterReplace { at: usize, values: Vec<u8> },
    OuterSwap { a: usize, b: usize },
    OuterReverse,
    OuterDuplicate { at: usize, segment: usize },
    OuterBatch(Vec<OuterOp>),
    InnerBatch { segment: usize, ops: Vec<InnerOp> },
}

/// One step of a batched edit of the source.
#[derive(Debug, Clone)]
enum OuterOp {
    SetEmpty { at: usize },
    Set { at: usize, values: Vec<u8> },
    Insert { at: usize, values: Vec<u8> },
    Remove { at: usize },
    Swap { a: usize, b: usize },
    Duplicate { at: usize, segment: usize },
}

/// One step of a batched edit of a single segment.
#[derive(Debug, Clone)]
enum InnerOp {
    Push(u8),
    Remove(usize),
    Set(usize, u8),
    Reverse,
}

fn values() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(0u8..8, 0..4)
}

fn outer_op() -> impl Strategy<Value = OuterOp> {
    let slot = 0usize..16;
    prop_oneof![
        slot.clone().prop_map(|at| OuterOp::SetEmpty { at }),
        (slot.clone(), values()).prop_map(|(at, values)| OuterOp::Set { at, values }),
        (slot.clone(), values()).prop_map(|(at, values)| OuterOp::Insert { at, values }),
        slot.clone().prop_map(|at| OuterOp::Remove { at }),
        (slot.clone(), slot.clone()).prop_map(|(a, b)| OuterOp::Swap { a, b }),
        (slot.clone(), slot).prop_map(|(at, segment)| OuterOp::Duplicate { at, segment }),
    ]
}

fn inner_op() -> impl Strategy<Value = InnerOp> {
    prop_oneof![
        any::<u8>().prop_map(InnerOp::Push),
        (0usize..16).prop_map(InnerOp::Remove),
        (0usize..16, any::<u8>()).prop_map(|(index, value)| InnerOp::Set(index, value)),
        Just(InnerOp::Reverse),
    ]
}

fn op() -> impl Strategy<Value = Op> {
    let slot = 0usize..16;
    prop_oneof![
        (slot.clone(), any::<u8>()).prop_map(|(segment, value)| Op::InnerPush { segment, value }),
        (slot.clone(), slot.clone())
            .prop_map(|(segment, index)| Op::InnerRemove { segment, index }),
        (slot.clone(), slot.clone(), any::<u8>())
            .prop_map(|(segment, index, value)| Op::InnerSet { segment, index, value }),
        (slot.clone(), slot.clone(), 0usize..3, values()).prop_map(
            |(segment, at, remove, values)| Op::InnerSplice {
                segment,
                at,
                remove,
                values,
            }
        ),
        slot.clone().prop_map(|segment| Op::InnerReverse { segment }),
        slot.clone().prop_map(|segment| Op::InnerSort { segment }),
        (slot.clone(), values()).prop_map(|(at, values)| Op::OuterInsert { at, values }),
        slot.clone().prop_map(|at| Op::OuterRemove { at }),
        (slot.clone(), values()).prop_map(|(at, values)| Op::OuterReplace { at, values }),
        (slot.clone(), slot.clone()).prop_map(|(a, b)| Op::OuterSwap { a, b }),
        Just(Op::OuterReverse),
        (slot.clone(), slot.clone())
            .prop_map(|(at, segment)| Op::OuterDuplicate { at, segment }),
        prop::collection::vec(outer_op(), 1..5).prop_map(Op::OuterBatch),
        (slot, prop::collection::vec(inner_op(), 1..5))
            .prop_map(|(segment, ops)| Op::InnerBatch { segment, ops }),
    ]
}

/// Pick a live segment by wrapping `slot` around the current segment count.
fn segment(fx: &Fixture<u8>, slot: usize) -> Option<Sequence<u8>> {
    let len = fx.source.len();
    if len == 0 {
        None
    } else {
        fx.source.get(slot % len)
    }
}

fn apply_outer(editor: &mut Editor<'_, Sequence<u8>>, op: &OuterOp) -> Result<()> {
    let len = editor.len();
    match op {
        OuterOp::SetEmpty { at } if len > 0 => editor.set(at % len, Sequence::new()).map(drop),
        OuterOp::Set { at, values } if len > 0 => editor
            .set(at % len, Sequence::from(values.clone()))
            .map(drop),
        OuterOp::Insert { at, values } => {
            editor.insert(at % (len + 1), Sequence::from(values.clone()))
        }
        OuterOp::Remove { at } if len > 0 => editor.remove(at % len).map(drop),
        OuterOp::Swap { a, b } if len > 0 => editor.swap(a % len, b % len),
        OuterOp::Duplicate { at, segment } if len > 0 => {
            let shared = editor.items()[segment % len].clone();
            editor.insert(at % (len + 1), shared)
        }
        _ => Ok(()),
    }
}

fn apply_inner(editor: &mut Editor<'_, u8>, op: &InnerOp) -> Result<()> {
    let len = editor.len();
    match *op {
        InnerOp::Push(value) => {
            editor.push(value);
            Ok(())
        }
        InnerOp::Remove(index) if len > 0 => editor.remove(index % len).map(drop),
        InnerOp::Set(index, value) if len > 0 => editor.set(index % len, value).map(drop),
        InnerOp::Reverse => {
            editor.reverse();
            Ok(())
        }
        _ => Ok(()),
    }
}

fn apply(fx: &Fixture<u8>, op: &Op) {
    let outer_len = fx.source.len();
    let result = match op.clone() {
        Op::InnerPush { segment: slot, value } => match segment(fx, slot) {
            Some(seq) => seq.push(value),
            None => Ok(()),
        },
        Op::InnerRemove { segment: slot, index } => match segment(fx, slot) {
            Some(seq) if !seq.is_empty() => seq.remove(index % seq.len()).map(drop),
            _ => Ok(()),
        },
        Op::InnerSet {
            segment: slot,
            index,
            value,
        } => match segment(fx, slot) {
            Some(seq) if !seq.is_empty() => seq.set(index % seq.len(), value).map(drop),
            _ => Ok(()),
        },
        Op::InnerSplice {
            segment: slot,
            at,
            remove,
            values,
        } => match segment(fx, slot) {
            Some(seq) => {
                let at = at % (seq.len() + 1);
                let end = (at + remove).min(seq.len());
                seq.splice(at..end, values).map(drop)
            }
            None => Ok(()),
        },
        Op::InnerReverse { segment: slot } => match segment(fx, slot) {
            Some(seq) => seq.reverse(),
            None => Ok(()),
        },
        Op::InnerSort { segment: slot } => match segment(fx, slot) {
            Some(seq) => seq.sort(),
            None => Ok(()),
        },
        Op::OuterInsert { at, values } => fx
            .source
            .insert(at % (outer_len + 1), Sequence::from(values)),
        Op::OuterRemove { at } if outer_len > 0 => fx.source.remove(at % outer_len).map(drop),
        Op::OuterRemove { .. } => Ok(()),
        Op::OuterReplace { at, values } if outer_len > 0 => fx
            .source
            .set(at % outer_len, Sequence::from(values))
            .map(drop),
        Op::OuterReplace { .. } => Ok(()),
        Op::OuterSwap { a, b } if outer_len > 0 => fx.source.swap(a % outer_len, b % outer_len),
        Op::OuterSwap { .. } => Ok(()),
        Op::OuterReverse => fx.source.reverse(),
        Op::OuterDuplicate { at, segment: slot } => match segment(fx, slot) {
            Some(seq) => fx.source.insert(at % (outer_len + 1), seq),
            None => Ok(()),
        },
        Op::OuterBatch(ops) => fx
            .source
            .edit(|editor| ops.iter().try_for_each(|op| apply_outer(editor, op))),
        Op::InnerBatch { segment: slot, ops } => match segment(fx, slot) {
            Some(seq) => seq.edit(|editor| ops.iter().try_for_each(|op| apply_inner(editor, op))),
            None => Ok(()),
        },
    };
    result.unwrap();
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn view_tracks_random_mutations(
        initial in prop::collection::vec(values(), 0..5),
        ops in prop::collection::vec(op(), 1..40),
    ) {
        let segments: Vec<&[u8]> = initial.iter().map(Vec::as_slice).collect();
        let fx = fixture(&segments);

        for op in &ops {
            apply(&fx, op);

            let expected = flatten(&fx.source);
            prop_assert_eq!(fx.view.to_vec(), expected.clone());
            prop_assert_eq!(fx.view.size(), expected.len());
            let mirror = fx.recorder.borrow().mirror().to_vec();
            prop_assert_eq!(mirror, expected);
            prop_assert!(fx.view.verify().is_ok());

            let lengths: Vec<usize> = fx.source.to_vec().iter().map(Sequence::len).collect();
            let sums = translate::prefix_sums(lengths);
            for (position, &start) in sums.iter().enumerate() {
                prop_assert_eq!(fx.view.view_index(position).unwrap(), start);
            }
        }

        let recorder = fx.recorder.borrow();
        prop_assert!(recorder.transactions().iter().all(|tx| !tx.is_empty()));
    }
}
