//! Shared helpers for view integration tests.

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use livelist_core::{ConcatenatedView, Recorder, Sequence, SourceOfSequences, ViewOptions};

pub struct Fixture<E: Clone + 'static> {
    pub segments: Vec<Sequence<E>>,
    pub source: SourceOfSequences<E>,
    pub view: ConcatenatedView<E>,
    pub recorder: Rc<RefCell<Recorder<E>>>,
}

pub fn fixture<E: Clone + 'static>(segments: &[&[E]]) -> Fixture<E> {
    let segments: Vec<Sequence<E>> = segments
        .iter()
        .map(|items| Sequence::from(items.to_vec()))
        .collect();
    let source: SourceOfSequences<E> = segments.iter().cloned().collect();
    let view = ConcatenatedView::with_options(
        source.clone(),
        ViewOptions::default()
            .with_name("test")
            .with_verify_after_transaction(true),
    )
    .expect("build view");
    let recorder = Rc::new(RefCell::new(Recorder::new()));
    view.subscribe_with_initial(Rc::clone(&recorder))
        .expect("subscribe");
    recorder.borrow_mut().clear();
    Fixture {
        segments,
        source,
        view,
        recorder,
    }
}

/// Naive oracle: flatten the live sources in order.
pub fn flatten<E: Clone>(source: &SourceOfSequences<E>) -> Vec<E> {
    source
        .to_vec()
        .iter()
        .flat_map(Sequence::to_vec)
        .collect()
}
