//! The concatenated view over a source of sequences.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use livelist_model::{
    ChangeEvent, LiveListError, Result, SequenceChange, Transaction, check_range,
};
use tracing::{debug, debug_span, trace, warn};

use crate::cache::SegmentCache;
use crate::listener::{FnListener, ViewListener};
use crate::reactor::{inner, outer};
use crate::registry::{InnerCallback, ListenerFactory, ListenerRegistry};
use crate::sequence::{ListenerId, Sequence, SequenceId, SourceOfSequences};
use crate::translate::Location;

/// Options for a [`ConcatenatedView`].
#[derive(Debug, Clone)]
pub struct ViewOptions {
    /// Name used in log output.
    pub name: String,
    /// Check the cache against the live sources after every transaction.
    pub verify_after_transaction: bool,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            name: "concat".to_string(),
            verify_after_transaction: false,
        }
    }
}

impl ViewOptions {
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use]
    pub fn with_verify_after_transaction(mut self, enable: bool) -> Self {
        self.verify_after_transaction = enable;
        self
    }
}

/// Handle returned by [`ConcatenatedView::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type SharedListener<E> = Rc<RefCell<dyn ViewListener<E>>>;

struct Engine<E> {
    options: ViewOptions,
    source: SourceOfSequences<E>,
    cache: SegmentCache<E>,
    registry: ListenerRegistry<E>,
    outer_listener: Option<ListenerId>,
    subscribers: Vec<(SubscriptionId, SharedListener<E>)>,
    next_subscription: u64,
    disposed: bool,
}

impl<E: Clone + 'static> Engine<E> {
    fn on_outer_change(&mut self, change: &SequenceChange<Sequence<E>>) -> Result<Transaction<E>> {
        let span = debug_span!("outer_change", view = %self.options.name, records = change.len());
        let _guard = span.enter();
        let transaction = outer::translate(&mut self.cache, &mut self.registry, change)?;
        self.finish(transaction)
    }

    fn on_inner_change(
        &mut self,
        id: SequenceId,
        change: &SequenceChange<E>,
    ) -> Result<Transaction<E>> {
        let span = debug_span!("inner_change", view = %self.options.name, sequence = %id);
        let _guard = span.enter();
        let transaction = inner::translate(&mut self.cache, id, change)?;
        self.finish(transaction)
    }

    fn finish(&self, transaction: Transaction<E>) -> Result<Transaction<E>> {
        if self.options.verify_after_transaction {
            self.verify()?;
        }
        debug!(
            events = transaction.len(),
            size = self.cache.total_len(),
            segments = self.cache.len(),
            "translated"
        );
        Ok(transaction)
    }

    fn verify(&self) -> Result<()> {
        self.cache.verify(&self.source)?;
        let mut distinct: Vec<SequenceId> = self.cache.sequences().map(Sequence::id).collect();
        distinct.sort_unstable();
        distinct.dedup();
        if distinct.len() != self.registry.len() {
            return Err(LiveListError::precondition(format!(
                "{} distinct segments but {} inner listeners",
                distinct.len(),
                self.registry.len()
            )));
        }
        for id in distinct {
            let tracked = self.cache.positions_of(id).len();
            let registered = self.registry.occurrences(id);
            if tracked != registered {
                return Err(LiveListError::precondition(format!(
                    "{id} occupies {tracked} positions but is registered {registered} times"
                )));
            }
        }
        Ok(())
    }
}

impl<E> Engine<E> {
    fn dispose(&mut self) -> usize {
        if self.disposed {
            return 0;
        }
        self.disposed = true;
        if let Some(listener) = self.outer_listener.take() {
            self.source.unlisten(listener);
        }
        self.subscribers.clear();
        let detached = self.registry.detach_all();
        debug!(view = %self.options.name, detached, "view disposed");
        detached
    }

    fn check_live(&self) -> Result<()> {
        if self.disposed {
            Err(LiveListError::Disposed)
        } else {
            Ok(())
        }
    }
}

/// A live, ordered concatenation of every sequence in a source.
///
/// The view keeps an owned snapshot per segment and reacts to changes of the
/// source and of each segment, delivering the translated events to its
/// subscribers as one [`Transaction`] per source mutation.
///
/// All operations run on the caller's thread. Subscribers may read the view
/// from their callbacks but must not mutate the source or any segment.
pub struct ConcatenatedView<E> {
    engine: Rc<RefCell<Engine<E>>>,
}

impl<E: Clone + 'static> ConcatenatedView<E> {
    /// Build a view over `source` with default options.
    pub fn new(source: SourceOfSequences<E>) -> Result<Self> {
        Self::with_options(source, ViewOptions::default())
    }

    pub fn with_options(source: SourceOfSequences<E>, options: ViewOptions) -> Result<Self> {
        let cache = SegmentCache::from_source(&source)?;
        let engine = Rc::new_cyclic(|weak: &Weak<RefCell<Engine<E>>>| {
            RefCell::new(Engine {
                options,
                source: source.clone(),
                cache,
                registry: ListenerRegistry::new(inner_listener_factory(weak.clone())),
                outer_listener: None,
                subscribers: Vec::new(),
                next_subscription: 0,
                disposed: false,
            })
        });

        {
            let mut state = engine.borrow_mut();
            let Engine {
                cache, registry, ..
            } = &mut *state;
            for sequence in cache.sequences() {
                registry.attach(sequence);
            }
            let weak = Rc::downgrade(&engine);
            state.outer_listener = Some(source.listen(move |change| {
                dispatch(&weak, |engine| engine.on_outer_change(change))
            }));
            debug!(
                view = %state.options.name,
                segments = state.cache.len(),
                size = state.cache.total_len(),
                "initialized"
            );
        }
        Ok(Self { engine })
    }

    /// Build a view over a fresh source holding `sequences`.
    pub fn from_sequences(sequences: impl IntoIterator<Item = Sequence<E>>) -> Result<Self> {
        Self::new(sequences.into_iter().collect())
    }

    /// Build a view over fixed lists.
    pub fn from_vecs(lists: impl IntoIterator<Item = Vec<E>>) -> Result<Self> {
        Self::from_sequences(lists.into_iter().map(Sequence::from))
    }

    /// `prefixes` followed by the live contents of `list`.
    pub fn prefixed(list: Sequence<E>, prefixes: Vec<E>) -> Result<Self> {
        Self::from_sequences([Sequence::from(prefixes), list])
    }

    /// The live contents of `list` followed by `suffixes`.
    pub fn suffixed(list: Sequence<E>, suffixes: Vec<E>) -> Result<Self> {
        Self::from_sequences([list, Sequence::from(suffixes)])
    }

    /// Handle to the source; mutate it to add, remove or reorder segments.
    pub fn source(&self) -> SourceOfSequences<E> {
        self.engine.borrow().source.clone()
    }

    pub fn size(&self) -> usize {
        self.engine.borrow().cache.total_len()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    pub fn segment_count(&self) -> usize {
        self.engine.borrow().cache.len()
    }

    pub fn get(&self, index: usize) -> Result<E> {
        let engine = self.engine.borrow();
        engine.check_live()?;
        engine.cache.element_at(index)
    }

    /// Outer position of the segment containing view index `index`.
    pub fn segment_of(&self, index: usize) -> Result<usize> {
        Ok(self.locate(index)?.segment)
    }

    pub fn locate(&self, index: usize) -> Result<Location> {
        let engine = self.engine.borrow();
        engine.check_live()?;
        engine.cache.locate(index)
    }

    /// First view index of the segment at outer position `segment`.
    ///
    /// `segment` may equal the segment count, which yields the view size.
    pub fn view_index(&self, segment: usize) -> Result<usize> {
        let engine = self.engine.borrow();
        engine.check_live()?;
        engine.cache.first_index(segment)
    }

    /// The elements of view range `[from, to)`.
    pub fn range(&self, from: usize, to: usize) -> Result<Vec<E>> {
        let engine = self.engine.borrow();
        engine.check_live()?;
        check_range(from, to, engine.cache.total_len())?;
        (from..to).map(|index| engine.cache.element_at(index)).collect()
    }

    pub fn to_vec(&self) -> Vec<E> {
        self.engine.borrow().cache.flatten()
    }

    /// An Initialization event describing the current contents.
    pub fn initialization(&self) -> ChangeEvent<E> {
        ChangeEvent::initialization(self.to_vec())
    }

    /// Deliver every subsequent transaction to `listener`.
    pub fn subscribe<L>(&self, listener: Rc<RefCell<L>>) -> Result<SubscriptionId>
    where
        L: ViewListener<E> + 'static,
    {
        let mut engine = self.engine.borrow_mut();
        engine.check_live()?;
        let id = SubscriptionId(engine.next_subscription);
        engine.next_subscription += 1;
        let listener: SharedListener<E> = listener;
        engine.subscribers.push((id, listener));
        trace!(view = %engine.options.name, subscribers = engine.subscribers.len(), "subscribed");
        Ok(id)
    }

    /// Like [`subscribe`](Self::subscribe), first delivering an
    /// Initialization transaction with the current contents.
    pub fn subscribe_with_initial<L>(&self, listener: Rc<RefCell<L>>) -> Result<SubscriptionId>
    where
        L: ViewListener<E> + 'static,
    {
        let initial = Transaction::from(vec![self.initialization()]);
        let id = self.subscribe(Rc::clone(&listener))?;
        let shared: SharedListener<E> = listener;
        deliver(&[(id, shared)], &initial)?;
        Ok(id)
    }

    /// Subscribe a closure receiving whole transactions.
    pub fn subscribe_fn<F>(&self, f: F) -> Result<SubscriptionId>
    where
        F: FnMut(&Transaction<E>) -> Result<()> + 'static,
    {
        self.subscribe(Rc::new(RefCell::new(FnListener(f))))
    }

    /// Stop delivering to `id`. Returns false if it was not subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut engine = self.engine.borrow_mut();
        let before = engine.subscribers.len();
        engine.subscribers.retain(|(subscription, _)| *subscription != id);
        engine.subscribers.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.engine.borrow().subscribers.len()
    }

    /// Detach from the source and every segment. Returns the number of inner
    /// listeners removed; later reads return [`LiveListError::Disposed`].
    pub fn dispose(&self) -> usize {
        self.engine.borrow_mut().dispose()
    }

    pub fn is_disposed(&self) -> bool {
        self.engine.borrow().disposed
    }

    /// Check the snapshots and listener registrations against the live sources.
    pub fn verify(&self) -> Result<()> {
        let engine = self.engine.borrow();
        engine.check_live()?;
        engine.verify()
    }
}

impl<E> Drop for ConcatenatedView<E> {
    fn drop(&mut self) {
        match self.engine.try_borrow_mut() {
            Ok(mut engine) => {
                engine.dispose();
            }
            // The translating dispatch holds its own handle and disposes once
            // it releases the borrow.
            Err(_) => warn!("view dropped while translating a change; dispose deferred"),
        }
    }
}

impl<E> fmt::Debug for ConcatenatedView<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.engine.try_borrow() {
            Ok(engine) => f
                .debug_struct("ConcatenatedView")
                .field("name", &engine.options.name)
                .field("segments", &engine.cache.len())
                .field("size", &engine.cache.total_len())
                .field("subscribers", &engine.subscribers.len())
                .field("disposed", &engine.disposed)
                .finish(),
            Err(_) => f.write_str("ConcatenatedView { <translating> }"),
        }
    }
}

fn inner_listener_factory<E: Clone + 'static>(
    weak: Weak<RefCell<Engine<E>>>,
) -> ListenerFactory<E> {
    Box::new(move |id: SequenceId| {
        let weak = weak.clone();
        let callback: InnerCallback<E> = Box::new(move |change: &SequenceChange<E>| {
            dispatch(&weak, |engine| engine.on_inner_change(id, change))
        });
        callback
    })
}

/// Translate under the engine borrow, then deliver with the borrow released
/// so subscribers can read the view.
fn dispatch<E, F>(weak: &Weak<RefCell<Engine<E>>>, translate: F) -> Result<()>
where
    E: Clone + 'static,
    F: FnOnce(&mut Engine<E>) -> Result<Transaction<E>>,
{
    let Some(engine) = weak.upgrade() else {
        return Ok(());
    };
    let (transaction, subscribers) = {
        let mut state = engine.try_borrow_mut().map_err(|_| {
            LiveListError::precondition("source mutated while the view was translating a change")
        })?;
        if state.disposed {
            return Ok(());
        }
        let transaction = translate(&mut *state)?;
        (transaction, state.subscribers.clone())
    };
    if dispose_orphaned(&engine) {
        return Ok(());
    }
    deliver(&subscribers, &transaction)
}

/// Dispose an engine whose view is gone, leaving `engine` as the last handle.
fn dispose_orphaned<E>(engine: &Rc<RefCell<Engine<E>>>) -> bool {
    if Rc::strong_count(engine) > 1 {
        return false;
    }
    match engine.try_borrow_mut() {
        Ok(mut state) => {
            state.dispose();
            true
        }
        Err(_) => false,
    }
}

fn deliver<E>(
    subscribers: &[(SubscriptionId, SharedListener<E>)],
    transaction: &Transaction<E>,
) -> Result<()> {
    if transaction.is_empty() {
        return Ok(());
    }
    for event in transaction {
        trace!(kind = %event.kind(), from = event.range().start, to = event.range().end, "event");
    }
    let mut first_error = None;
    for (id, listener) in subscribers {
        let result = listener
            .try_borrow_mut()
            .map_err(|_| LiveListError::listener(format!("subscriber {id:?} is already borrowed")))
            .and_then(|mut listener| listener.on_transaction(transaction));
        if let Err(error) = result {
            warn!(subscription = ?id, %error, "subscriber failed");
            first_error.get_or_insert(error);
        }
    }
    first_error.map_or(Ok(()), Err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_dropped_mid_translation_is_disposed_afterwards() {
        let segment = Sequence::from(vec![1, 2]);
        let source: SourceOfSequences<i32> = vec![segment.clone()].into_iter().collect();
        let view = ConcatenatedView::new(source.clone()).unwrap();
        let engine = Rc::clone(&view.engine);

        let guard = engine.borrow_mut();
        drop(view);
        assert_eq!(segment.listener_count(), 1);
        drop(guard);

        assert!(dispose_orphaned(&engine));
        assert!(engine.borrow().disposed);
        assert_eq!(segment.listener_count(), 0);
        assert_eq!(source.listener_count(), 0);
    }

    #[test]
    fn live_view_is_not_orphaned() {
        let view = ConcatenatedView::from_vecs([vec!['a']]).unwrap();
        let engine = Rc::clone(&view.engine);
        assert!(!dispose_orphaned(&engine));
        assert!(!view.is_disposed());
    }
}
