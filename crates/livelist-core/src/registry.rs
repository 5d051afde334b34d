//! Inner listener bookkeeping.
//!
//! One listener per distinct sequence present in the source, regardless of
//! how many positions it occupies. Attach and detach are counted so the
//! listener is installed on the first occurrence and removed with the last.

use std::collections::HashMap;

use livelist_model::{Result, SequenceChange};
use tracing::trace;

use crate::sequence::{ListenerId, Sequence, SequenceId};

pub(crate) type InnerCallback<E> = Box<dyn Fn(&SequenceChange<E>) -> Result<()>>;
pub(crate) type ListenerFactory<E> = Box<dyn Fn(SequenceId) -> InnerCallback<E>>;

struct Registration<E> {
    sequence: Sequence<E>,
    listener: ListenerId,
    occurrences: usize,
}

pub(crate) struct ListenerRegistry<E> {
    entries: HashMap<SequenceId, Registration<E>>,
    factory: ListenerFactory<E>,
}

impl<E: 'static> ListenerRegistry<E> {
    pub(crate) fn new(factory: ListenerFactory<E>) -> Self {
        Self {
            entries: HashMap::new(),
            factory,
        }
    }

    /// Count one more occurrence of `sequence`; installs its listener on the
    /// first one. Returns true if a listener was installed.
    pub(crate) fn attach(&mut self, sequence: &Sequence<E>) -> bool {
        if let Some(registration) = self.entries.get_mut(&sequence.id()) {
            registration.occurrences += 1;
            return false;
        }
        let listener = sequence.listen((self.factory)(sequence.id()));
        trace!(sequence = %sequence.id(), "attached inner listener");
        self.entries.insert(
            sequence.id(),
            Registration {
                sequence: sequence.clone(),
                listener,
                occurrences: 1,
            },
        );
        true
    }
}

impl<E> ListenerRegistry<E> {
    /// Count one less occurrence of `id`; removes its listener with the last
    /// one. Returns true if a listener was removed.
    pub(crate) fn detach(&mut self, id: SequenceId) -> bool {
        let Some(registration) = self.entries.get_mut(&id) else {
            return false;
        };
        registration.occurrences -= 1;
        if registration.occurrences > 0 {
            return false;
        }
        if let Some(registration) = self.entries.remove(&id) {
            registration.sequence.unlisten(registration.listener);
            trace!(sequence = %id, "detached inner listener");
        }
        true
    }

    /// Remove every listener. Returns how many were removed.
    pub(crate) fn detach_all(&mut self) -> usize {
        let count = self.entries.len();
        for (_, registration) in self.entries.drain() {
            registration.sequence.unlisten(registration.listener);
        }
        count
    }

    pub(crate) fn occurrences(&self, id: SequenceId) -> usize {
        self.entries
            .get(&id)
            .map_or(0, |registration| registration.occurrences)
    }

    /// Number of installed listeners.
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> ListenerRegistry<u8> {
        let factory: ListenerFactory<u8> = Box::new(|_: SequenceId| {
            let callback: InnerCallback<u8> = Box::new(|_: &SequenceChange<u8>| Ok(()));
            callback
        });
        ListenerRegistry::new(factory)
    }

    #[test]
    fn repeated_attach_installs_one_listener() {
        let mut registry = registry();
        let sequence = Sequence::from(vec![1u8]);
        assert!(registry.attach(&sequence));
        assert!(!registry.attach(&sequence));
        assert_eq!(sequence.listener_count(), 1);
        assert_eq!(registry.occurrences(sequence.id()), 2);

        assert!(!registry.detach(sequence.id()));
        assert_eq!(sequence.listener_count(), 1);
        assert!(registry.detach(sequence.id()));
        assert_eq!(sequence.listener_count(), 0);
        assert!(!registry.detach(sequence.id()));
    }

    #[test]
    fn detach_all_clears_every_sequence() {
        let mut registry = registry();
        let a = Sequence::from(vec![1u8]);
        let b = Sequence::from(vec![2u8]);
        registry.attach(&a);
        registry.attach(&b);
        assert_eq!(registry.detach_all(), 2);
        assert_eq!(registry.len(), 0);
        assert_eq!(a.listener_count() + b.listener_count(), 0);
    }
}
