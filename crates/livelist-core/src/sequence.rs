//! Observable sequences.
//!
//! A [`Sequence`] is a shared handle to an ordered list that reports every
//! mutation to its listeners as a [`SequenceChange`]. Handles are cheap to
//! clone; all clones refer to the same list and share one [`SequenceId`].
//!
//! The id is the address of the shared state, so it is only unique among
//! live sequences. Anything keyed by it must hold a handle.
//!
//! Every mutation method applies the change first and then notifies the
//! listeners, so a listener always observes the new contents. Listener
//! failures are returned to the caller of the mutation after every listener
//! has been notified.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::fmt;
use std::ops::Range;
use std::rc::Rc;

use livelist_model::{
    ListChange, LiveListError, Result, SequenceChange, check_index, check_permutation,
    check_range,
};
use tracing::warn;

/// Identity of a sequence, shared by all clones of its handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SequenceId(usize);

impl fmt::Display for SequenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "seq@{:#x}", self.0)
    }
}

/// Handle returned by [`Sequence::listen`], used to detach the listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Callback<T> = Rc<dyn Fn(&SequenceChange<T>) -> Result<()>>;

struct SequenceState<T> {
    items: Vec<T>,
    listeners: Vec<(ListenerId, Callback<T>)>,
    next_listener: u64,
}

/// An ordered, mutable, observable list.
pub struct Sequence<T> {
    state: Rc<RefCell<SequenceState<T>>>,
}

/// A sequence whose elements are sequences.
pub type SourceOfSequences<E> = Sequence<Sequence<E>>;

impl<T> Clone for Sequence<T> {
    fn clone(&self) -> Self {
        Self {
            state: Rc::clone(&self.state),
        }
    }
}

impl<T> Default for Sequence<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Sequence<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("Sequence");
        debug.field("id", &self.id());
        match self.state.try_borrow() {
            Ok(state) => debug
                .field("len", &state.items.len())
                .field("listeners", &state.listeners.len()),
            Err(_) => debug.field("len", &"<borrowed>"),
        };
        debug.finish()
    }
}

impl<T> PartialEq for Sequence<T> {
    /// Sequences compare by identity, never by contents.
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.state, &other.state)
    }
}

impl<T> Eq for Sequence<T> {}

impl<T> From<Vec<T>> for Sequence<T> {
    fn from(items: Vec<T>) -> Self {
        Self {
            state: Rc::new(RefCell::new(SequenceState {
                items,
                listeners: Vec::new(),
                next_listener: 0,
            })),
        }
    }
}

impl<T> FromIterator<T> for Sequence<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from(iter.into_iter().collect::<Vec<_>>())
    }
}

impl<T> Sequence<T> {
    pub fn new() -> Self {
        Self::from(Vec::new())
    }

    pub fn id(&self) -> SequenceId {
        SequenceId(Rc::as_ptr(&self.state).addr())
    }

    /// True if both handles refer to the same list.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.state, &other.state)
    }

    pub fn len(&self) -> usize {
        self.state.borrow().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run `f` with a view of the current elements.
    pub fn with_items<R>(&self, f: impl FnOnce(&[T]) -> R) -> R {
        f(&self.state.borrow().items)
    }

    /// Register a listener; it receives every subsequent change batch.
    pub fn listen<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&SequenceChange<T>) -> Result<()> + 'static,
    {
        let mut state = self.state.borrow_mut();
        let id = ListenerId(state.next_listener);
        state.next_listener += 1;
        state.listeners.push((id, Rc::new(listener)));
        id
    }

    /// Detach a listener. Returns false if it was not registered.
    pub fn unlisten(&self, id: ListenerId) -> bool {
        let mut state = self.state.borrow_mut();
        let before = state.listeners.len();
        state.listeners.retain(|(listener, _)| *listener != id);
        state.listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.state.borrow().listeners.len()
    }

    /// Apply several mutations and notify listeners once with the whole batch.
    ///
    /// Steps already applied when `f` fails are still reported.
    pub fn edit<R>(&self, f: impl FnOnce(&mut Editor<'_, T>) -> Result<R>) -> Result<R> {
        let (result, change) = {
            let mut state = self.state.try_borrow_mut().map_err(|_| {
                LiveListError::precondition(format!("{} is already borrowed", self.id()))
            })?;
            let mut editor = Editor {
                items: &mut state.items,
                change: SequenceChange::new(),
            };
            let result = f(&mut editor);
            (result, editor.change)
        };
        self.notify(&change)?;
        result
    }

    fn notify(&self, change: &SequenceChange<T>) -> Result<()> {
        if change.is_empty() {
            return Ok(());
        }
        let listeners: Vec<Callback<T>> = self
            .state
            .borrow()
            .listeners
            .iter()
            .map(|(_, callback)| Rc::clone(callback))
            .collect();
        let mut first_error = None;
        for listener in listeners {
            if let Err(error) = listener(change) {
                warn!(sequence = %self.id(), %error, "sequence listener failed");
                first_error.get_or_insert(error);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

impl<T: Clone> Sequence<T> {
    pub fn get(&self, index: usize) -> Option<T> {
        self.state.borrow().items.get(index).cloned()
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.state.borrow().items.clone()
    }

    /// Copy of the current elements, failing instead of panicking when the
    /// sequence is in the middle of an edit.
    pub fn try_to_vec(&self) -> Result<Vec<T>> {
        self.state
            .try_borrow()
            .map(|state| state.items.clone())
            .map_err(|_| LiveListError::precondition(format!("{} is being edited", self.id())))
    }

    /// Length without panicking when the sequence is in the middle of an edit.
    pub fn try_len(&self) -> Result<usize> {
        self.state
            .try_borrow()
            .map(|state| state.items.len())
            .map_err(|_| LiveListError::precondition(format!("{} is being edited", self.id())))
    }

    pub fn push(&self, value: T) -> Result<()> {
        self.edit(|editor| {
            editor.push(value);
            Ok(())
        })
    }

    pub fn insert(&self, index: usize, value: T) -> Result<()> {
        self.edit(|editor| editor.insert(index, value))
    }

    pub fn extend(&self, values: impl IntoIterator<Item = T>) -> Result<()> {
        self.edit(|editor| {
            editor.extend(values);
            Ok(())
        })
    }

    pub fn remove(&self, index: usize) -> Result<T> {
        self.edit(|editor| editor.remove(index))
    }

    /// Replace the element at `index`, returning the previous one.
    pub fn set(&self, index: usize, value: T) -> Result<T> {
        self.edit(|editor| editor.set(index, value))
    }

    /// Modify the element at `index` in place and report it as updated.
    pub fn update_in_place(&self, index: usize, f: impl FnOnce(&mut T)) -> Result<()> {
        self.edit(|editor| editor.update_in_place(index, f))
    }

    /// Replace `range` with `values`, returning the removed elements.
    pub fn splice(
        &self,
        range: Range<usize>,
        values: impl IntoIterator<Item = T>,
    ) -> Result<Vec<T>> {
        self.edit(|editor| editor.splice(range, values))
    }

    pub fn clear(&self) -> Result<()> {
        self.edit(|editor| {
            editor.clear();
            Ok(())
        })
    }

    pub fn replace_all(&self, values: impl IntoIterator<Item = T>) -> Result<Vec<T>> {
        self.edit(|editor| {
            let len = editor.len();
            editor.splice(0..len, values)
        })
    }

    pub fn swap(&self, a: usize, b: usize) -> Result<()> {
        self.edit(|editor| editor.swap(a, b))
    }

    pub fn reverse(&self) -> Result<()> {
        self.edit(|editor| {
            editor.reverse();
            Ok(())
        })
    }

    /// Reorder `[from, from + permutation.len())` so the element at
    /// `from + i` moves to `from + permutation[i]`.
    pub fn permute(&self, from: usize, permutation: Vec<usize>) -> Result<()> {
        self.edit(|editor| editor.permute(from, permutation))
    }

    /// Stable sort reported as a single permutation.
    pub fn sort_by(&self, compare: impl FnMut(&T, &T) -> Ordering) -> Result<()> {
        self.edit(|editor| {
            editor.sort_by(compare);
            Ok(())
        })
    }

    pub fn sort_by_key<K: Ord>(&self, mut key: impl FnMut(&T) -> K) -> Result<()> {
        self.sort_by(|a, b| key(a).cmp(&key(b)))
    }
}

impl<T: Clone + Ord> Sequence<T> {
    pub fn sort(&self) -> Result<()> {
        self.sort_by(T::cmp)
    }
}

/// Mutable access to a sequence inside [`Sequence::edit`].
///
/// Each method validates its arguments before touching the elements and
/// records exactly one [`ListChange`] when it changes something.
pub struct Editor<'a, T> {
    items: &'a mut Vec<T>,
    change: SequenceChange<T>,
}

impl<T: Clone> Editor<'_, T> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[T] {
        self.items
    }

    pub fn push(&mut self, value: T) {
        let from = self.items.len();
        self.items.push(value.clone());
        self.change.push(ListChange::Structural {
            from,
            removed: Vec::new(),
            added: vec![value],
        });
    }

    pub fn insert(&mut self, index: usize, value: T) -> Result<()> {
        if index > self.items.len() {
            return Err(LiveListError::out_of_range(index, self.items.len() + 1));
        }
        self.items.insert(index, value.clone());
        self.change.push(ListChange::Structural {
            from: index,
            removed: Vec::new(),
            added: vec![value],
        });
        Ok(())
    }

    pub fn extend(&mut self, values: impl IntoIterator<Item = T>) {
        let from = self.items.len();
        let added: Vec<T> = values.into_iter().collect();
        self.items.extend(added.iter().cloned());
        self.change.push(ListChange::Structural {
            from,
            removed: Vec::new(),
            added,
        });
    }

    pub fn remove(&mut self, index: usize) -> Result<T> {
        check_index(index, self.items.len())?;
        let value = self.items.remove(index);
        self.change.push(ListChange::Structural {
            from: index,
            removed: vec![value.clone()],
            added: Vec::new(),
        });
        Ok(value)
    }

    pub fn set(&mut self, index: usize, value: T) -> Result<T> {
        check_index(index, self.items.len())?;
        let previous = std::mem::replace(&mut self.items[index], value.clone());
        self.change.push(ListChange::Update {
            from: index,
            values: vec![value],
        });
        Ok(previous)
    }

    pub fn update_in_place(&mut self, index: usize, f: impl FnOnce(&mut T)) -> Result<()> {
        check_index(index, self.items.len())?;
        f(&mut self.items[index]);
        self.change.push(ListChange::Update {
            from: index,
            values: vec![self.items[index].clone()],
        });
        Ok(())
    }

    pub fn splice(
        &mut self,
        range: Range<usize>,
        values: impl IntoIterator<Item = T>,
    ) -> Result<Vec<T>> {
        check_range(range.start, range.end, self.items.len())?;
        let from = range.start;
        let added: Vec<T> = values.into_iter().collect();
        let removed: Vec<T> = self.items.splice(range, added.iter().cloned()).collect();
        self.change.push(ListChange::Structural {
            from,
            removed: removed.clone(),
            added,
        });
        Ok(removed)
    }

    pub fn clear(&mut self) {
        let removed: Vec<T> = std::mem::take(self.items);
        self.change.push(ListChange::Structural {
            from: 0,
            removed,
            added: Vec::new(),
        });
    }

    pub fn swap(&mut self, a: usize, b: usize) -> Result<()> {
        check_index(a, self.items.len())?;
        check_index(b, self.items.len())?;
        if a == b {
            return Ok(());
        }
        let (low, high) = if a < b { (a, b) } else { (b, a) };
        let mut permutation: Vec<usize> = (0..=high - low).collect();
        permutation.swap(0, high - low);
        self.permute(low, permutation)
    }

    pub fn reverse(&mut self) {
        let len = self.items.len();
        self.items.reverse();
        self.change.push(ListChange::Permutation {
            from: 0,
            permutation: (0..len).rev().collect(),
        });
    }

    pub fn permute(&mut self, from: usize, permutation: Vec<usize>) -> Result<()> {
        check_range(from, from + permutation.len(), self.items.len())?;
        check_permutation(&permutation)?;
        let change = ListChange::Permutation { from, permutation };
        change.apply_to(self.items)?;
        self.change.push(change);
        Ok(())
    }

    pub fn sort_by(&mut self, mut compare: impl FnMut(&T, &T) -> Ordering) {
        let mut order: Vec<usize> = (0..self.items.len()).collect();
        order.sort_by(|&a, &b| compare(&self.items[a], &self.items[b]));
        let mut permutation = vec![0; order.len()];
        for (new_position, &old_position) in order.iter().enumerate() {
            permutation[old_position] = new_position;
        }
        let sorted: Vec<T> = order.iter().map(|&i| self.items[i].clone()).collect();
        *self.items = sorted;
        self.change.push(ListChange::Permutation {
            from: 0,
            permutation,
        });
    }
}
