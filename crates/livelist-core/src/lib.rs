//! Incremental concatenation of live sequences.
//!
//! A [`ConcatenatedView`] presents every [`Sequence`] held by a source of
//! sequences as one flat, ordered list. When the source gains, loses,
//! replaces or reorders segments, or when any segment changes its own
//! elements, the view translates the change into minimal [`ChangeEvent`]s in
//! view coordinates and delivers them to its subscribers as one
//! [`Transaction`].
//!
//! # Example
//!
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! use livelist_core::{ChangeEvent, ConcatenatedView, Recorder, Sequence};
//!
//! let head = Sequence::from(vec!['a', 'b']);
//! let tail = Sequence::from(vec!['x']);
//! let view = ConcatenatedView::from_sequences([head.clone(), tail.clone()]).unwrap();
//! let recorder = Rc::new(RefCell::new(Recorder::new()));
//! view.subscribe(Rc::clone(&recorder)).unwrap();
//!
//! tail.push('y').unwrap();
//! assert_eq!(view.to_vec(), vec!['a', 'b', 'x', 'y']);
//! assert_eq!(
//!     recorder.borrow().last().unwrap().events(),
//!     &[ChangeEvent::Insertion { from: 3, added: vec!['y'] }]
//! );
//! ```
//!
//! # Threading
//!
//! Everything runs on the caller's thread; the types are neither `Send` nor
//! `Sync`. Subscribers must not mutate the source or any segment from inside
//! their callbacks.

mod cache;
pub mod listener;
mod reactor;
mod registry;
pub mod sequence;
pub mod translate;
pub mod view;

pub use listener::{FnListener, Recorder, ViewListener};
pub use sequence::{Editor, ListenerId, Sequence, SequenceId, SourceOfSequences};
pub use translate::Location;
pub use view::{ConcatenatedView, SubscriptionId, ViewOptions};

pub use livelist_model::{ChangeEvent, ChangeKind, LiveListError, Result, Transaction};
