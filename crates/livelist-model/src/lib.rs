//! Data model shared by the live list engine and its consumers.
//!
//! - [`ChangeEvent`] and [`Transaction`]: what subscribers of a concatenated
//!   view receive, always in view coordinates.
//! - [`ListChange`] and [`SequenceChange`]: what an observable sequence
//!   reports about its own elements, in local coordinates.
//! - [`LiveListError`]: the error taxonomy for both.

pub mod change;
pub mod error;
pub mod event;

pub use change::{ListChange, SequenceChange};
pub use error::{LiveListError, Result, check_index, check_permutation, check_range};
pub use event::{ChangeEvent, ChangeKind, Transaction};
