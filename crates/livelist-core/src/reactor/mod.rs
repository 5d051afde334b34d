//! Reactors turning source changes into view events.
//!
//! - [`outer`] handles segments being added, removed, replaced or reordered.
//! - [`inner`] handles elements changing inside one segment.
//!
//! Both work on the segment cache: event ranges come from the snapshots as
//! they were before the change, and the snapshots are updated right after.

pub(crate) mod inner;
pub(crate) mod outer;
