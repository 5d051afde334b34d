//! Error types for live list operations.

use thiserror::Error;

/// Errors that can occur while reading or translating a live list.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LiveListError {
    /// Index outside `[0, size)`.
    #[error("index {index} out of range for size {size}")]
    OutOfRange { index: usize, size: usize },

    /// Malformed range or permutation. This is a programming error.
    #[error("precondition violated: {message}")]
    PreconditionViolation { message: String },

    /// A subscriber callback failed while receiving a transaction.
    #[error("listener failed: {message}")]
    Listener { message: String },

    /// The view has been disposed and no longer tracks its sources.
    #[error("view has been disposed")]
    Disposed,
}

/// Result type alias for live list operations.
pub type Result<T> = std::result::Result<T, LiveListError>;

impl LiveListError {
    /// Create an OutOfRange error.
    pub fn out_of_range(index: usize, size: usize) -> Self {
        Self::OutOfRange { index, size }
    }

    /// Create a PreconditionViolation error.
    pub fn precondition(message: impl Into<String>) -> Self {
        Self::PreconditionViolation {
            message: message.into(),
        }
    }

    /// Create a Listener error.
    pub fn listener(message: impl Into<String>) -> Self {
        Self::Listener {
            message: message.into(),
        }
    }

    /// Returns true for errors that signal a contract violation by the caller.
    pub fn is_programming_error(&self) -> bool {
        matches!(self, Self::PreconditionViolation { .. } | Self::Disposed)
    }
}

/// Fail with `OutOfRange` unless `index < size`.
pub fn check_index(index: usize, size: usize) -> Result<()> {
    if index < size {
        Ok(())
    } else {
        Err(LiveListError::out_of_range(index, size))
    }
}

/// Fail with `PreconditionViolation` unless `from <= to <= size`.
pub fn check_range(from: usize, to: usize, size: usize) -> Result<()> {
    if from > to {
        return Err(LiveListError::precondition(format!(
            "range start {from} is past range end {to}"
        )));
    }
    if to > size {
        return Err(LiveListError::precondition(format!(
            "range end {to} exceeds size {size}"
        )));
    }
    Ok(())
}

/// Fail with `PreconditionViolation` unless `permutation` is a bijection of `0..len`.
pub fn check_permutation(permutation: &[usize]) -> Result<()> {
    let len = permutation.len();
    let mut seen = vec![false; len];
    for (position, &target) in permutation.iter().enumerate() {
        if target >= len {
            return Err(LiveListError::precondition(format!(
                "permutation entry {position} maps to {target}, outside 0..{len}"
            )));
        }
        if seen[target] {
            return Err(LiveListError::precondition(format!(
                "permutation maps more than one entry to {target}"
            )));
        }
        seen[target] = true;
    }
    Ok(())
}
