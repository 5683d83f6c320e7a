//! Error taxonomy shared by every map, view and entry operation.
//!
//! "No mapping" is not an error: lookups return `Option`. Everything here is
//! reported synchronously by the call that triggers it, and a call that
//! returns an error has not applied any part of its effect.

use thiserror::Error;

/// Errors raised by map, view and entry operations.
///
/// # Stability
///
/// - New variants may be added in minor versions (enum is `#[non_exhaustive]`)
/// - Helper methods like `is_*()` are the stable way to classify errors
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MapError {
    /// A required argument was missing, e.g. an absence marker passed where a
    /// real value is required.
    #[error("invalid argument: {what}")]
    InvalidArgument {
        /// The argument that was rejected
        what: &'static str,
    },

    /// A view, iterator or entry was used after the backing map changed
    /// structurally through some other channel.
    #[error("map was structurally modified out of band during {operation}")]
    ModificationConflict {
        /// The operation that observed the conflict
        operation: &'static str,
    },

    /// Insertion through a view, or mutation of a read-only map.
    #[error("unsupported operation: {operation}")]
    Unsupported {
        /// The operation that was refused
        operation: &'static str,
    },

    /// `remove_current` called before the first step or twice for one element.
    #[error("iterator has no current element to remove")]
    NoCurrentElement,
}

impl MapError {
    /// Check if this error is a modification conflict.
    pub fn is_modification_conflict(&self) -> bool {
        matches!(self, MapError::ModificationConflict { .. })
    }

    /// Check if this error is an unsupported operation.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, MapError::Unsupported { .. })
    }

    /// Check if this error is an invalid argument.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, MapError::InvalidArgument { .. })
    }
}
