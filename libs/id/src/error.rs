//! Error types for identifier parsing.

use thiserror::Error;

/// Errors that can occur when parsing a scheduled action identifier.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdError {
    /// The identifier string is empty.
    #[error("identifier cannot be empty")]
    Empty,

    /// The identifier has fewer than three `/`-separated segments.
    #[error("identifier has {found} segment(s), expected 3: '{identifier}'")]
    MissingSegments { identifier: String, found: usize },

    /// The phase segment is neither `START` nor `FINISH`.
    #[error("unknown phase '{0}', expected START or FINISH")]
    UnknownPhase(String),
}

impl IdError {
    /// Returns true if this error indicates the input was empty.
    pub fn is_empty(&self) -> bool {
        matches!(self, IdError::Empty)
    }

    /// Returns true if the identifier was not shaped like an action name at all.
    pub fn is_shape_error(&self) -> bool {
        matches!(self, IdError::Empty | IdError::MissingSegments { .. })
    }
}
