use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    #[error("invalid byte length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("invalid page id {id:?}: {reason}")]
    InvalidPageId { id: String, reason: String },
}

/// Errors produced while parsing a field path or writing through one.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PathError {
    /// The path is malformed, or writing through it would reshape existing data.
    #[error("invalid path {path:?}: {reason}")]
    Invalid { path: String, reason: String },

    /// An array index segment points past the end of the array.
    #[error("index {index} out of range at {path:?} (length {len})")]
    IndexOutOfRange {
        path: String,
        index: usize,
        len: usize,
    },
}

impl PathError {
    pub(crate) fn invalid(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
