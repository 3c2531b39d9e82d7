use mtx_types::{PageId, PathError, Revision, TypeError};

/// Errors from document store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The page has no backing document.
    #[error("page not found: {0}")]
    NotFound(PageId),

    /// The page id or field path is malformed, escapes the content root, or
    /// would reshape existing content.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// An array index is outside `0..len`.
    #[error("index {index} out of range for {path} (length {len})")]
    IndexOutOfRange {
        path: String,
        index: usize,
        len: usize,
    },

    /// Input is missing or malformed.
    #[error("validation error: {0}")]
    Validation(String),

    /// The caller presented a revision that no longer matches the document.
    #[error("conflict on {page}: expected revision {expected:?}, found {actual:?}")]
    Conflict {
        page: PageId,
        expected: Revision,
        actual: Revision,
    },

    /// The stored document cannot be parsed.
    #[error("malformed document {page}: {reason}")]
    Malformed { page: PageId, reason: String },

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<PathError> for StoreError {
    fn from(err: PathError) -> Self {
        match err {
            PathError::Invalid { .. } => Self::InvalidPath(err.to_string()),
            PathError::IndexOutOfRange { path, index, len } => {
                Self::IndexOutOfRange { path, index, len }
            }
        }
    }
}

impl From<TypeError> for StoreError {
    fn from(err: TypeError) -> Self {
        match err {
            TypeError::InvalidPageId { .. } => Self::InvalidPath(err.to_string()),
            other => Self::Validation(other.to_string()),
        }
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
