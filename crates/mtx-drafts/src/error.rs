//! Error types for the draft cache.

/// Errors that can occur during draft cache operations.
#[derive(Debug, thiserror::Error)]
pub enum DraftError {
    /// I/O failure reading or persisting the draft file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The persisted draft file could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for DraftError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Convenience alias for draft cache results.
pub type DraftResult<T> = Result<T, DraftError>;
