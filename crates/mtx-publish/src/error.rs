//! Error types for the publish crate.

/// Errors that can occur while inspecting or publishing changes.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    /// The commit could not be recorded; nothing was published.
    #[error("publish failed: {0}")]
    PublishFailed(String),

    /// The version-control backend could not be opened or queried.
    #[error("version control error: {0}")]
    Repository(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<git2::Error> for PublishError {
    fn from(err: git2::Error) -> Self {
        Self::Repository(err.message().to_string())
    }
}

/// Convenience alias for publish results.
pub type PublishResult<T> = Result<T, PublishError>;
