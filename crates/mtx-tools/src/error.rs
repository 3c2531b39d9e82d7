use mtx_store::StoreError;
use mtx_types::{PathError, TypeError};

/// Errors from tool operations.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Missing or malformed tool input.
    #[error("validation error: {0}")]
    Validation(String),

    /// A compare-and-set write found a different live value.
    #[error("stale value at {path}: expected {expected:?}, found {actual:?}")]
    StaleValue {
        path: String,
        expected: Option<String>,
        actual: Option<String>,
    },

    /// The interpreter failed or returned unusable output.
    #[error("interpreter error: {0}")]
    Interpreter(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("task error: {0}")]
    Task(String),
}

impl From<TypeError> for ToolError {
    fn from(err: TypeError) -> Self {
        Self::Store(err.into())
    }
}

impl From<PathError> for ToolError {
    fn from(err: PathError) -> Self {
        Self::Store(err.into())
    }
}

impl From<serde_json::Error> for ToolError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

pub type ToolResult<T> = Result<T, ToolError>;
