use mtx_types::{PathError, TypeError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("publishing is disabled in this configuration")]
    PublishDisabled,

    #[error(transparent)]
    Store(#[from] mtx_store::StoreError),

    #[error(transparent)]
    Draft(#[from] mtx_drafts::DraftError),

    #[error(transparent)]
    Sync(#[from] mtx_sync::SyncError),

    #[error(transparent)]
    Publish(#[from] mtx_publish::PublishError),

    #[error(transparent)]
    Tool(#[from] mtx_tools::ToolError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<TypeError> for SdkError {
    fn from(err: TypeError) -> Self {
        Self::Store(err.into())
    }
}

impl From<PathError> for SdkError {
    fn from(err: PathError) -> Self {
        Self::Store(err.into())
    }
}

pub type SdkResult<T> = Result<T, SdkError>;
