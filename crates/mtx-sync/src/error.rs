use thiserror::Error;

use crate::types::KeyFailure;

#[derive(Debug, Error)]
pub enum SyncError {
    /// One or more keys failed to sync; their drafts are still pending.
    #[error("sync partially failed: {} of {attempted} keys failed", failures.len())]
    PartialFailure {
        attempted: usize,
        failures: Vec<KeyFailure>,
    },

    #[error("store error: {0}")]
    Store(#[from] mtx_store::StoreError),

    #[error("draft cache error: {0}")]
    Draft(#[from] mtx_drafts::DraftError),

    /// The writer could not be reached or did not answer.
    #[error("writer error: {0}")]
    Writer(String),

    #[error("task error: {0}")]
    Task(String),
}

pub type SyncResult<T> = Result<T, SyncError>;
