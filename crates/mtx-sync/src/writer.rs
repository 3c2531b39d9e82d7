use async_trait::async_trait;
use mtx_store::{DocumentStore, FieldWrite};
use mtx_types::{FieldPath, PageId};

use crate::error::{SyncError, SyncResult};

/// The durable write a sync performs for each draft.
///
/// In a deployed editor this is the call from the client to the server; the
/// [`DocumentStore`] implements it directly for in-process use.
#[async_trait]
pub trait FieldWriter: Send + Sync {
    async fn set_field(&self, page: &PageId, path: &FieldPath, value: &str)
        -> SyncResult<FieldWrite>;
}

#[async_trait]
impl FieldWriter for DocumentStore {
    async fn set_field(
        &self,
        page: &PageId,
        path: &FieldPath,
        value: &str,
    ) -> SyncResult<FieldWrite> {
        let store = self.clone();
        let (page, path, value) = (page.clone(), path.clone(), value.to_string());
        tokio::task::spawn_blocking(move || store.set_field(&page, &path, &value))
            .await
            .map_err(|e| SyncError::Task(format!("spawn_blocking: {e}")))?
            .map_err(SyncError::from)
    }
}
