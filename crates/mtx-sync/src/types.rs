use mtx_store::FieldWrite;
use mtx_types::{FieldPath, PageId};
use serde::{Deserialize, Serialize};

use crate::error::{SyncError, SyncResult};

/// Sync engine configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Maximum number of pages synced at once by `sync_all`. The keys of a
    /// single page are always written one after another.
    pub max_in_flight: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self { max_in_flight: 1 }
    }
}

/// A draft that could not be written. The draft stays in the cache.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyFailure {
    pub page_id: PageId,
    pub path: FieldPath,
    pub error: String,
}

/// Per-key outcome of a sync run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    /// Writes that succeeded.
    pub applied: Vec<FieldWrite>,
    /// Writes that failed.
    pub failed: Vec<KeyFailure>,
    /// Keys written successfully whose draft was replaced by a newer edit
    /// during the run and so was left pending.
    pub superseded: usize,
}

impl SyncReport {
    /// Number of keys attempted.
    pub fn attempted(&self) -> usize {
        self.applied.len() + self.failed.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    /// Fold another run's outcomes into this report.
    pub fn merge(&mut self, other: SyncReport) {
        self.applied.extend(other.applied);
        self.failed.extend(other.failed);
        self.superseded += other.superseded;
    }

    /// Turn any per-key failure into [`SyncError::PartialFailure`].
    pub fn into_result(self) -> SyncResult<SyncReport> {
        if self.failed.is_empty() {
            Ok(self)
        } else {
            Err(SyncError::PartialFailure {
                attempted: self.attempted(),
                failures: self.failed,
            })
        }
    }
}
