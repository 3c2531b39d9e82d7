//! Draft entry type.

use chrono::{DateTime, Utc};
use mtx_types::{FieldPath, PageId};
use serde::{Deserialize, Serialize};

/// A pending edit to one field of one page.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftEntry {
    pub page_id: PageId,
    pub path: FieldPath,
    pub value: String,
    /// When the draft was saved.
    pub timestamp: DateTime<Utc>,
}

impl DraftEntry {
    /// Create a draft stamped with the current time.
    pub fn new(page_id: PageId, path: FieldPath, value: impl Into<String>) -> Self {
        Self {
            page_id,
            path,
            value: value.into(),
            timestamp: Utc::now(),
        }
    }

    /// Cache key: the dotted path within the page.
    pub fn key(&self) -> String {
        self.path.to_string()
    }
}
