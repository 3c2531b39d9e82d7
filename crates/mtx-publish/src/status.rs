//! Pending change and publish status types.
//!
//! These types describe content files that differ from the last published
//! state.

use serde::{Deserialize, Serialize};

/// The kind of file change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    /// A file that was not in the last published state.
    Added,
    /// A published file whose content has changed.
    Modified,
    /// A published file that no longer exists.
    Deleted,
}

impl ChangeKind {
    /// Single-letter porcelain code.
    pub fn code(&self) -> char {
        match self {
            Self::Added => 'A',
            Self::Modified => 'M',
            Self::Deleted => 'D',
        }
    }
}

/// A content file changed since the last publish.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingChange {
    /// Path relative to the content root, `/`-separated.
    pub path: String,
    pub kind: ChangeKind,
}

impl PendingChange {
    pub fn new(path: impl Into<String>, kind: ChangeKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

/// Unpublished state of the content root.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishStatus {
    /// Number of content files changed since the last publish.
    pub unpublished_changes: usize,
    pub files: Vec<PendingChange>,
}

impl PublishStatus {
    pub fn from_changes(files: Vec<PendingChange>) -> Self {
        Self {
            unpublished_changes: files.len(),
            files,
        }
    }

    /// Returns `true` if nothing is waiting to be published.
    pub fn is_clean(&self) -> bool {
        self.files.is_empty()
    }
}
