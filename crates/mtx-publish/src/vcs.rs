use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::PublishResult;
use crate::status::PendingChange;

/// Identifier of a recorded commit, as reported by the backend.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommitId(pub String);

impl CommitId {
    /// First seven characters, for display.
    pub fn short(&self) -> &str {
        self.0.get(..7).unwrap_or(&self.0)
    }
}

impl fmt::Display for CommitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Version-control primitive wrapped by the publish gate.
///
/// Implementations must satisfy these invariants:
/// - Paths are relative to the content root and `/`-separated.
/// - `commit` records exactly the given changes as one commit, or nothing
///   at all if it fails.
/// - Querying pending changes never modifies repository state.
pub trait VersionControl: Send + Sync {
    /// Content files that differ from the last commit.
    fn pending_changes(&self) -> PublishResult<Vec<PendingChange>>;

    /// Stage `changes` and record them as one commit.
    fn commit(&self, changes: &[PendingChange], message: &str) -> PublishResult<CommitId>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_id() {
        assert_eq!(CommitId("0123456789abcdef".into()).short(), "0123456");
        assert_eq!(CommitId("abc".into()).short(), "abc");
    }
}
