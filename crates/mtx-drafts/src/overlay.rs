use mtx_types::{unflatten_into, ContentNode, PathError};

use crate::entry::DraftEntry;

/// A draft that could not be applied to a tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RejectedDraft {
    pub entry: DraftEntry,
    pub error: PathError,
}

/// Apply pending drafts on top of a stored tree.
///
/// Lets a client render its own edits before they are durable. Drafts whose
/// path cannot be written into `tree` are skipped and returned; the rest are
/// applied in order.
pub fn overlay(tree: &mut ContentNode, drafts: &[DraftEntry]) -> Vec<RejectedDraft> {
    let mut rejected = Vec::new();
    for entry in drafts {
        if let Err(error) = unflatten_into(tree, &entry.path, &entry.value) {
            rejected.push(RejectedDraft {
                entry: entry.clone(),
                error,
            });
        }
    }
    rejected
}
