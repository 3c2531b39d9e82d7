use std::sync::Arc;

use mtx_store::ContentLayout;
use mtx_types::PageId;
use serde::{Deserialize, Serialize};

use crate::error::{PublishError, PublishResult};
use crate::status::{PendingChange, PublishStatus};
use crate::vcs::{CommitId, VersionControl};

/// Pages named in an auto-generated message before the rest are counted.
const MESSAGE_PAGE_LIMIT: usize = 3;

/// Result of a publish.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishOutcome {
    pub published: bool,
    pub files_changed: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit: Option<CommitId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl PublishOutcome {
    fn nothing() -> Self {
        Self {
            published: false,
            files_changed: 0,
            commit: None,
            message: None,
        }
    }
}

/// Batches every outstanding content change into one commit.
pub struct PublishGate {
    vcs: Arc<dyn VersionControl>,
    layout: ContentLayout,
}

impl PublishGate {
    pub fn new(vcs: Arc<dyn VersionControl>, layout: ContentLayout) -> Self {
        Self { vcs, layout }
    }

    /// Content files changed since the last publish. Nothing is committed.
    pub fn status(&self) -> PublishResult<PublishStatus> {
        Ok(PublishStatus::from_changes(self.content_changes()?))
    }

    /// Commit every pending content change as one unit.
    ///
    /// With nothing pending this returns `published: false` and creates no
    /// commit. A blank or missing `message` is replaced by one naming the
    /// changed pages.
    pub fn publish(&self, message: Option<&str>) -> PublishResult<PublishOutcome> {
        let changes = self.content_changes()?;
        if changes.is_empty() {
            tracing::info!("nothing to publish");
            return Ok(PublishOutcome::nothing());
        }

        let message = match message.map(str::trim) {
            Some(m) if !m.is_empty() => m.to_string(),
            _ => auto_message(&self.pages_of(&changes)),
        };

        let commit = self.vcs.commit(&changes, &message).map_err(|e| {
            tracing::warn!(error = %e, files = changes.len(), "publish failed");
            match e {
                PublishError::PublishFailed(reason) => PublishError::PublishFailed(reason),
                other => PublishError::PublishFailed(other.to_string()),
            }
        })?;

        tracing::info!(commit = %commit, files = changes.len(), "published");
        Ok(PublishOutcome {
            published: true,
            files_changed: changes.len(),
            commit: Some(commit),
            message: Some(message),
        })
    }

    fn content_changes(&self) -> PublishResult<Vec<PendingChange>> {
        Ok(self
            .vcs
            .pending_changes()?
            .into_iter()
            .filter(|change| self.layout.page_for(&change.path).is_some())
            .collect())
    }

    fn pages_of(&self, changes: &[PendingChange]) -> Vec<PageId> {
        let mut pages: Vec<PageId> = changes
            .iter()
            .filter_map(|change| self.layout.page_for(&change.path))
            .collect();
        pages.dedup();
        pages
    }
}

/// Commit message naming the changed pages, e.g.
/// `Update content: about, blog/launch, home and 2 more`.
pub fn auto_message(pages: &[PageId]) -> String {
    let named: Vec<&str> = pages
        .iter()
        .take(MESSAGE_PAGE_LIMIT)
        .map(PageId::as_str)
        .collect();
    let mut message = format!("Update content: {}", named.join(", "));
    if pages.len() > MESSAGE_PAGE_LIMIT {
        message.push_str(&format!(" and {} more", pages.len() - MESSAGE_PAGE_LIMIT));
    }
    message
}
