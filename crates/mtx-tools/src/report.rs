use mtx_types::{FlatMap, PageId, Revision};
use serde::{Deserialize, Serialize};

use crate::interpreter::ProposedChange;

/// One entry of `enumerate-pages`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSummary {
    pub page_id: PageId,
    /// Number of leaf fields.
    pub fields: usize,
    pub revision: Revision,
}

/// Result of `read-content`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageContent {
    pub page_id: PageId,
    pub content: FlatMap,
    pub revision: Revision,
}

/// What happened to one proposal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum ChangeOutcome {
    /// Written; `revision` is the document after the write.
    Applied { revision: Revision },
    /// Skipped because the live value differed from the expected one.
    Stale { actual: Option<String> },
    /// Rejected, e.g. for an invalid path.
    Failed { error: String },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeReport {
    #[serde(flatten)]
    pub change: ProposedChange,
    pub outcome: ChangeOutcome,
}

/// Result of `interpret-instruction`, one report per proposal in order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstructionReport {
    pub page_id: PageId,
    pub instruction: String,
    pub changes: Vec<ChangeReport>,
}

impl InstructionReport {
    pub fn applied(&self) -> usize {
        self.count(|o| matches!(o, ChangeOutcome::Applied { .. }))
    }

    pub fn stale(&self) -> usize {
        self.count(|o| matches!(o, ChangeOutcome::Stale { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, ChangeOutcome::Failed { .. }))
    }

    fn count(&self, pred: impl Fn(&ChangeOutcome) -> bool) -> usize {
        self.changes.iter().filter(|c| pred(&c.outcome)).count()
    }
}
