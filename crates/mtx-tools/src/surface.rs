use std::sync::Arc;

use mtx_store::{DocumentStore, FieldWrite, StoreError};
use mtx_types::{flatten, resolve_leaf, FieldPath, PageId};

use crate::error::{ToolError, ToolResult};
use crate::interpreter::{InterpretRequest, Interpreter, ProposedChange};
use crate::report::{ChangeOutcome, ChangeReport, InstructionReport, PageContent, PageSummary};

/// Times a compare-and-set write is attempted before the field is reported
/// stale. A second attempt re-checks the value after a concurrent write.
const CAS_ATTEMPTS: usize = 2;

/// The operations exposed to an external agent.
///
/// Every operation is a stateless call against the [`DocumentStore`]; store
/// I/O runs on the blocking thread pool.
#[derive(Clone)]
pub struct ToolSurface {
    store: DocumentStore,
    interpreter: Option<Arc<dyn Interpreter>>,
}

impl ToolSurface {
    pub fn new(store: DocumentStore) -> Self {
        Self {
            store,
            interpreter: None,
        }
    }

    pub fn with_interpreter(mut self, interpreter: Arc<dyn Interpreter>) -> Self {
        self.interpreter = Some(interpreter);
        self
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    pub fn has_interpreter(&self) -> bool {
        self.interpreter.is_some()
    }

    /// Every page with its leaf count and revision.
    pub async fn enumerate_pages(&self) -> ToolResult<Vec<PageSummary>> {
        self.blocking(|store| {
            store
                .list_pages()?
                .into_iter()
                .map(|page| -> ToolResult<PageSummary> {
                    let snapshot = store.snapshot(&page)?;
                    Ok(PageSummary {
                        fields: snapshot.content.leaf_count(),
                        page_id: page,
                        revision: snapshot.revision,
                    })
                })
                .collect()
        })
        .await
    }

    /// A page's leaves as a flat `path -> value` map.
    pub async fn read_content(&self, page: &PageId) -> ToolResult<PageContent> {
        let page = page.clone();
        self.blocking(move |store| {
            let snapshot = store.snapshot(&page)?;
            Ok(PageContent {
                content: flatten(&snapshot.content),
                page_id: page,
                revision: snapshot.revision,
            })
        })
        .await
    }

    /// Set one field unconditionally.
    pub async fn write_field(
        &self,
        page: &PageId,
        path: &FieldPath,
        value: &str,
    ) -> ToolResult<FieldWrite> {
        let (page, path, value) = (page.clone(), path.clone(), value.to_string());
        self.blocking(move |store| Ok(store.set_field(&page, &path, &value)?))
            .await
    }

    /// Set one field only if it currently holds `expected`
    /// (`None`: only if it does not exist). A mismatch is
    /// [`ToolError::StaleValue`] and nothing is written.
    pub async fn write_field_if(
        &self,
        page: &PageId,
        path: &FieldPath,
        expected: Option<&str>,
        value: &str,
    ) -> ToolResult<FieldWrite> {
        let (page, path, value) = (page.clone(), path.clone(), value.to_string());
        let expected = expected.map(str::to_string);
        self.blocking(move |store| {
            compare_and_set(store, &page, &path, expected.as_deref(), &value)
        })
        .await
    }

    /// Ask the interpreter for edits and apply those still based on live
    /// values.
    pub async fn interpret_instruction(
        &self,
        page: &PageId,
        instruction: &str,
    ) -> ToolResult<InstructionReport> {
        let instruction = instruction.trim();
        if instruction.is_empty() {
            return Err(ToolError::Validation("instruction cannot be empty".into()));
        }
        let interpreter = self
            .interpreter
            .as_ref()
            .ok_or_else(|| ToolError::Interpreter("no interpreter configured".into()))?;

        let content = self.read_content(page).await?;
        let request = InterpretRequest {
            page_id: page.clone(),
            instruction: instruction.to_string(),
            content: content.content,
        };
        let proposals = interpreter.interpret(&request).await?;
        tracing::debug!(page = %page, proposals = proposals.len(), "instruction interpreted");

        let changes = self.apply_proposals(page, proposals).await?;
        let report = InstructionReport {
            page_id: page.clone(),
            instruction: request.instruction,
            changes,
        };
        tracing::info!(
            page = %page,
            applied = report.applied(),
            stale = report.stale(),
            failed = report.failed(),
            "instruction applied"
        );
        Ok(report)
    }

    /// Apply proposals in order, each as its own compare-and-set write.
    pub async fn apply_proposals(
        &self,
        page: &PageId,
        proposals: Vec<ProposedChange>,
    ) -> ToolResult<Vec<ChangeReport>> {
        let page = page.clone();
        self.blocking(move |store| {
            Ok(proposals
                .into_iter()
                .map(|change| {
                    let outcome = apply_one(store, &page, &change);
                    ChangeReport { change, outcome }
                })
                .collect())
        })
        .await
    }

    async fn blocking<T, F>(&self, f: F) -> ToolResult<T>
    where
        F: FnOnce(&DocumentStore) -> ToolResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || f(&store))
            .await
            .map_err(|e| ToolError::Task(format!("spawn_blocking: {e}")))?
    }
}

impl std::fmt::Debug for ToolSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolSurface")
            .field("store", &self.store)
            .field("interpreter", &self.interpreter.is_some())
            .finish()
    }
}

fn apply_one(store: &DocumentStore, page: &PageId, change: &ProposedChange) -> ChangeOutcome {
    let result = FieldPath::parse(&change.path)
        .map_err(ToolError::from)
        .and_then(|path| {
            compare_and_set(
                store,
                page,
                &path,
                change.expected_old_value.as_deref(),
                &change.new_value,
            )
        });
    match result {
        Ok(write) => ChangeOutcome::Applied {
            revision: write.revision,
        },
        Err(ToolError::StaleValue { actual, .. }) => ChangeOutcome::Stale { actual },
        Err(e) => {
            tracing::warn!(page = %page, path = %change.path, error = %e, "proposal rejected");
            ChangeOutcome::Failed {
                error: e.to_string(),
            }
        }
    }
}

/// Write `value` at `path` if the live leaf equals `expected`.
///
/// The live value is read together with the document revision and the write
/// presents that revision, so a write landing in between is caught as a
/// conflict and the value is checked again.
fn compare_and_set(
    store: &DocumentStore,
    page: &PageId,
    path: &FieldPath,
    expected: Option<&str>,
    value: &str,
) -> ToolResult<FieldWrite> {
    for _ in 0..CAS_ATTEMPTS {
        let snapshot = store.snapshot(page)?;
        let actual = resolve_leaf(&snapshot.content, path);
        if actual != expected {
            tracing::warn!(
                page = %page,
                path = %path,
                expected = ?expected,
                actual = ?actual,
                "stale value, change skipped"
            );
            return Err(ToolError::StaleValue {
                path: path.to_string(),
                expected: expected.map(str::to_string),
                actual: actual.map(str::to_string),
            });
        }
        match store.set_field_at(page, path, value, Some(snapshot.revision)) {
            Err(StoreError::Conflict { .. }) => {
                tracing::debug!(page = %page, path = %path, "page changed before write, re-checking");
            }
            result => return Ok(result?),
        }
    }

    let actual = store
        .get(page)
        .ok()
        .and_then(|tree| resolve_leaf(&tree, path).map(str::to_string));
    tracing::warn!(page = %page, path = %path, "page kept changing, change skipped");
    Err(ToolError::StaleValue {
        path: path.to_string(),
        expected: expected.map(str::to_string),
        actual,
    })
}
