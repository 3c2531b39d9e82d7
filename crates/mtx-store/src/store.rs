use std::sync::Arc;

use mtx_types::{
    assign, flatten, resolve, resolve_mut, ContentNode, FieldPath, FlatMap, PageId, Revision,
};
use serde::{Deserialize, Serialize};

use crate::document::ContentDocument;
use crate::error::{StoreError, StoreResult};
use crate::layout::ContentLayout;
use crate::ops::{ArrayOpKind, ArrayOpRequest, ArrayOpResult, FieldWrite, PageSnapshot};
use crate::traits::DocumentBackend;

/// Document store configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct StoreConfig {
    /// Header key holding the content tree.
    pub content_key: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            content_key: "content".into(),
        }
    }
}

/// Reads and mutates the content trees of stored documents.
///
/// Each mutating call reads the document, applies the change to its content
/// tree, and writes the document back. A change that fails validation is
/// never written, and a change that leaves the tree as it was skips the
/// write entirely.
#[derive(Clone)]
pub struct DocumentStore {
    backend: Arc<dyn DocumentBackend>,
    config: StoreConfig,
}

impl DocumentStore {
    pub fn new(backend: Arc<dyn DocumentBackend>) -> Self {
        Self::with_config(backend, StoreConfig::default())
    }

    pub fn with_config(backend: Arc<dyn DocumentBackend>, config: StoreConfig) -> Self {
        Self { backend, config }
    }

    pub fn backend(&self) -> &Arc<dyn DocumentBackend> {
        &self.backend
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn layout(&self) -> &ContentLayout {
        self.backend.layout()
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// All pages with a document, sorted by id.
    pub fn list_pages(&self) -> StoreResult<Vec<PageId>> {
        self.backend.list()
    }

    pub fn exists(&self, page: &PageId) -> StoreResult<bool> {
        self.backend.exists(page)
    }

    /// Parse a page's document and report the revision it was read at.
    pub fn read_document(&self, page: &PageId) -> StoreResult<(ContentDocument, Revision)> {
        let data = self
            .backend
            .read(page)?
            .ok_or_else(|| StoreError::NotFound(page.clone()))?;
        let revision = Revision::of(&data);
        let text = String::from_utf8(data).map_err(|_| StoreError::Malformed {
            page: page.clone(),
            reason: "document is not valid UTF-8".into(),
        })?;
        let doc = ContentDocument::parse(&text).map_err(|e| malformed(page, e))?;
        Ok((doc, revision))
    }

    /// Current revision of a page's document.
    pub fn revision(&self, page: &PageId) -> StoreResult<Revision> {
        let data = self
            .backend
            .read(page)?
            .ok_or_else(|| StoreError::NotFound(page.clone()))?;
        Ok(Revision::of(&data))
    }

    /// The content tree of a page.
    pub fn get(&self, page: &PageId) -> StoreResult<ContentNode> {
        Ok(self.snapshot(page)?.content)
    }

    /// The content tree of a page with its revision.
    pub fn snapshot(&self, page: &PageId) -> StoreResult<PageSnapshot> {
        let (doc, revision) = self.read_document(page)?;
        let content = self.content_of(page, &doc)?;
        Ok(PageSnapshot {
            page_id: page.clone(),
            content,
            revision,
        })
    }

    /// Every leaf of a page's content tree keyed by dotted path.
    pub fn read_flat(&self, page: &PageId) -> StoreResult<FlatMap> {
        Ok(flatten(&self.get(page)?))
    }

    // -----------------------------------------------------------------------
    // Writes
    // -----------------------------------------------------------------------

    /// Create a new page from a content tree and body.
    pub fn create_page(
        &self,
        page: &PageId,
        content: &ContentNode,
        body: &str,
    ) -> StoreResult<Revision> {
        if self.backend.exists(page)? {
            return Err(StoreError::Validation(format!("page {page} already exists")));
        }
        let doc = ContentDocument::new(&self.config.content_key, content, body)?;
        let text = doc.render();
        self.backend.write(page, text.as_bytes())?;
        tracing::info!(page = %page, "page created");
        Ok(Revision::of(text.as_bytes()))
    }

    /// Set the leaf at `path` to `value`, creating missing containers.
    pub fn set_field(
        &self,
        page: &PageId,
        path: &FieldPath,
        value: &str,
    ) -> StoreResult<FieldWrite> {
        self.set_field_at(page, path, value, None)
    }

    /// Set a leaf, failing with [`StoreError::Conflict`] if the document is
    /// no longer at `expected`.
    pub fn set_field_at(
        &self,
        page: &PageId,
        path: &FieldPath,
        value: &str,
        expected: Option<Revision>,
    ) -> StoreResult<FieldWrite> {
        let (previous, revision) = self.mutate(page, expected, |tree| {
            Ok(assign(tree, path, ContentNode::leaf(value))?)
        })?;
        let previous_value = previous.and_then(|node| node.as_leaf().map(str::to_string));
        tracing::debug!(page = %page, path = %path, "field written");
        Ok(FieldWrite {
            page_id: page.clone(),
            path: path.clone(),
            previous_value,
            new_value: value.to_string(),
            revision,
        })
    }

    /// Append to or remove from an array.
    pub fn array_op(&self, request: &ArrayOpRequest) -> StoreResult<ArrayOpResult> {
        let page = &request.page_id;
        let path = &request.array_path;
        let ((index, item, new_length), revision) =
            self.mutate(page, request.expected_revision, |tree| match request.op {
                ArrayOpKind::Add => {
                    if request.index.is_some() {
                        return Err(StoreError::Validation(
                            "add always appends and does not accept an index".into(),
                        ));
                    }
                    add_item(tree, path, request.template.clone())
                }
                ArrayOpKind::Remove => {
                    let index = request.index.ok_or_else(|| {
                        StoreError::Validation("remove requires an index".into())
                    })?;
                    remove_item(tree, path, index)
                }
            })?;
        tracing::debug!(page = %page, path = %path, op = %request.op, index, "array updated");
        Ok(ArrayOpResult {
            page_id: page.clone(),
            op: request.op,
            array_path: path.clone(),
            index,
            item,
            new_length,
            revision,
        })
    }

    fn content_of(&self, page: &PageId, doc: &ContentDocument) -> StoreResult<ContentNode> {
        doc.content(&self.config.content_key)
            .map_err(|e| malformed(page, e))
    }

    fn mutate<T>(
        &self,
        page: &PageId,
        expected: Option<Revision>,
        apply: impl FnOnce(&mut ContentNode) -> StoreResult<T>,
    ) -> StoreResult<(T, Revision)> {
        let (mut doc, revision) = self.read_document(page)?;
        if let Some(expected) = expected {
            if expected != revision {
                return Err(StoreError::Conflict {
                    page: page.clone(),
                    expected,
                    actual: revision,
                });
            }
        }

        let mut tree = self.content_of(page, &doc)?;
        let before = tree.clone();
        let out = apply(&mut tree)?;
        if tree == before {
            tracing::trace!(page = %page, "content unchanged, skipping write");
            return Ok((out, revision));
        }

        doc.set_content(&self.config.content_key, &tree)?;
        let text = doc.render();
        self.backend.write(page, text.as_bytes())?;
        Ok((out, Revision::of(text.as_bytes())))
    }
}

impl std::fmt::Debug for DocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentStore")
            .field("config", &self.config)
            .field("layout", self.backend.layout())
            .finish()
    }
}

fn malformed(page: &PageId, err: StoreError) -> StoreError {
    match err {
        StoreError::Serialization(reason) => StoreError::Malformed {
            page: page.clone(),
            reason,
        },
        other => other,
    }
}

fn add_item(
    tree: &mut ContentNode,
    path: &FieldPath,
    template: Option<ContentNode>,
) -> StoreResult<(usize, ContentNode, usize)> {
    match resolve(tree, path) {
        Some(ContentNode::Array(_)) => {}
        Some(other) => return Err(not_an_array(path, other)),
        None => {
            assign(tree, path, ContentNode::array())?;
        }
    }
    let items = resolve_mut(tree, path)
        .and_then(ContentNode::as_array_mut)
        .ok_or_else(|| StoreError::InvalidPath(format!("{path} could not be created as an array")))?;

    let item = template.unwrap_or_else(|| match items.last() {
        Some(last) => last.blanked(),
        None => ContentNode::leaf(""),
    });
    items.push(item.clone());
    Ok((items.len() - 1, item, items.len()))
}

fn remove_item(
    tree: &mut ContentNode,
    path: &FieldPath,
    index: usize,
) -> StoreResult<(usize, ContentNode, usize)> {
    let items = match resolve_mut(tree, path) {
        Some(ContentNode::Array(items)) => items,
        Some(other) => return Err(not_an_array(path, other)),
        None => {
            return Err(StoreError::IndexOutOfRange {
                path: path.to_string(),
                index,
                len: 0,
            })
        }
    };
    if index >= items.len() {
        return Err(StoreError::IndexOutOfRange {
            path: path.to_string(),
            index,
            len: items.len(),
        });
    }
    let item = items.remove(index);
    Ok((index, item, items.len()))
}

fn not_an_array(path: &FieldPath, node: &ContentNode) -> StoreError {
    StoreError::Validation(format!("{path} is {}, not an array", node.kind()))
}
