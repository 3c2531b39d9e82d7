use mtx_types::PageId;

use crate::error::StoreResult;
use crate::layout::ContentLayout;

/// Raw byte storage for content documents, keyed by page id.
///
/// All implementations must satisfy these invariants:
/// - A page id maps to exactly one location, derived from the id through the
///   backend's [`ContentLayout`].
/// - No location outside the backend's content root is ever read or written.
/// - A write replaces the whole document; readers never observe a partially
///   written document.
/// - The backend never interprets document contents.
/// - All I/O errors are propagated, never silently ignored.
pub trait DocumentBackend: Send + Sync {
    /// Read the full document bytes for a page.
    ///
    /// Returns `Ok(None)` if the page has no document.
    fn read(&self, page: &PageId) -> StoreResult<Option<Vec<u8>>>;

    /// Replace the document for a page, creating it if needed.
    fn write(&self, page: &PageId, data: &[u8]) -> StoreResult<()>;

    /// Check whether a page has a document.
    fn exists(&self, page: &PageId) -> StoreResult<bool> {
        Ok(self.read(page)?.is_some())
    }

    /// All pages with a document, sorted by id.
    fn list(&self) -> StoreResult<Vec<PageId>>;

    /// File naming scheme used by this backend.
    fn layout(&self) -> &ContentLayout;
}
