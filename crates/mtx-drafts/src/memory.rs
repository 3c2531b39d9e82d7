use std::sync::RwLock;

use mtx_types::{FieldPath, PageId};

use crate::cache::{DraftCache, DraftSet};
use crate::entry::DraftEntry;
use crate::error::DraftResult;

/// In-memory draft cache. Drafts are lost when the process exits.
#[derive(Debug, Default)]
pub struct InMemoryDraftCache {
    drafts: RwLock<DraftSet>,
}

impl InMemoryDraftCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of pending drafts across all pages.
    pub fn len(&self) -> usize {
        self.drafts.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.drafts.read().expect("lock poisoned").is_empty()
    }
}

impl DraftCache for InMemoryDraftCache {
    fn save(&self, page: &PageId, path: &FieldPath, value: &str) -> DraftResult<DraftEntry> {
        let entry = DraftEntry::new(page.clone(), path.clone(), value);
        let mut drafts = self.drafts.write().expect("lock poisoned");
        if drafts.insert(entry.clone()).is_some() {
            tracing::trace!(page = %page, path = %path, "draft superseded");
        }
        Ok(entry)
    }

    fn get(&self, page: &PageId, path: &FieldPath) -> DraftResult<Option<DraftEntry>> {
        let drafts = self.drafts.read().expect("lock poisoned");
        Ok(drafts.get(page, path).cloned())
    }

    fn enumerate(&self, page: &PageId) -> DraftResult<Vec<DraftEntry>> {
        let drafts = self.drafts.read().expect("lock poisoned");
        Ok(drafts.enumerate(page))
    }

    fn clear(&self, page: &PageId, path: &FieldPath) -> DraftResult<bool> {
        let mut drafts = self.drafts.write().expect("lock poisoned");
        Ok(drafts.remove(page, path).is_some())
    }

    fn clear_page(&self, page: &PageId) -> DraftResult<usize> {
        let mut drafts = self.drafts.write().expect("lock poisoned");
        Ok(drafts.remove_page(page))
    }

    fn clear_if_current(&self, entry: &DraftEntry) -> DraftResult<bool> {
        let mut drafts = self.drafts.write().expect("lock poisoned");
        Ok(drafts.remove_if_current(entry))
    }

    fn pages(&self) -> DraftResult<Vec<PageId>> {
        let drafts = self.drafts.read().expect("lock poisoned");
        Ok(drafts.pages())
    }
}
