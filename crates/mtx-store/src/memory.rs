use std::collections::BTreeMap;
use std::sync::RwLock;

use mtx_types::PageId;

use crate::error::StoreResult;
use crate::layout::ContentLayout;
use crate::traits::DocumentBackend;

/// In-memory, BTreeMap-based document backend.
///
/// Intended for tests and embedding. Documents are held in memory behind a
/// `RwLock` for safe concurrent access and cloned on read/write.
pub struct InMemoryBackend {
    layout: ContentLayout,
    documents: RwLock<BTreeMap<PageId, Vec<u8>>>,
}

impl InMemoryBackend {
    /// Create a new empty backend with the default layout.
    pub fn new() -> Self {
        Self::with_layout(ContentLayout::default())
    }

    pub fn with_layout(layout: ContentLayout) -> Self {
        Self {
            layout,
            documents: RwLock::new(BTreeMap::new()),
        }
    }

    /// Seed a page with raw document text.
    pub fn insert(&self, page: PageId, text: impl Into<String>) {
        self.documents
            .write()
            .expect("lock poisoned")
            .insert(page, text.into().into_bytes());
    }

    /// Remove a page. Returns `true` if it existed.
    pub fn remove(&self, page: &PageId) -> bool {
        self.documents
            .write()
            .expect("lock poisoned")
            .remove(page)
            .is_some()
    }

    /// Number of pages currently stored.
    pub fn len(&self) -> usize {
        self.documents.read().expect("lock poisoned").len()
    }

    /// Returns `true` if no pages are stored.
    pub fn is_empty(&self) -> bool {
        self.documents.read().expect("lock poisoned").is_empty()
    }

    /// Every document keyed by its relative file path.
    pub fn files(&self) -> BTreeMap<String, Vec<u8>> {
        self.documents
            .read()
            .expect("lock poisoned")
            .iter()
            .map(|(page, data)| (self.layout.file_for(page), data.clone()))
            .collect()
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentBackend for InMemoryBackend {
    fn read(&self, page: &PageId) -> StoreResult<Option<Vec<u8>>> {
        let map = self.documents.read().expect("lock poisoned");
        Ok(map.get(page).cloned())
    }

    fn write(&self, page: &PageId, data: &[u8]) -> StoreResult<()> {
        let mut map = self.documents.write().expect("lock poisoned");
        map.insert(page.clone(), data.to_vec());
        Ok(())
    }

    fn exists(&self, page: &PageId) -> StoreResult<bool> {
        let map = self.documents.read().expect("lock poisoned");
        Ok(map.contains_key(page))
    }

    fn list(&self) -> StoreResult<Vec<PageId>> {
        let map = self.documents.read().expect("lock poisoned");
        Ok(map.keys().cloned().collect())
    }

    fn layout(&self) -> &ContentLayout {
        &self.layout
    }
}

impl std::fmt::Debug for InMemoryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryBackend")
            .field("page_count", &self.len())
            .finish()
    }
}
