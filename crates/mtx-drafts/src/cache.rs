//! The draft cache trait and the in-memory set shared by its backends.

use std::collections::BTreeMap;

use mtx_types::{FieldPath, PageId};
use serde::{Deserialize, Serialize};

use crate::entry::DraftEntry;
use crate::error::DraftResult;

/// Client-local store of pending field edits.
///
/// Implementations must satisfy these invariants:
/// - At most one draft exists per `(page, path)`; `save` replaces it without
///   consulting the document store.
/// - Enumeration lists a page's drafts ordered by path.
/// - `clear_if_current` only removes a draft that is unchanged since it was
///   read, so an edit saved during a sync survives that sync.
pub trait DraftCache: Send + Sync {
    /// Save a draft, replacing any pending draft for the same key.
    fn save(&self, page: &PageId, path: &FieldPath, value: &str) -> DraftResult<DraftEntry>;

    /// The pending draft for a key, if any.
    fn get(&self, page: &PageId, path: &FieldPath) -> DraftResult<Option<DraftEntry>>;

    /// All pending drafts for a page.
    fn enumerate(&self, page: &PageId) -> DraftResult<Vec<DraftEntry>>;

    /// Remove the draft for a key. Returns `true` if one was pending.
    fn clear(&self, page: &PageId, path: &FieldPath) -> DraftResult<bool>;

    /// Remove every draft for a page. Returns how many were removed.
    fn clear_page(&self, page: &PageId) -> DraftResult<usize>;

    /// Remove the draft for `entry`'s key only if it still equals `entry`.
    fn clear_if_current(&self, entry: &DraftEntry) -> DraftResult<bool>;

    /// Pages with at least one pending draft, sorted.
    fn pages(&self) -> DraftResult<Vec<PageId>>;
}

/// Drafts grouped by page, then by dotted path.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<DraftEntry>", into = "Vec<DraftEntry>")]
pub struct DraftSet {
    pages: BTreeMap<PageId, BTreeMap<String, DraftEntry>>,
}

impl DraftSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of pending drafts.
    pub fn len(&self) -> usize {
        self.pages.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Insert a draft, returning the one it superseded.
    pub fn insert(&mut self, entry: DraftEntry) -> Option<DraftEntry> {
        self.pages
            .entry(entry.page_id.clone())
            .or_default()
            .insert(entry.key(), entry)
    }

    pub fn get(&self, page: &PageId, path: &FieldPath) -> Option<&DraftEntry> {
        self.pages.get(page)?.get(&path.to_string())
    }

    pub fn enumerate(&self, page: &PageId) -> Vec<DraftEntry> {
        self.pages
            .get(page)
            .map(|drafts| drafts.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn remove(&mut self, page: &PageId, path: &FieldPath) -> Option<DraftEntry> {
        let drafts = self.pages.get_mut(page)?;
        let removed = drafts.remove(&path.to_string());
        if drafts.is_empty() {
            self.pages.remove(page);
        }
        removed
    }

    pub fn remove_page(&mut self, page: &PageId) -> usize {
        self.pages.remove(page).map_or(0, |drafts| drafts.len())
    }

    pub fn remove_if_current(&mut self, entry: &DraftEntry) -> bool {
        if self.get(&entry.page_id, &entry.path) == Some(entry) {
            self.remove(&entry.page_id, &entry.path);
            true
        } else {
            false
        }
    }

    pub fn pages(&self) -> Vec<PageId> {
        self.pages.keys().cloned().collect()
    }

    /// Every draft, ordered by page then path.
    pub fn entries(&self) -> impl Iterator<Item = &DraftEntry> {
        self.pages.values().flat_map(BTreeMap::values)
    }
}

impl From<Vec<DraftEntry>> for DraftSet {
    fn from(entries: Vec<DraftEntry>) -> Self {
        let mut set = Self::new();
        for entry in entries {
            set.insert(entry);
        }
        set
    }
}

impl From<DraftSet> for Vec<DraftEntry> {
    fn from(set: DraftSet) -> Self {
        set.pages
            .into_values()
            .flat_map(BTreeMap::into_values)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(page: &str, path: &str, value: &str) -> DraftEntry {
        DraftEntry::new(
            PageId::parse(page).unwrap(),
            FieldPath::parse(path).unwrap(),
            value,
        )
    }

    #[test]
    fn insert_supersedes_same_key() {
        let mut set = DraftSet::new();
        assert!(set.insert(entry("home", "a", "1")).is_none());
        let old = set.insert(entry("home", "a", "2")).unwrap();
        assert_eq!(old.value, "1");
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn remove_last_draft_drops_page() {
        let mut set = DraftSet::new();
        let e = entry("home", "a", "1");
        set.insert(e.clone());
        set.remove(&e.page_id, &e.path);
        assert!(set.is_empty());
        assert!(set.pages().is_empty());
    }

    #[test]
    fn remove_if_current_ignores_newer_draft() {
        let mut set = DraftSet::new();
        let first = entry("home", "a", "1");
        set.insert(first.clone());
        set.insert(entry("home", "a", "2"));
        assert!(!set.remove_if_current(&first));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn serializes_as_flat_list() {
        let mut set = DraftSet::new();
        set.insert(entry("home", "b", "2"));
        set.insert(entry("about", "a", "1"));
        let json = serde_json::to_value(&set).unwrap();
        let list = json.as_array().unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0]["pageId"], "about");

        let back: DraftSet = serde_json::from_value(json).unwrap();
        assert_eq!(back, set);
    }
}
