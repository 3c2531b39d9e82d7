use std::sync::Arc;

use futures::stream::{self, StreamExt};
use mtx_drafts::{DraftCache, DraftEntry};
use mtx_types::PageId;

use crate::error::SyncResult;
use crate::types::{KeyFailure, SyncConfig, SyncReport};
use crate::writer::FieldWriter;

/// Drains pending drafts into a [`FieldWriter`].
pub struct SyncEngine {
    drafts: Arc<dyn DraftCache>,
    writer: Arc<dyn FieldWriter>,
    config: SyncConfig,
}

impl SyncEngine {
    pub fn new(drafts: Arc<dyn DraftCache>, writer: Arc<dyn FieldWriter>) -> Self {
        Self::with_config(drafts, writer, SyncConfig::default())
    }

    pub fn with_config(
        drafts: Arc<dyn DraftCache>,
        writer: Arc<dyn FieldWriter>,
        config: SyncConfig,
    ) -> Self {
        Self {
            drafts,
            writer,
            config,
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Write every pending draft of `page`, one key after another.
    ///
    /// Each successful write clears its draft, unless the draft was replaced
    /// while the write was in flight. Failed keys keep their drafts and are
    /// listed in the report; the call itself only fails if the draft cache
    /// cannot be read.
    ///
    /// Every write rewrites the whole document, so keys of one page are never
    /// written concurrently.
    pub async fn sync(&self, page: &PageId) -> SyncResult<SyncReport> {
        let entries = self.drafts.enumerate(page)?;
        if entries.is_empty() {
            tracing::debug!(page = %page, "nothing to sync");
            return Ok(SyncReport::default());
        }

        let mut report = SyncReport::default();
        for entry in entries {
            let result = self
                .writer
                .set_field(&entry.page_id, &entry.path, &entry.value)
                .await;
            match result {
                Ok(write) => match self.drafts.clear_if_current(&entry) {
                    Ok(true) => report.applied.push(write),
                    Ok(false) => {
                        report.superseded += 1;
                        report.applied.push(write);
                    }
                    Err(e) => report.failed.push(self.failure(&entry, e.to_string())),
                },
                Err(e) => report.failed.push(self.failure(&entry, e.to_string())),
            }
        }

        tracing::info!(
            page = %page,
            applied = report.applied.len(),
            failed = report.failed.len(),
            superseded = report.superseded,
            "sync finished"
        );
        Ok(report)
    }

    /// Sync every page that has pending drafts.
    ///
    /// Up to `max_in_flight` pages are synced at once.
    pub async fn sync_all(&self) -> SyncResult<SyncReport> {
        let pages = self.drafts.pages()?;
        let limit = self.config.max_in_flight.max(1);
        let reports: Vec<SyncResult<SyncReport>> = stream::iter(pages)
            .map(|page| async move { self.sync(&page).await })
            .buffered(limit)
            .collect()
            .await;

        let mut report = SyncReport::default();
        for page_report in reports {
            report.merge(page_report?);
        }
        Ok(report)
    }

    fn failure(&self, entry: &DraftEntry, error: String) -> KeyFailure {
        tracing::warn!(
            page = %entry.page_id,
            path = %entry.path,
            error = %error,
            "draft sync failed"
        );
        KeyFailure {
            page_id: entry.page_id.clone(),
            path: entry.path.clone(),
            error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use mtx_drafts::InMemoryDraftCache;
    use mtx_store::{DocumentStore, FieldWrite, InMemoryBackend};
    use mtx_types::{FieldPath, Revision};

    use crate::error::{SyncError, SyncResult};

    fn page(id: &str) -> PageId {
        PageId::parse(id).unwrap()
    }

    fn path(p: &str) -> FieldPath {
        FieldPath::parse(p).unwrap()
    }

    /// Records writes and fails for the configured paths.
    #[derive(Default)]
    struct ScriptedWriter {
        failing: Mutex<HashSet<String>>,
        written: Mutex<Vec<(String, String)>>,
    }

    impl ScriptedWriter {
        fn failing(paths: &[&str]) -> Self {
            Self {
                failing: Mutex::new(paths.iter().map(|p| p.to_string()).collect()),
                ..Default::default()
            }
        }

        fn heal(&self) {
            self.failing.lock().unwrap().clear();
        }

        fn written(&self) -> Vec<(String, String)> {
            self.written.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl FieldWriter for ScriptedWriter {
        async fn set_field(
            &self,
            page: &PageId,
            path: &FieldPath,
            value: &str,
        ) -> SyncResult<FieldWrite> {
            if self.failing.lock().unwrap().contains(&path.to_string()) {
                return Err(SyncError::Writer("connection reset".into()));
            }
            self.written
                .lock()
                .unwrap()
                .push((path.to_string(), value.to_string()));
            Ok(FieldWrite {
                page_id: page.clone(),
                path: path.clone(),
                previous_value: None,
                new_value: value.to_string(),
                revision: Revision::of(value.as_bytes()),
            })
        }
    }

    /// Saves a newer draft for the same key while the write is in flight.
    struct RacingWriter {
        drafts: Arc<InMemoryDraftCache>,
    }

    #[async_trait]
    impl FieldWriter for RacingWriter {
        async fn set_field(
            &self,
            page: &PageId,
            path: &FieldPath,
            value: &str,
        ) -> SyncResult<FieldWrite> {
            self.drafts.save(page, path, "newer")?;
            Ok(FieldWrite {
                page_id: page.clone(),
                path: path.clone(),
                previous_value: None,
                new_value: value.to_string(),
                revision: Revision::of(b""),
            })
        }
    }

    fn seeded_drafts() -> Arc<InMemoryDraftCache> {
        let drafts = Arc::new(InMemoryDraftCache::new());
        drafts.save(&page("home"), &path("a"), "1").unwrap();
        drafts.save(&page("home"), &path("b"), "2").unwrap();
        drafts.save(&page("home"), &path("c"), "3").unwrap();
        drafts
    }

    // -----------------------------------------------------------------------
    // sync
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn sync_clears_applied_drafts() {
        let drafts = seeded_drafts();
        let writer = Arc::new(ScriptedWriter::default());
        let engine = SyncEngine::new(drafts.clone(), writer.clone());

        let report = engine.sync(&page("home")).await.unwrap();
        assert_eq!(report.applied.len(), 3);
        assert!(report.is_clean());
        assert!(drafts.is_empty());
        assert_eq!(writer.written().len(), 3);
    }

    #[tokio::test]
    async fn failed_key_keeps_draft_and_others_continue() {
        let drafts = seeded_drafts();
        let writer = Arc::new(ScriptedWriter::failing(&["b"]));
        let engine = SyncEngine::new(drafts.clone(), writer.clone());

        let report = engine.sync(&page("home")).await.unwrap();
        assert_eq!(report.applied.len(), 2);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].path, path("b"));

        let pending = drafts.enumerate(&page("home")).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].value, "2");
        assert!(matches!(
            report.into_result(),
            Err(SyncError::PartialFailure { attempted: 3, .. })
        ));
    }

    #[tokio::test]
    async fn retry_only_touches_pending_keys() {
        let drafts = seeded_drafts();
        let writer = Arc::new(ScriptedWriter::failing(&["b"]));
        let engine = SyncEngine::new(drafts.clone(), writer.clone());

        engine.sync(&page("home")).await.unwrap();
        writer.heal();
        let report = engine.sync(&page("home")).await.unwrap();

        assert_eq!(report.applied.len(), 1);
        assert_eq!(report.applied[0].path, path("b"));
        assert!(drafts.is_empty());
        assert_eq!(writer.written().len(), 3);
    }

    #[tokio::test]
    async fn empty_page_is_noop() {
        let drafts = Arc::new(InMemoryDraftCache::new());
        let writer = Arc::new(ScriptedWriter::default());
        let engine = SyncEngine::new(drafts, writer.clone());
        let report = engine.sync(&page("home")).await.unwrap();
        assert_eq!(report.attempted(), 0);
        assert!(writer.written().is_empty());
    }

    #[tokio::test]
    async fn newer_draft_saved_during_sync_survives() {
        let drafts = Arc::new(InMemoryDraftCache::new());
        drafts.save(&page("home"), &path("a"), "older").unwrap();
        let writer = Arc::new(RacingWriter {
            drafts: drafts.clone(),
        });
        let engine = SyncEngine::new(drafts.clone(), writer);

        let report = engine.sync(&page("home")).await.unwrap();
        assert_eq!(report.superseded, 1);
        let pending = drafts.get(&page("home"), &path("a")).unwrap().unwrap();
        assert_eq!(pending.value, "newer");
    }

    #[tokio::test]
    async fn concurrent_sync_applies_everything() {
        let drafts = seeded_drafts();
        drafts.save(&page("about"), &path("title"), "Us").unwrap();
        let writer = Arc::new(ScriptedWriter::default());
        let engine = SyncEngine::with_config(
            drafts.clone(),
            writer.clone(),
            SyncConfig { max_in_flight: 4 },
        );
        let report = engine.sync_all().await.unwrap();
        assert_eq!(report.applied.len(), 4);
        assert!(drafts.is_empty());
    }

    // -----------------------------------------------------------------------
    // sync_all
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn sync_all_covers_every_page() {
        let drafts = seeded_drafts();
        drafts.save(&page("about"), &path("title"), "Us").unwrap();
        let writer = Arc::new(ScriptedWriter::default());
        let engine = SyncEngine::new(drafts.clone(), writer);

        let report = engine.sync_all().await.unwrap();
        assert_eq!(report.applied.len(), 4);
        assert!(drafts.pages().unwrap().is_empty());
    }

    // -----------------------------------------------------------------------
    // Document store as writer
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn syncs_into_document_store() {
        let backend = Arc::new(InMemoryBackend::new());
        backend.insert(
            page("home"),
            "---\ncontent:\n  hero:\n    headline: B\n---\nbody\n",
        );
        let store = Arc::new(DocumentStore::new(backend));
        let drafts = Arc::new(InMemoryDraftCache::new());
        drafts.save(&page("home"), &path("hero.headline"), "C").unwrap();
        drafts.save(&page("home"), &path("hero.headline.x"), "bad").unwrap();

        let engine = SyncEngine::new(drafts.clone(), store.clone());
        let report = engine.sync(&page("home")).await.unwrap();

        assert_eq!(report.applied.len(), 1);
        assert_eq!(report.applied[0].previous_value.as_deref(), Some("B"));
        assert_eq!(
            store
                .read_flat(&page("home"))
                .unwrap()
                .get("hero.headline")
                .map(String::as_str),
            Some("C")
        );
        let pending = drafts.enumerate(&page("home")).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].path, path("hero.headline.x"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_sync_keeps_every_key_of_a_page() {
        let backend = Arc::new(InMemoryBackend::new());
        backend.insert(page("home"), "---\ncontent:\n  title: Home\n---\nbody\n");
        backend.insert(page("about"), "---\ncontent:\n  title: About\n---\n");
        let store = Arc::new(DocumentStore::new(backend));
        let drafts = Arc::new(InMemoryDraftCache::new());
        for i in 0..40 {
            drafts
                .save(&page("home"), &path(&format!("k{i}")), &format!("v{i}"))
                .unwrap();
        }
        for i in 0..10 {
            drafts
                .save(&page("about"), &path(&format!("k{i}")), &format!("a{i}"))
                .unwrap();
        }

        let engine = SyncEngine::with_config(
            drafts.clone(),
            store.clone(),
            SyncConfig { max_in_flight: 8 },
        );
        let report = engine.sync_all().await.unwrap();
        assert_eq!(report.applied.len(), 50);
        assert!(report.failed.is_empty());
        assert!(drafts.is_empty());

        let home = store.read_flat(&page("home")).unwrap();
        for i in 0..40 {
            assert_eq!(
                home.get(&format!("k{i}")).map(String::as_str),
                Some(format!("v{i}").as_str())
            );
        }
        assert_eq!(home.get("title").map(String::as_str), Some("Home"));
        let about = store.read_flat(&page("about")).unwrap();
        assert_eq!(about.len(), 11);
    }
}
