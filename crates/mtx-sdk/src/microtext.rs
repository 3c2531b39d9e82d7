use std::sync::Arc;

use mtx_drafts::{
    overlay, DraftCache, DraftEntry, FileDraftCache, InMemoryDraftCache, RejectedDraft,
};
use mtx_publish::{
    GitVersionControl, InMemoryVersionControl, PublishGate, PublishOutcome, PublishStatus,
    VersionControl,
};
use mtx_store::{
    ArrayOpRequest, ArrayOpResult, DocumentBackend, DocumentStore, FieldWrite, FsBackend,
    InMemoryBackend,
};
use mtx_sync::{SyncEngine, SyncReport};
use mtx_tools::{CommandInterpreter, Interpreter, ToolSurface};
use mtx_types::{ContentNode, FieldPath, FlatMap, PageId};

use crate::config::{MicrotextConfig, PublishBackend};
use crate::error::{SdkError, SdkResult};

/// High-level Microtext API.
pub struct Microtext {
    config: MicrotextConfig,
    store: DocumentStore,
    drafts: Arc<dyn DraftCache>,
    sync: SyncEngine,
    publish: Option<PublishGate>,
    tools: ToolSurface,
}

impl Microtext {
    /// Open the content root, draft file and repository named by `config`.
    pub fn open(config: MicrotextConfig) -> SdkResult<Self> {
        config.validate()?;
        let backend = FsBackend::create(&config.content_root, config.layout())?;
        let content_root = backend.root().to_path_buf();

        let drafts: Arc<dyn DraftCache> = match &config.drafts_file {
            Some(path) => Arc::new(FileDraftCache::open(path)?),
            None => Arc::new(InMemoryDraftCache::new()),
        };
        let vcs: Option<Arc<dyn VersionControl>> = match config.publish.backend {
            PublishBackend::Git => Some(Arc::new(GitVersionControl::open(
                &content_root,
                config.publish.author(),
            )?)),
            PublishBackend::None => None,
        };
        let interpreter: Option<Arc<dyn Interpreter>> = if config.interpreter.command.is_empty() {
            None
        } else {
            Some(Arc::new(CommandInterpreter::from_argv(
                &config.interpreter.command,
            )?))
        };

        tracing::info!(root = %content_root.display(), "microtext opened");
        Ok(Self::assemble(config, Arc::new(backend), drafts, vcs, interpreter))
    }

    /// Everything in memory, with no pages and publishing enabled.
    pub fn in_memory() -> Self {
        Self::in_memory_with(Arc::new(InMemoryBackend::new()))
    }

    /// In-memory drafts and version control over `backend`. The backend's
    /// current pages count as already published.
    pub fn in_memory_with(backend: Arc<InMemoryBackend>) -> Self {
        let vcs: Arc<dyn VersionControl> = Arc::new(InMemoryVersionControl::new(backend.clone()));
        let config = MicrotextConfig {
            drafts_file: None,
            ..MicrotextConfig::default()
        };
        Self::assemble(
            config,
            backend,
            Arc::new(InMemoryDraftCache::new()),
            Some(vcs),
            None,
        )
    }

    fn assemble(
        config: MicrotextConfig,
        backend: Arc<dyn DocumentBackend>,
        drafts: Arc<dyn DraftCache>,
        vcs: Option<Arc<dyn VersionControl>>,
        interpreter: Option<Arc<dyn Interpreter>>,
    ) -> Self {
        let layout = backend.layout().clone();
        let store = DocumentStore::with_config(backend, config.store_config());
        let sync = SyncEngine::with_config(
            drafts.clone(),
            Arc::new(store.clone()),
            config.sync.clone(),
        );
        let publish = vcs.map(|vcs| PublishGate::new(vcs, layout));
        let mut tools = ToolSurface::new(store.clone());
        if let Some(interpreter) = interpreter {
            tools = tools.with_interpreter(interpreter);
        }
        Self {
            config,
            store,
            drafts,
            sync,
            publish,
            tools,
        }
    }

    /// Replace the interpreter used by `interpret-instruction`.
    pub fn with_interpreter(mut self, interpreter: Arc<dyn Interpreter>) -> Self {
        self.tools = ToolSurface::new(self.store.clone()).with_interpreter(interpreter);
        self
    }

    // ---- Content ----

    pub fn pages(&self) -> SdkResult<Vec<PageId>> {
        Ok(self.store.list_pages()?)
    }

    pub fn read(&self, page: &PageId) -> SdkResult<ContentNode> {
        Ok(self.store.get(page)?)
    }

    pub fn read_flat(&self, page: &PageId) -> SdkResult<FlatMap> {
        Ok(self.store.read_flat(page)?)
    }

    /// The stored tree with pending drafts applied on top, as an editor
    /// shows it. Drafts that no longer fit the tree are returned alongside.
    pub fn read_with_drafts(&self, page: &PageId) -> SdkResult<(ContentNode, Vec<RejectedDraft>)> {
        let mut tree = self.store.get(page)?;
        let rejected = overlay(&mut tree, &self.drafts.enumerate(page)?);
        Ok((tree, rejected))
    }

    pub fn set_field(&self, page: &PageId, path: &FieldPath, value: &str) -> SdkResult<FieldWrite> {
        Ok(self.store.set_field(page, path, value)?)
    }

    pub fn array_op(&self, request: &ArrayOpRequest) -> SdkResult<ArrayOpResult> {
        Ok(self.store.array_op(request)?)
    }

    // ---- Drafts and sync ----

    pub fn save_draft(
        &self,
        page: &PageId,
        path: &FieldPath,
        value: &str,
    ) -> SdkResult<DraftEntry> {
        Ok(self.drafts.save(page, path, value)?)
    }

    pub fn drafts(&self, page: &PageId) -> SdkResult<Vec<DraftEntry>> {
        Ok(self.drafts.enumerate(page)?)
    }

    /// Every pending draft, grouped by page.
    pub fn all_drafts(&self) -> SdkResult<Vec<DraftEntry>> {
        let mut all = Vec::new();
        for page in self.drafts.pages()? {
            all.extend(self.drafts.enumerate(&page)?);
        }
        Ok(all)
    }

    /// Drop a page's drafts without writing them. Returns how many were
    /// dropped.
    pub fn discard_drafts(&self, page: &PageId) -> SdkResult<usize> {
        Ok(self.drafts.clear_page(page)?)
    }

    pub async fn sync(&self, page: &PageId) -> SdkResult<SyncReport> {
        Ok(self.sync.sync(page).await?)
    }

    pub async fn sync_all(&self) -> SdkResult<SyncReport> {
        Ok(self.sync.sync_all().await?)
    }

    // ---- Publishing ----

    pub fn publish_status(&self) -> SdkResult<PublishStatus> {
        Ok(self.gate()?.status()?)
    }

    pub fn publish(&self, message: Option<&str>) -> SdkResult<PublishOutcome> {
        Ok(self.gate()?.publish(message)?)
    }

    pub fn publishing_enabled(&self) -> bool {
        self.publish.is_some()
    }

    fn gate(&self) -> SdkResult<&PublishGate> {
        self.publish.as_ref().ok_or(SdkError::PublishDisabled)
    }

    // ---- Accessors ----

    pub fn config(&self) -> &MicrotextConfig {
        &self.config
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    pub fn draft_cache(&self) -> &Arc<dyn DraftCache> {
        &self.drafts
    }

    pub fn sync_engine(&self) -> &SyncEngine {
        &self.sync
    }

    pub fn tools(&self) -> &ToolSurface {
        &self.tools
    }
}

impl std::fmt::Debug for Microtext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Microtext")
            .field("config", &self.config)
            .field("store", &self.store)
            .field("publishing", &self.publish.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mtx_drafts::DraftError;
    use mtx_tools::{FixedInterpreter, ProposedChange};
    use mtx_types::resolve_leaf;

    fn page(id: &str) -> PageId {
        PageId::parse(id).unwrap()
    }

    fn path(p: &str) -> FieldPath {
        FieldPath::parse(p).unwrap()
    }

    fn seeded() -> Microtext {
        let backend = Arc::new(InMemoryBackend::new());
        backend.insert(
            page("home"),
            "---\ncontent:\n  hero:\n    heading: Welcome\n---\nbody\n",
        );
        Microtext::in_memory_with(backend)
    }

    #[test]
    fn in_memory_starts_empty() {
        let mt = Microtext::in_memory();
        assert!(mt.pages().unwrap().is_empty());
        assert!(mt.publish_status().unwrap().is_clean());
    }

    #[test]
    fn read_with_drafts_overlays() {
        let mt = seeded();
        mt.save_draft(&page("home"), &path("hero.heading"), "Draft")
            .unwrap();
        mt.save_draft(&page("home"), &path("hero.heading.x"), "Bad")
            .unwrap();

        let (tree, rejected) = mt.read_with_drafts(&page("home")).unwrap();
        assert_eq!(resolve_leaf(&tree, &path("hero.heading")), Some("Draft"));
        assert_eq!(rejected.len(), 1);
        // The stored tree is untouched.
        let stored = mt.read(&page("home")).unwrap();
        assert_eq!(resolve_leaf(&stored, &path("hero.heading")), Some("Welcome"));
    }

    #[test]
    fn publish_after_write() {
        let mt = seeded();
        mt.set_field(&page("home"), &path("hero.heading"), "Hi")
            .unwrap();
        assert_eq!(mt.publish_status().unwrap().unpublished_changes, 1);
        let outcome = mt.publish(None).unwrap();
        assert!(outcome.published);
        assert_eq!(outcome.message.as_deref(), Some("Update content: home"));
        assert!(mt.publish_status().unwrap().is_clean());
    }

    #[test]
    fn discard_drafts() {
        let mt = seeded();
        mt.save_draft(&page("home"), &path("a"), "1").unwrap();
        mt.save_draft(&page("home"), &path("b"), "2").unwrap();
        assert_eq!(mt.all_drafts().unwrap().len(), 2);
        assert_eq!(mt.discard_drafts(&page("home")).unwrap(), 2);
        assert!(mt.drafts(&page("home")).unwrap().is_empty());
    }

    #[tokio::test]
    async fn interpreter_is_wired_into_tools() {
        let mt = seeded().with_interpreter(Arc::new(FixedInterpreter::new(vec![
            ProposedChange::new("hero.heading", Some("Welcome"), "Hello"),
        ])));
        let report = mt
            .tools()
            .interpret_instruction(&page("home"), "greet")
            .await
            .unwrap();
        assert_eq!(report.applied(), 1);
        let tree = mt.read(&page("home")).unwrap();
        assert_eq!(resolve_leaf(&tree, &path("hero.heading")), Some("Hello"));
    }

    #[test]
    fn open_without_publishing() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = MicrotextConfig::for_root(dir.path().join("content"));
        config.drafts_file = Some(dir.path().join("drafts.json"));
        config.publish.backend = PublishBackend::None;

        let mt = Microtext::open(config).unwrap();
        assert!(mt.pages().unwrap().is_empty());
        assert!(matches!(mt.publish(None), Err(SdkError::PublishDisabled)));
    }

    #[test]
    fn open_with_corrupt_drafts_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("drafts.json"), "not json").unwrap();
        let mut config = MicrotextConfig::for_root(dir.path().join("content"));
        config.drafts_file = Some(dir.path().join("drafts.json"));
        config.publish.backend = PublishBackend::None;

        assert!(matches!(
            Microtext::open(config),
            Err(SdkError::Draft(DraftError::Serialization(_)))
        ));
    }
}
