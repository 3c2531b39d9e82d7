use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use mtx_store::InMemoryBackend;
use mtx_types::Revision;

use crate::error::{PublishError, PublishResult};
use crate::status::{ChangeKind, PendingChange};
use crate::vcs::{CommitId, VersionControl};

/// A commit recorded by [`InMemoryVersionControl`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitRecord {
    pub id: CommitId,
    pub message: String,
    pub files: Vec<PendingChange>,
}

/// Version control over an [`InMemoryBackend`].
///
/// Keeps the revision of every file as of the last commit and compares it
/// against the backend's current contents. Intended for tests and embedding;
/// [`fail_next_commit`](Self::fail_next_commit) makes the next commit fail.
pub struct InMemoryVersionControl {
    backend: Arc<InMemoryBackend>,
    committed: RwLock<BTreeMap<String, Revision>>,
    log: RwLock<Vec<CommitRecord>>,
    fail_next: AtomicBool,
}

impl InMemoryVersionControl {
    /// Track `backend`, treating its current contents as already committed.
    pub fn new(backend: Arc<InMemoryBackend>) -> Self {
        let vcs = Self::empty(backend);
        *vcs.committed.write().expect("lock poisoned") = vcs.snapshot();
        vcs
    }

    /// Track `backend` with no commits, so every file starts out added.
    pub fn empty(backend: Arc<InMemoryBackend>) -> Self {
        Self {
            backend,
            committed: RwLock::new(BTreeMap::new()),
            log: RwLock::new(Vec::new()),
            fail_next: AtomicBool::new(false),
        }
    }

    /// Make the next call to `commit` fail without recording anything.
    pub fn fail_next_commit(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    /// Commits recorded so far, oldest first.
    pub fn commits(&self) -> Vec<CommitRecord> {
        self.log.read().expect("lock poisoned").clone()
    }

    fn snapshot(&self) -> BTreeMap<String, Revision> {
        self.backend
            .files()
            .into_iter()
            .map(|(path, data)| (path, Revision::of(&data)))
            .collect()
    }
}

impl VersionControl for InMemoryVersionControl {
    fn pending_changes(&self) -> PublishResult<Vec<PendingChange>> {
        let current = self.snapshot();
        let committed = self.committed.read().expect("lock poisoned");

        let mut changes = Vec::new();
        for (path, revision) in &current {
            match committed.get(path) {
                None => changes.push(PendingChange::new(path.clone(), ChangeKind::Added)),
                Some(old) if old != revision => {
                    changes.push(PendingChange::new(path.clone(), ChangeKind::Modified))
                }
                Some(_) => {}
            }
        }
        for path in committed.keys() {
            if !current.contains_key(path) {
                changes.push(PendingChange::new(path.clone(), ChangeKind::Deleted));
            }
        }
        changes.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(changes)
    }

    fn commit(&self, changes: &[PendingChange], message: &str) -> PublishResult<CommitId> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(PublishError::PublishFailed("injected commit failure".into()));
        }
        if message.trim().is_empty() {
            return Err(PublishError::PublishFailed("commit message cannot be empty".into()));
        }

        let current = self.snapshot();
        let mut committed = self.committed.write().expect("lock poisoned");
        let mut log = self.log.write().expect("lock poisoned");

        let mut fingerprint = format!("{}\n{message}\n", log.len());
        for change in changes {
            match current.get(&change.path) {
                Some(revision) if change.kind != ChangeKind::Deleted => {
                    committed.insert(change.path.clone(), *revision);
                    fingerprint.push_str(&format!("{} {}\n", change.path, revision));
                }
                _ => {
                    committed.remove(&change.path);
                    fingerprint.push_str(&format!("{} -\n", change.path));
                }
            }
        }

        let id = CommitId(Revision::of(fingerprint.as_bytes()).to_hex());
        log.push(CommitRecord {
            id: id.clone(),
            message: message.to_string(),
            files: changes.to_vec(),
        });
        Ok(id)
    }
}

impl std::fmt::Debug for InMemoryVersionControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryVersionControl")
            .field("commits", &self.log.read().expect("lock poisoned").len())
            .finish()
    }
}
