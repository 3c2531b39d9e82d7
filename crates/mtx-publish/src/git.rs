//! Git-backed version control via libgit2.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use git2::{Commit, Repository, Signature, Status, StatusOptions, StatusShow};
use serde::{Deserialize, Serialize};

use crate::error::{PublishError, PublishResult};
use crate::status::{ChangeKind, PendingChange};
use crate::vcs::{CommitId, VersionControl};

/// Commit author used when publishing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitAuthor {
    pub name: String,
    pub email: String,
}

impl Default for GitAuthor {
    fn default() -> Self {
        Self {
            name: "Microtext".into(),
            email: "microtext@localhost".into(),
        }
    }
}

/// A git repository whose working tree contains the content root.
///
/// Only paths under the content root are reported or committed; anything
/// else in the repository is left alone.
pub struct GitVersionControl {
    repo: Mutex<Repository>,
    /// Content root relative to the repository working directory.
    prefix: PathBuf,
    author: Option<GitAuthor>,
}

impl GitVersionControl {
    /// Open the repository containing `content_root`.
    ///
    /// Commits are authored by `author` if given, otherwise by the
    /// repository's configured user, falling back to [`GitAuthor::default`].
    pub fn open(content_root: impl AsRef<Path>, author: Option<GitAuthor>) -> PublishResult<Self> {
        let content_root = content_root.as_ref().canonicalize()?;
        let repo = Repository::discover(&content_root)?;
        let workdir = repo
            .workdir()
            .ok_or_else(|| PublishError::Repository("repository has no working directory".into()))?
            .canonicalize()?;
        let prefix = content_root
            .strip_prefix(&workdir)
            .map_err(|_| {
                PublishError::Repository(format!(
                    "{} is not inside {}",
                    content_root.display(),
                    workdir.display()
                ))
            })?
            .to_path_buf();

        tracing::debug!(workdir = %workdir.display(), prefix = %prefix.display(), "git repository opened");
        Ok(Self {
            repo: Mutex::new(repo),
            prefix,
            author,
        })
    }

    /// Initialize a new repository at `content_root` and open it.
    pub fn init(content_root: impl AsRef<Path>, author: Option<GitAuthor>) -> PublishResult<Self> {
        Repository::init(content_root.as_ref())?;
        Self::open(content_root, author)
    }

    fn lock(&self) -> PublishResult<std::sync::MutexGuard<'_, Repository>> {
        self.repo
            .lock()
            .map_err(|_| PublishError::Repository("failed to acquire repository lock".into()))
    }

    fn prefix_str(&self) -> String {
        self.prefix.to_string_lossy().replace('\\', "/")
    }

    /// Repository-relative path for a content-relative path.
    fn repo_path(&self, relative: &str) -> String {
        let prefix = self.prefix_str();
        if prefix.is_empty() {
            relative.to_string()
        } else {
            format!("{prefix}/{relative}")
        }
    }

    /// Content-relative path for a repository-relative path, if it lies
    /// under the content root.
    fn content_path(&self, repo_path: &str) -> Option<String> {
        let prefix = self.prefix_str();
        if prefix.is_empty() {
            Some(repo_path.to_string())
        } else {
            repo_path
                .strip_prefix(&prefix)
                .and_then(|rest| rest.strip_prefix('/'))
                .map(str::to_string)
        }
    }

    fn signature(&self, repo: &Repository) -> PublishResult<Signature<'static>> {
        let author = match &self.author {
            Some(author) => author.clone(),
            None => match repo.signature() {
                Ok(sig) => return Ok(sig.to_owned()),
                Err(_) => GitAuthor::default(),
            },
        };
        Ok(Signature::now(&author.name, &author.email)?)
    }
}

fn change_kind(status: Status) -> Option<ChangeKind> {
    if status.is_wt_deleted() || status.is_index_deleted() {
        Some(ChangeKind::Deleted)
    } else if status.is_wt_new() || status.is_index_new() {
        Some(ChangeKind::Added)
    } else if status.is_wt_modified()
        || status.is_index_modified()
        || status.is_wt_renamed()
        || status.is_index_renamed()
        || status.is_wt_typechange()
        || status.is_index_typechange()
    {
        Some(ChangeKind::Modified)
    } else {
        None
    }
}

impl VersionControl for GitVersionControl {
    fn pending_changes(&self) -> PublishResult<Vec<PendingChange>> {
        let repo = self.lock()?;

        let mut opts = StatusOptions::new();
        opts.include_untracked(true)
            .recurse_untracked_dirs(true)
            .show(StatusShow::IndexAndWorkdir);
        let prefix = self.prefix_str();
        if !prefix.is_empty() {
            opts.pathspec(&prefix);
        }

        let statuses = repo.statuses(Some(&mut opts))?;
        let mut changes = Vec::with_capacity(statuses.len());
        for entry in statuses.iter() {
            let (Some(path), Some(kind)) = (entry.path(), change_kind(entry.status())) else {
                continue;
            };
            if let Some(relative) = self.content_path(path) {
                changes.push(PendingChange::new(relative, kind));
            }
        }
        changes.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(changes)
    }

    fn commit(&self, changes: &[PendingChange], message: &str) -> PublishResult<CommitId> {
        let failed = |e: git2::Error| PublishError::PublishFailed(e.message().to_string());
        if message.trim().is_empty() {
            return Err(PublishError::PublishFailed("commit message cannot be empty".into()));
        }

        let repo = self.lock()?;
        let mut index = repo.index().map_err(failed)?;
        for change in changes {
            let path = self.repo_path(&change.path);
            match change.kind {
                ChangeKind::Deleted => index.remove_path(Path::new(&path)).map_err(failed)?,
                ChangeKind::Added | ChangeKind::Modified => {
                    index.add_path(Path::new(&path)).map_err(failed)?
                }
            }
        }

        // The staged index is only persisted once the commit exists.
        let tree_oid = index.write_tree().map_err(failed)?;
        let tree = repo.find_tree(tree_oid).map_err(failed)?;
        let sig = self.signature(&repo)?;
        let parent = match repo.head() {
            Ok(head) => Some(head.peel_to_commit().map_err(failed)?),
            Err(_) => None,
        };
        let parents: Vec<&Commit> = parent.iter().collect();
        let oid = repo
            .commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
            .map_err(failed)?;
        index.write().map_err(failed)?;

        tracing::info!(commit = %oid, files = changes.len(), "content committed");
        Ok(CommitId(oid.to_string()))
    }
}

impl std::fmt::Debug for GitVersionControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitVersionControl")
            .field("prefix", &self.prefix)
            .field("author", &self.author)
            .finish()
    }
}
