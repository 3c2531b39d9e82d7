use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use mtx_types::PageId;
use tempfile::NamedTempFile;
use walkdir::WalkDir;

use crate::error::{StoreError, StoreResult};
use crate::layout::ContentLayout;
use crate::traits::DocumentBackend;

/// Filesystem document backend: one file per page under a content root.
///
/// Page `blog/launch` lives at `<root>/blog/launch.md`. Every location is
/// resolved against the canonical root, following symlinks, before any I/O;
/// a location that resolves outside the root is rejected with
/// [`StoreError::InvalidPath`].
///
/// Writes go to a temporary file in the target directory which is then
/// renamed over the document, so readers see either the old or the new
/// contents.
#[derive(Debug, Clone)]
pub struct FsBackend {
    root: PathBuf,
    layout: ContentLayout,
}

impl FsBackend {
    /// Open an existing content root.
    pub fn open(root: impl AsRef<Path>) -> StoreResult<Self> {
        Self::with_layout(root, ContentLayout::default())
    }

    /// Open an existing content root with a custom layout.
    pub fn with_layout(root: impl AsRef<Path>, layout: ContentLayout) -> StoreResult<Self> {
        let root = root.as_ref().canonicalize()?;
        if !root.is_dir() {
            return Err(StoreError::InvalidPath(format!(
                "content root {} is not a directory",
                root.display()
            )));
        }
        Ok(Self { root, layout })
    }

    /// Create the content root if needed, then open it.
    pub fn create(root: impl AsRef<Path>, layout: ContentLayout) -> StoreResult<Self> {
        fs::create_dir_all(root.as_ref())?;
        Self::with_layout(root, layout)
    }

    /// The canonical content root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute location of a page's document, checked to lie under the root.
    pub fn locate(&self, page: &PageId) -> StoreResult<PathBuf> {
        let full = self.root.join(self.layout.file_for(page));

        // A symlink at the document itself is resolved through its target.
        if let Ok(meta) = fs::symlink_metadata(&full) {
            if meta.file_type().is_symlink() {
                let target = full.canonicalize().map_err(|_| self.escape(page))?;
                self.ensure_within(page, &target)?;
                return Ok(full);
            }
        }

        // Otherwise the deepest existing ancestor decides where writes land.
        let mut probe = full.as_path();
        while !probe.exists() {
            probe = probe.parent().ok_or_else(|| self.escape(page))?;
        }
        let canonical = probe.canonicalize()?;
        self.ensure_within(page, &canonical)?;
        Ok(full)
    }

    fn ensure_within(&self, page: &PageId, resolved: &Path) -> StoreResult<()> {
        if resolved.starts_with(&self.root) {
            Ok(())
        } else {
            Err(self.escape(page))
        }
    }

    fn escape(&self, page: &PageId) -> StoreError {
        StoreError::InvalidPath(format!(
            "page {page} resolves outside content root {}",
            self.root.display()
        ))
    }
}

impl DocumentBackend for FsBackend {
    fn read(&self, page: &PageId) -> StoreResult<Option<Vec<u8>>> {
        let path = self.locate(page)?;
        match fs::read(&path) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    fn write(&self, page: &PageId, data: &[u8]) -> StoreResult<()> {
        let path = self.locate(page)?;
        let dir = path
            .parent()
            .ok_or_else(|| StoreError::InvalidPath(format!("page {page} has no parent")))?;
        fs::create_dir_all(dir)?;

        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(data)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| StoreError::Io(e.error))?;
        tracing::trace!(page = %page, bytes = data.len(), "document persisted");
        Ok(())
    }

    fn exists(&self, page: &PageId) -> StoreResult<bool> {
        Ok(self.locate(page)?.is_file())
    }

    fn list(&self) -> StoreResult<Vec<PageId>> {
        let mut pages = Vec::new();
        for entry in WalkDir::new(&self.root).min_depth(1) {
            let entry = entry.map_err(|e| {
                StoreError::Io(e.into_io_error().unwrap_or_else(|| {
                    std::io::Error::other("directory walk failed")
                }))
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(&self.root) else {
                continue;
            };
            let relative = relative.to_string_lossy();
            match self.layout.page_for(&relative) {
                Some(page) => pages.push(page),
                None => tracing::trace!(file = %relative, "skipping non-content file"),
            }
        }
        pages.sort();
        Ok(pages)
    }

    fn layout(&self) -> &ContentLayout {
        &self.layout
    }
}
