use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use mtx_types::{FieldPath, PageId};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::cache::{DraftCache, DraftSet};
use crate::entry::DraftEntry;
use crate::error::{DraftError, DraftResult};

const FORMAT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct DraftFile {
    version: u32,
    drafts: DraftSet,
}

/// Draft cache persisted to a JSON file.
///
/// The file is loaded once when the cache is opened and rewritten after
/// every change, through a temporary file renamed into place, so drafts
/// survive a restart of the editing client.
#[derive(Debug)]
pub struct FileDraftCache {
    path: PathBuf,
    drafts: RwLock<DraftSet>,
}

impl FileDraftCache {
    /// Open the cache at `path`, starting empty if the file does not exist.
    pub fn open(path: impl Into<PathBuf>) -> DraftResult<Self> {
        let path = path.into();
        let drafts = match fs::read(&path) {
            Ok(data) => {
                let file: DraftFile = serde_json::from_slice(&data)?;
                if file.version != FORMAT_VERSION {
                    return Err(DraftError::Serialization(format!(
                        "unsupported draft file version {}",
                        file.version
                    )));
                }
                file.drafts
            }
            Err(e) if e.kind() == ErrorKind::NotFound => DraftSet::new(),
            Err(e) => return Err(e.into()),
        };
        tracing::debug!(path = %path.display(), drafts = drafts.len(), "draft cache opened");
        Ok(Self {
            path,
            drafts: RwLock::new(drafts),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Apply `change` and persist the result. Nothing is kept in memory if
    /// persisting fails.
    fn update<T>(&self, change: impl FnOnce(&mut DraftSet) -> T) -> DraftResult<T> {
        let mut drafts = self.drafts.write().expect("lock poisoned");
        let mut next = drafts.clone();
        let out = change(&mut next);
        if next != *drafts {
            persist(&self.path, &next)?;
            *drafts = next;
        }
        Ok(out)
    }
}

fn persist(path: &Path, drafts: &DraftSet) -> DraftResult<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let file = DraftFile {
        version: FORMAT_VERSION,
        drafts: drafts.clone(),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    serde_json::to_writer_pretty(&mut tmp, &file)?;
    tmp.write_all(b"\n")?;
    tmp.persist(path).map_err(|e| DraftError::Io(e.error))?;
    Ok(())
}

impl DraftCache for FileDraftCache {
    fn save(&self, page: &PageId, path: &FieldPath, value: &str) -> DraftResult<DraftEntry> {
        let entry = DraftEntry::new(page.clone(), path.clone(), value);
        self.update(|drafts| drafts.insert(entry.clone()))?;
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
        self.update(|drafts| drafts.remove(page, path).is_some())
    }

    fn clear_page(&self, page: &PageId) -> DraftResult<usize> {
        self.update(|drafts| drafts.remove_page(page))
    }

    fn clear_if_current(&self, entry: &DraftEntry) -> DraftResult<bool> {
        self.update(|drafts| drafts.remove_if_current(entry))
    }

    fn pages(&self) -> DraftResult<Vec<PageId>> {
        let drafts = self.drafts.read().expect("lock poisoned");
        Ok(drafts.pages())
    }
}
