use mtx_types::PageId;
use serde::{Deserialize, Serialize};

/// Maps page ids to file names relative to the content root.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentLayout {
    /// File extension of content documents, without the dot.
    pub extension: String,
}

impl Default for ContentLayout {
    fn default() -> Self {
        Self {
            extension: "md".into(),
        }
    }
}

impl ContentLayout {
    pub fn new(extension: impl Into<String>) -> Self {
        Self {
            extension: extension.into(),
        }
    }

    /// Relative file path for a page, always `/`-separated.
    pub fn file_for(&self, page: &PageId) -> String {
        format!("{}.{}", page.as_str(), self.extension)
    }

    /// The page stored at a relative file path, if the path is a content file.
    pub fn page_for(&self, relative: &str) -> Option<PageId> {
        let normalized = relative.replace('\\', "/");
        let stem = normalized.strip_suffix(&format!(".{}", self.extension))?;
        PageId::parse(stem).ok()
    }
}
