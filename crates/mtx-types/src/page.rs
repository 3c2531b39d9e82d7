use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Longest accepted page id, in bytes.
const MAX_PAGE_ID_LEN: usize = 255;

/// Identifier of one content document.
///
/// A page id is one or more `/`-separated segments. Each segment is made of
/// ASCII letters, digits, `-`, `_` and interior `.` characters; segments may
/// not be empty, may not start with `.`, and `.`/`..` are rejected. This rules
/// out absolute paths, parent traversal and backslash separators before any
/// storage backend sees the id.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PageId(String);

impl PageId {
    /// Parse and validate a page id.
    pub fn parse(raw: &str) -> Result<Self, TypeError> {
        let invalid = |reason: &str| TypeError::InvalidPageId {
            id: raw.to_string(),
            reason: reason.to_string(),
        };

        if raw.is_empty() {
            return Err(invalid("empty"));
        }
        if raw.len() > MAX_PAGE_ID_LEN {
            return Err(invalid("too long"));
        }
        for segment in raw.split('/') {
            if segment.is_empty() {
                return Err(invalid("empty segment"));
            }
            if segment.starts_with('.') {
                return Err(invalid("segment starts with '.'"));
            }
            if let Some(c) = segment
                .chars()
                .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
            {
                return Err(invalid(&format!("unexpected character {c:?}")));
            }
        }
        Ok(Self(raw.to_string()))
    }

    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The `/`-separated segments of the id.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }
}

impl fmt::Debug for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PageId({})", self.0)
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for PageId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for PageId {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PageId> for String {
    fn from(id: PageId) -> Self {
        id.0
    }
}

impl AsRef<str> for PageId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
