use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::PathError;

/// One step of a [`FieldPath`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PathSegment {
    /// A named field of an object.
    Field(String),
    /// A base-10 array index.
    Index(usize),
}

impl PathSegment {
    /// Returns `true` for array-index segments.
    pub fn is_index(&self) -> bool {
        matches!(self, Self::Index(_))
    }

    /// The segment as an object key. Index segments use their decimal form.
    pub fn key(&self) -> String {
        match self {
            Self::Field(name) => name.clone(),
            Self::Index(i) => i.to_string(),
        }
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(name) => f.write_str(name),
            Self::Index(i) => write!(f, "{i}"),
        }
    }
}

/// Dot-separated address into a content tree, e.g. `features.0.title`.
///
/// Segments made only of ASCII digits are array indices; anything else is a
/// field name. The root path has no segments and is only produced
/// programmatically; [`FieldPath::parse`] rejects empty input.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldPath {
    segments: Vec<PathSegment>,
}

impl FieldPath {
    /// Parse a dot-separated path.
    pub fn parse(text: &str) -> Result<Self, PathError> {
        if text.is_empty() {
            return Err(PathError::invalid(text, "empty path"));
        }
        let mut segments = Vec::new();
        for raw in text.split('.') {
            if raw.is_empty() {
                return Err(PathError::invalid(text, "empty segment"));
            }
            if raw.bytes().all(|b| b.is_ascii_digit()) {
                let index = raw
                    .parse::<usize>()
                    .map_err(|_| PathError::invalid(text, format!("index {raw} is too large")))?;
                segments.push(PathSegment::Index(index));
            } else {
                segments.push(PathSegment::Field(raw.to_string()));
            }
        }
        Ok(Self { segments })
    }

    /// The empty path addressing the tree root.
    pub fn root() -> Self {
        Self::default()
    }

    /// Build a path from pre-split segments.
    pub fn from_segments(segments: Vec<PathSegment>) -> Self {
        Self { segments }
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// A new path with `segment` appended.
    pub fn child(&self, segment: PathSegment) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment);
        Self { segments }
    }

    /// A new path with an index segment appended.
    pub fn index(&self, index: usize) -> Self {
        self.child(PathSegment::Index(index))
    }

    /// The first `depth` segments rendered as a path string.
    pub fn prefix_string(&self, depth: usize) -> String {
        Self::from_segments(self.segments[..depth.min(self.segments.len())].to_vec()).to_string()
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

impl FromStr for FieldPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for FieldPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for FieldPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::parse(&text).map_err(serde::de::Error::custom)
    }
}
