use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A content tree node.
///
/// Only [`ContentNode::Leaf`] holds editable text. Objects keep their fields
/// in insertion order so that serializing a mutated tree reproduces the
/// original field order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContentNode {
    Leaf(String),
    Array(Vec<ContentNode>),
    Object(IndexMap<String, ContentNode>),
}

/// The shape of a [`ContentNode`], without its contents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Leaf,
    Array,
    Object,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Leaf => write!(f, "leaf"),
            Self::Array => write!(f, "array"),
            Self::Object => write!(f, "object"),
        }
    }
}

impl ContentNode {
    /// A text leaf.
    pub fn leaf(text: impl Into<String>) -> Self {
        Self::Leaf(text.into())
    }

    /// An empty object.
    pub fn object() -> Self {
        Self::Object(IndexMap::new())
    }

    /// An empty array.
    pub fn array() -> Self {
        Self::Array(Vec::new())
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Self::Leaf(_) => NodeKind::Leaf,
            Self::Array(_) => NodeKind::Array,
            Self::Object(_) => NodeKind::Object,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Self::Leaf(_))
    }

    pub fn as_leaf(&self) -> Option<&str> {
        match self {
            Self::Leaf(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Vec<ContentNode>> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_array_mut(&mut self) -> Option<&mut Vec<ContentNode>> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&IndexMap<String, ContentNode>> {
        match self {
            Self::Object(fields) => Some(fields),
            _ => None,
        }
    }

    /// Number of leaves beneath (and including) this node.
    pub fn leaf_count(&self) -> usize {
        match self {
            Self::Leaf(_) => 1,
            Self::Array(items) => items.iter().map(Self::leaf_count).sum(),
            Self::Object(fields) => fields.values().map(Self::leaf_count).sum(),
        }
    }

    /// A copy of this node with the same shape and every leaf emptied.
    ///
    /// Used as the placeholder when an array item is added without a template.
    pub fn blanked(&self) -> Self {
        match self {
            Self::Leaf(_) => Self::Leaf(String::new()),
            Self::Array(items) => Self::Array(items.iter().map(Self::blanked).collect()),
            Self::Object(fields) => Self::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.blanked()))
                    .collect(),
            ),
        }
    }
}

impl Default for ContentNode {
    fn default() -> Self {
        Self::object()
    }
}

impl From<&str> for ContentNode {
    fn from(text: &str) -> Self {
        Self::Leaf(text.to_string())
    }
}

impl From<String> for ContentNode {
    fn from(text: String) -> Self {
        Self::Leaf(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deserializes_nested_json_in_order() {
        let node: ContentNode =
            serde_json::from_str(r#"{"zeta": "first", "alpha": ["a", {"b": "c"}]}"#).unwrap();
        let fields = node.as_object().unwrap();
        let keys: Vec<&str> = fields.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["zeta", "alpha"]);
        assert_eq!(node.leaf_count(), 3);
    }

    #[test]
    fn rejects_non_text_scalars() {
        assert!(serde_json::from_value::<ContentNode>(json!({"n": 3})).is_err());
    }

    #[test]
    fn blanked_keeps_shape() {
        let node: ContentNode =
            serde_json::from_value(json!({"title": "Fast", "tags": ["x", "y"]})).unwrap();
        let blank = node.blanked();
        assert_eq!(
            blank,
            serde_json::from_value::<ContentNode>(json!({"title": "", "tags": ["", ""]})).unwrap()
        );
    }

    #[test]
    fn kind_display() {
        assert_eq!(ContentNode::leaf("x").kind().to_string(), "leaf");
        assert_eq!(ContentNode::array().kind(), NodeKind::Array);
        assert_eq!(ContentNode::default().kind(), NodeKind::Object);
    }
}
