use std::fmt;

use mtx_types::{ContentNode, FieldPath, PageId, Revision};
use serde::{Deserialize, Serialize};

/// A page's content tree together with the revision it was read at.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSnapshot {
    pub page_id: PageId,
    pub content: ContentNode,
    pub revision: Revision,
}

/// Outcome of a successful field write.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldWrite {
    pub page_id: PageId,
    pub path: FieldPath,
    /// Leaf text before the write; `None` if the field did not exist.
    pub previous_value: Option<String>,
    pub new_value: String,
    /// Revision of the document after the write.
    pub revision: Revision,
}

impl FieldWrite {
    /// Whether the write changed the stored value.
    pub fn changed(&self) -> bool {
        self.previous_value.as_deref() != Some(self.new_value.as_str())
    }
}

/// Array operation kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArrayOpKind {
    Add,
    Remove,
}

impl fmt::Display for ArrayOpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Add => write!(f, "add"),
            Self::Remove => write!(f, "remove"),
        }
    }
}

/// Request to add or remove an item in an array.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArrayOpRequest {
    pub page_id: PageId,
    pub array_path: FieldPath,
    pub op: ArrayOpKind,
    /// Required for `remove`; not accepted for `add`, which always appends.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    /// Item to append. Defaults to a blanked copy of the last item.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<ContentNode>,
    /// Reject the operation if the document has changed since this revision.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_revision: Option<Revision>,
}

impl ArrayOpRequest {
    /// Append to the array at `array_path`.
    pub fn add(page_id: PageId, array_path: FieldPath) -> Self {
        Self {
            page_id,
            array_path,
            op: ArrayOpKind::Add,
            index: None,
            template: None,
            expected_revision: None,
        }
    }

    /// Remove the item at `index` from the array at `array_path`.
    pub fn remove(page_id: PageId, array_path: FieldPath, index: usize) -> Self {
        Self {
            page_id,
            array_path,
            op: ArrayOpKind::Remove,
            index: Some(index),
            template: None,
            expected_revision: None,
        }
    }

    pub fn with_template(mut self, template: ContentNode) -> Self {
        self.template = Some(template);
        self
    }

    pub fn expecting(mut self, revision: Revision) -> Self {
        self.expected_revision = Some(revision);
        self
    }
}

/// Outcome of a successful array operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArrayOpResult {
    pub page_id: PageId,
    pub op: ArrayOpKind,
    pub array_path: FieldPath,
    /// Index the item was appended at or removed from.
    pub index: usize,
    /// The appended or removed item.
    pub item: ContentNode,
    pub new_length: usize,
    pub revision: Revision,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn array_request_from_json() {
        let json = r#"{"pageId": "home", "arrayPath": "features", "op": "remove", "index": 2}"#;
        let req: ArrayOpRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.op, ArrayOpKind::Remove);
        assert_eq!(req.index, Some(2));
        assert_eq!(req.array_path.to_string(), "features");
        assert!(req.template.is_none());
    }

    #[test]
    fn field_write_changed() {
        let write = FieldWrite {
            page_id: PageId::parse("home").unwrap(),
            path: FieldPath::parse("a").unwrap(),
            previous_value: Some("x".into()),
            new_value: "x".into(),
            revision: Revision::of(b""),
        };
        assert!(!write.changed());
        let created = FieldWrite {
            previous_value: None,
            ..write
        };
        assert!(created.changed());
    }
}
