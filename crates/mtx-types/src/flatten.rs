//! Bidirectional transform between a content tree and a flat `path → text` map.

use indexmap::IndexMap;

use crate::address::assign;
use crate::error::PathError;
use crate::node::ContentNode;
use crate::path::{FieldPath, PathSegment};

/// Ordered `path → text` view of a tree's leaves, in depth-first order.
pub type FlatMap = IndexMap<String, String>;

/// Emit one entry per leaf, keyed by its dot-separated path.
///
/// Empty containers have no leaves and therefore no entries. A bare leaf at
/// the root has no addressable path and flattens to an empty map.
pub fn flatten(tree: &ContentNode) -> FlatMap {
    let mut out = FlatMap::new();
    walk(tree, &FieldPath::root(), &mut out);
    out
}

fn walk(node: &ContentNode, path: &FieldPath, out: &mut FlatMap) {
    match node {
        ContentNode::Leaf(text) => {
            if !path.is_root() {
                out.insert(path.to_string(), text.clone());
            }
        }
        ContentNode::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                walk(item, &path.index(i), out);
            }
        }
        ContentNode::Object(fields) => {
            for (name, child) in fields {
                walk(child, &path.child(PathSegment::Field(name.clone())), out);
            }
        }
    }
}

/// Targeted write of one flat entry back into `tree`.
///
/// Only the addressed leaf (and any containers needed to reach it) changes;
/// every other leaf keeps its position and value.
pub fn unflatten_into(
    tree: &mut ContentNode,
    path: &FieldPath,
    value: &str,
) -> Result<Option<ContentNode>, PathError> {
    assign(tree, path, ContentNode::leaf(value))
}

/// Build a fresh tree from flat entries by successive targeted writes.
pub fn unflatten(entries: &FlatMap) -> Result<ContentNode, PathError> {
    let mut tree = ContentNode::object();
    for (path, value) in entries {
        unflatten_into(&mut tree, &FieldPath::parse(path)?, value)?;
    }
    Ok(tree)
}
