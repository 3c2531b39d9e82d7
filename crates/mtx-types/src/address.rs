//! Path addressing: resolve and assign values inside a content tree.
//!
//! Reads never fail: a missing intermediate node simply resolves to `None`.
//! Writes create missing intermediate containers, choosing an array when the
//! next segment is an index and an object otherwise. Writes refuse to reshape
//! data that already exists:
//!
//! - a field segment cannot address an existing array,
//! - no segment can descend below an existing leaf,
//! - a node cannot be replaced by a node of a different kind,
//! - an index may be at most the current array length (`== len` appends).
//!
//! Every check runs before the tree is touched, so a rejected write leaves
//! the tree exactly as it was.

use crate::error::PathError;
use crate::node::ContentNode;
use crate::path::{FieldPath, PathSegment};

/// Resolve the node at `path`, or `None` if any step is missing.
pub fn resolve<'a>(tree: &'a ContentNode, path: &FieldPath) -> Option<&'a ContentNode> {
    let mut node = tree;
    for segment in path.segments() {
        node = step(node, segment)?;
    }
    Some(node)
}

/// Resolve the text of the leaf at `path`.
pub fn resolve_leaf<'a>(tree: &'a ContentNode, path: &FieldPath) -> Option<&'a str> {
    resolve(tree, path).and_then(ContentNode::as_leaf)
}

/// Mutable variant of [`resolve`].
pub fn resolve_mut<'a>(tree: &'a mut ContentNode, path: &FieldPath) -> Option<&'a mut ContentNode> {
    let mut node = tree;
    for segment in path.segments() {
        node = match (node, segment) {
            (ContentNode::Object(fields), segment) => fields.get_mut(&segment.key())?,
            (ContentNode::Array(items), PathSegment::Index(i)) => items.get_mut(*i)?,
            _ => return None,
        };
    }
    Some(node)
}

/// Write `value` at `path`, creating intermediate containers on demand.
///
/// Returns the node previously stored at `path`, if any.
pub fn assign(
    tree: &mut ContentNode,
    path: &FieldPath,
    value: ContentNode,
) -> Result<Option<ContentNode>, PathError> {
    check_assign(tree, path, &value)?;
    write(tree, path, 0, value)
}

fn step<'a>(node: &'a ContentNode, segment: &PathSegment) -> Option<&'a ContentNode> {
    match (node, segment) {
        (ContentNode::Object(fields), segment) => fields.get(&segment.key()),
        (ContentNode::Array(items), PathSegment::Index(i)) => items.get(*i),
        _ => None,
    }
}

fn check_assign(
    tree: &ContentNode,
    path: &FieldPath,
    value: &ContentNode,
) -> Result<(), PathError> {
    if path.is_root() {
        return Err(PathError::invalid("", "cannot assign to the tree root"));
    }

    let mut node = Some(tree);
    for (depth, segment) in path.segments().iter().enumerate() {
        node = match node {
            // Everything below a missing node is created fresh; only a new
            // array's first index is addressable.
            None => {
                if let PathSegment::Index(i) = segment {
                    if *i != 0 {
                        return Err(PathError::IndexOutOfRange {
                            path: path.prefix_string(depth),
                            index: *i,
                            len: 0,
                        });
                    }
                }
                None
            }
            Some(ContentNode::Object(fields)) => fields.get(&segment.key()),
            Some(ContentNode::Array(items)) => match segment {
                PathSegment::Index(i) if *i < items.len() => items.get(*i),
                PathSegment::Index(i) if *i == items.len() => None,
                PathSegment::Index(i) => {
                    return Err(PathError::IndexOutOfRange {
                        path: path.prefix_string(depth),
                        index: *i,
                        len: items.len(),
                    })
                }
                PathSegment::Field(name) => {
                    return Err(PathError::invalid(
                        path.to_string(),
                        format!(
                            "field {name:?} cannot address the array at {:?}",
                            path.prefix_string(depth)
                        ),
                    ))
                }
            },
            Some(ContentNode::Leaf(_)) => {
                return Err(PathError::invalid(
                    path.to_string(),
                    format!("{:?} is a leaf and has no children", path.prefix_string(depth)),
                ))
            }
        };
    }

    if let Some(existing) = node {
        if existing.kind() != value.kind() {
            return Err(PathError::invalid(
                path.to_string(),
                format!("cannot replace {} with {}", existing.kind(), value.kind()),
            ));
        }
    }
    Ok(())
}

fn write(
    node: &mut ContentNode,
    path: &FieldPath,
    depth: usize,
    value: ContentNode,
) -> Result<Option<ContentNode>, PathError> {
    let segments = path.segments();
    let segment = &segments[depth];
    let next = segments.get(depth + 1);

    match (node, segment) {
        (ContentNode::Object(fields), segment) => match next {
            None => Ok(fields.insert(segment.key(), value)),
            Some(next) => {
                let child = fields
                    .entry(segment.key())
                    .or_insert_with(|| container_for(next));
                write(child, path, depth + 1, value)
            }
        },
        (ContentNode::Array(items), PathSegment::Index(i)) => {
            let i = *i;
            match next {
                None if i == items.len() => {
                    items.push(value);
                    Ok(None)
                }
                None => Ok(Some(std::mem::replace(&mut items[i], value))),
                Some(next) => {
                    if i == items.len() {
                        items.push(container_for(next));
                    }
                    write(&mut items[i], path, depth + 1, value)
                }
            }
        }
        _ => Err(PathError::invalid(
            path.to_string(),
            format!("cannot descend into {:?}", path.prefix_string(depth)),
        )),
    }
}

fn container_for(next: &PathSegment) -> ContentNode {
    if next.is_index() {
        ContentNode::array()
    } else {
        ContentNode::object()
    }
}
