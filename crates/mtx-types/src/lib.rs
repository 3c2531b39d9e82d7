//! Foundation types for Microtext.
//!
//! This crate provides the identifiers and the content-tree model shared by
//! every other Microtext crate, together with the two pure transforms the
//! rest of the pipeline is built on: path addressing and flatten/unflatten.
//!
//! # Key Types
//!
//! - [`PageId`]: Validated page identifier (one content file per page)
//! - [`FieldPath`]: Dot-separated address into a content tree
//! - [`ContentNode`]: `Leaf | Array | Object` content tree
//! - [`FlatMap`]: Ordered `path → text` view of a tree's leaves
//! - [`Revision`]: BLAKE3 digest of a stored document's bytes

pub mod address;
pub mod error;
pub mod flatten;
pub mod node;
pub mod page;
pub mod path;
pub mod revision;

pub use address::{assign, resolve, resolve_leaf, resolve_mut};
pub use error::{PathError, TypeError};
pub use flatten::{flatten, unflatten, unflatten_into, FlatMap};
pub use node::{ContentNode, NodeKind};
pub use page::PageId;
pub use path::{FieldPath, PathSegment};
pub use revision::Revision;
