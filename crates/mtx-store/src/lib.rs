//! Document store for Microtext.
//!
//! Every page is one content document: a YAML header holding the content
//! tree (plus any other pass-through fields) followed by an opaque body. The
//! store exposes field and array mutation over the content tree and writes
//! the document back with the body and the other header fields untouched.
//!
//! # Storage Backends
//!
//! All backends implement the [`DocumentBackend`] trait:
//!
//! - [`FsBackend`] -- one `*.md` file per page under a content root
//! - [`InMemoryBackend`] -- `BTreeMap`-based backend for tests and embedding
//!
//! # Design Rules
//!
//! 1. Every call is one read-parse-mutate-serialize-write cycle; there are no
//!    locks, so concurrent writers to one page race and the later write wins
//!    unless a [`Revision`](mtx_types::Revision) is presented.
//! 2. Page ids are validated, and the filesystem backend confirms the
//!    resolved location lies under its root, before any I/O.
//! 3. A failed mutation never writes.
//! 4. All I/O errors are propagated, never silently ignored.

pub mod document;
pub mod error;
pub mod fs;
pub mod layout;
pub mod memory;
pub mod ops;
pub mod store;
pub mod traits;

// Re-export primary types at crate root for ergonomic imports.
pub use document::ContentDocument;
pub use error::{StoreError, StoreResult};
pub use fs::FsBackend;
pub use layout::ContentLayout;
pub use memory::InMemoryBackend;
pub use ops::{ArrayOpKind, ArrayOpRequest, ArrayOpResult, FieldWrite, PageSnapshot};
pub use store::{DocumentStore, StoreConfig};
pub use traits::DocumentBackend;
