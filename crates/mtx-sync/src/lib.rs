//! Draft synchronization for Microtext.
//!
//! The [`SyncEngine`] drains a page's pending drafts into durable storage
//! through a [`FieldWriter`], one key at a time. A key whose write fails
//! keeps its draft and is reported; the remaining keys still sync, and a
//! later run only retries what is still pending.

pub mod engine;
pub mod error;
pub mod types;
pub mod writer;

pub use engine::SyncEngine;
pub use error::{SyncError, SyncResult};
pub use types::{KeyFailure, SyncConfig, SyncReport};
pub use writer::FieldWriter;
