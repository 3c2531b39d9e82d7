//! Draft cache for Microtext.
//!
//! A draft is a field edit that the client has made but the document store
//! has not yet durably applied. Drafts are keyed by `(page, path)`; saving a
//! draft for a key discards whatever was pending for it before.
//!
//! The cache is single-writer and local to one client. The sync engine
//! drains it into the store and clears each entry once its write succeeds.

pub mod cache;
pub mod entry;
pub mod error;
pub mod file;
pub mod memory;
pub mod overlay;

pub use cache::{DraftCache, DraftSet};
pub use entry::DraftEntry;
pub use error::{DraftError, DraftResult};
pub use file::FileDraftCache;
pub use memory::InMemoryDraftCache;
pub use overlay::{overlay, RejectedDraft};
