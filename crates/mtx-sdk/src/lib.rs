//! High-level SDK for Microtext.
//!
//! [`Microtext`] wires the document store, draft cache, sync engine, publish
//! gate and tool surface together from one [`MicrotextConfig`]. This is the
//! main entry point for applications embedding Microtext.

pub mod config;
pub mod error;
pub mod microtext;

pub use config::{InterpreterConfig, MicrotextConfig, PublishBackend, PublishConfig};
pub use error::{SdkError, SdkResult};
pub use microtext::Microtext;

// Re-export key types
pub use mtx_drafts::{DraftEntry, RejectedDraft};
pub use mtx_publish::{PublishOutcome, PublishStatus};
pub use mtx_store::{ArrayOpKind, ArrayOpRequest, ArrayOpResult, FieldWrite, PageSnapshot};
pub use mtx_sync::{SyncConfig, SyncReport};
pub use mtx_tools::{InstructionReport, ToolCall, ToolSurface};
pub use mtx_types::{ContentNode, FieldPath, FlatMap, PageId, Revision};
