//! Publish gate for Microtext.
//!
//! Document store writes are durable but unversioned. Publishing gathers
//! every content file changed since the last publish and records them as a
//! single commit through a [`VersionControl`] backend:
//!
//! - [`GitVersionControl`] -- a git repository containing the content root
//! - [`InMemoryVersionControl`] -- snapshot index over an in-memory backend
//!
//! A publish with nothing pending creates no commit. A failed commit leaves
//! nothing published.

pub mod error;
pub mod gate;
pub mod git;
pub mod memory;
pub mod status;
pub mod vcs;

pub use error::{PublishError, PublishResult};
pub use gate::{auto_message, PublishGate, PublishOutcome};
pub use git::{GitAuthor, GitVersionControl};
pub use memory::{CommitRecord, InMemoryVersionControl};
pub use status::{ChangeKind, PendingChange, PublishStatus};
pub use vcs::{CommitId, VersionControl};
