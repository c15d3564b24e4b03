//! # respan-kernel
//!
//! The edit-transaction workflow around the replacement engine.
//!
//! - [`LocalStore`] holds every document snapshot, written through to SQLite
//!   one document at a time.
//! - [`RemoteStore`] is the authoritative copy. Remote edits always re-fetch
//!   before committing and only mirror locally once the remote accepts.
//! - [`ReplaceSession`] walks the candidates with a [`Reviewer`], committing
//!   approvals immediately, with single-level undo of the last remote commit.
//! - [`restore()`] replays any history entry once, remotely or locally.
//! - [`batch_replace`] applies a replacement everywhere without review.

pub mod batch;
pub mod commit;
pub mod config;
pub mod db;
pub mod error;
pub mod preview;
pub mod remote;
pub mod restore;
pub mod session;
pub mod store;

pub use batch::{BatchReport, batch_replace};
pub use commit::{Committed, DEFAULT_REMOTE_DELAY, EditTarget, commit_local, commit_remote};
pub use config::Config;
pub use db::{DocumentDb, DocumentRow};
pub use error::{ConfigError, StoreError, WorkflowError};
pub use preview::{Preview, find_candidates, probe};
pub use remote::{CommitOutcome, MemoryRemote, RemoteContent, RemoteError, RemoteStore};
pub use restore::{
    EditedDocument, RestorableEdit, RestoreTarget, edited_documents, restorable_edits, restore,
};
pub use session::{
    Decision, ItemOutcome, LastCommit, ReplaceSession, ReviewContext, Reviewer, SessionState,
    SessionSummary,
};
pub use store::LocalStore;
