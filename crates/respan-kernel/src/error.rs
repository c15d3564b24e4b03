//! Kernel error types.

use std::path::PathBuf;

use thiserror::Error;

use respan_core::CoreError;
use respan_types::DocumentId;

use crate::remote::RemoteError;

/// Local store failures.
#[derive(Debug, Error)]
pub enum StoreError {
    /// SQLite error.
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A record did not serialize or deserialize.
    #[error("record encoding error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No document with this id in the store.
    #[error("document {0} not in local store")]
    NotFound(DocumentId),

    /// A whole-store key that is not a document id.
    #[error("invalid document key: {0:?}")]
    InvalidKey(String),
}

/// Failures of the edit workflow, restore and batch operations.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// The remote copy has no text to edit.
    #[error("document {0} has no text on remote")]
    EmptyRemote(DocumentId),

    /// No such entry in the document's history.
    #[error("document {id} has no history entry {index}")]
    NoSuchRecord { id: DocumentId, index: usize },

    /// The entry was already restored once.
    #[error("history entry {index} of {id} was already restored")]
    RestoreAlreadyConsumed { id: DocumentId, index: usize },

    /// A local-only entry cannot be pushed to the remote.
    #[error("history entry {index} of {id} was a local edit and cannot be restored remotely")]
    LocalRecord { id: DocumentId, index: usize },

    /// The remote accepted the edit but the local mirror was not saved.
    ///
    /// The history entry at `history_index` is in memory and still describes
    /// the remote change, so it can be undone.
    #[error("document {id} was edited on remote but the local copy failed: {source}")]
    MirrorFailed {
        id: DocumentId,
        history_index: usize,
        changes: usize,
        source: Box<WorkflowError>,
    },

    /// Undo requested with no undoable commit.
    #[error("nothing to undo")]
    NothingToUndo,
}

/// Configuration loading failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to render config: {0}")]
    Render(#[from] toml::ser::Error),
}
