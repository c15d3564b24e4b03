//! The authoritative remote copy of each document.
//!
//! The workflow never trusts the local snapshot when editing remotely: it
//! fetches through [`RemoteStore`] immediately before every commit.
//! [`MemoryRemote`] is the in-process implementation used for local runs and
//! tests, with hooks for injecting the failures a real store produces.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use async_trait::async_trait;
use thiserror::Error;

use respan_types::{ContentCopy, DocumentId, Span};

/// Content as the remote store holds it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RemoteContent {
    pub plain_text: String,
    pub spans: Vec<Span>,
}

impl RemoteContent {
    pub fn new(plain_text: impl Into<String>, spans: Vec<Span>) -> Self {
        Self {
            plain_text: plain_text.into(),
            spans,
        }
    }
}

impl From<RemoteContent> for ContentCopy {
    fn from(content: RemoteContent) -> Self {
        ContentCopy::new(content.plain_text, content.spans)
    }
}

impl From<ContentCopy> for RemoteContent {
    fn from(copy: ContentCopy) -> Self {
        RemoteContent::new(copy.plain_text, copy.spans)
    }
}

/// Successful outcomes of a commit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommitOutcome {
    /// The remote now holds the new content.
    Applied,
    /// The remote already held exactly this content.
    Unchanged,
}

/// Remote store failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// No such document on the remote.
    #[error("document {0} not found on remote")]
    NotFound(DocumentId),

    /// The caller may not edit this document.
    #[error("permission denied editing {0}")]
    PermissionDenied(DocumentId),

    /// Anything else the remote reported.
    #[error("remote failure: {0}")]
    Other(String),
}

impl RemoteError {
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}

/// Operations on the authoritative document store.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Fetch the current content of a document.
    async fn fetch(&self, id: DocumentId) -> Result<RemoteContent, RemoteError>;

    /// Replace a document's content.
    ///
    /// Content identical to what the remote already holds reports
    /// [`CommitOutcome::Unchanged`], never an error.
    async fn commit(
        &self,
        id: DocumentId,
        plain_text: &str,
        spans: &[Span],
    ) -> Result<CommitOutcome, RemoteError>;
}

/// In-memory remote store.
///
/// Thread-safe via internal `RwLock`. Documents can be marked read-only
/// (commits fail with permission denied) or armed to fail their next commit.
#[derive(Debug, Default)]
pub struct MemoryRemote {
    docs: RwLock<HashMap<DocumentId, RemoteContent>>,
    read_only: RwLock<HashSet<DocumentId>>,
    fail_next: RwLock<HashMap<DocumentId, String>>,
    commits: RwLock<Vec<DocumentId>>,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put a document on the remote, replacing any previous content.
    pub fn insert(&self, id: DocumentId, content: RemoteContent) {
        if let Ok(mut docs) = self.docs.write() {
            docs.insert(id, content);
        }
    }

    /// Current content, bypassing failure injection.
    pub fn get(&self, id: DocumentId) -> Option<RemoteContent> {
        self.docs.read().ok()?.get(&id).cloned()
    }

    /// Reject all future commits to `id` with permission denied.
    pub fn deny(&self, id: DocumentId) {
        if let Ok(mut set) = self.read_only.write() {
            set.insert(id);
        }
    }

    /// Make the next commit to `id` fail with `msg`.
    pub fn fail_next_commit(&self, id: DocumentId, msg: impl Into<String>) {
        if let Ok(mut map) = self.fail_next.write() {
            map.insert(id, msg.into());
        }
    }

    /// Documents that received an applied commit, in order.
    pub fn commit_log(&self) -> Vec<DocumentId> {
        self.commits.read().map(|c| c.clone()).unwrap_or_default()
    }
}

fn poisoned() -> RemoteError {
    RemoteError::other("lock poisoned")
}

#[async_trait]
impl RemoteStore for MemoryRemote {
    async fn fetch(&self, id: DocumentId) -> Result<RemoteContent, RemoteError> {
        let docs = self.docs.read().map_err(|_| poisoned())?;
        docs.get(&id).cloned().ok_or(RemoteError::NotFound(id))
    }

    async fn commit(
        &self,
        id: DocumentId,
        plain_text: &str,
        spans: &[Span],
    ) -> Result<CommitOutcome, RemoteError> {
        if let Some(msg) = self.fail_next.write().map_err(|_| poisoned())?.remove(&id) {
            return Err(RemoteError::Other(msg));
        }
        if self.read_only.read().map_err(|_| poisoned())?.contains(&id) {
            return Err(RemoteError::PermissionDenied(id));
        }

        let mut docs = self.docs.write().map_err(|_| poisoned())?;
        let current = docs.get_mut(&id).ok_or(RemoteError::NotFound(id))?;
        if current.plain_text == plain_text && current.spans == spans {
            return Ok(CommitOutcome::Unchanged);
        }
        *current = RemoteContent::new(plain_text, spans.to_vec());
        drop(docs);

        self.commits.write().map_err(|_| poisoned())?.push(id);
        Ok(CommitOutcome::Applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use respan_types::SpanKind;

    fn id(n: u64) -> DocumentId {
        DocumentId::new(n)
    }

    #[tokio::test]
    async fn test_fetch_and_commit() {
        let remote = MemoryRemote::new();
        remote.insert(id(1), RemoteContent::new("hello", vec![]));

        let spans = vec![Span::new(SpanKind::Bold, 0, 3)];
        let outcome = remote.commit(id(1), "bye", &spans).await.unwrap();
        assert_eq!(outcome, CommitOutcome::Applied);

        let fetched = remote.fetch(id(1)).await.unwrap();
        assert_eq!(fetched, RemoteContent::new("bye", spans));
        assert_eq!(remote.commit_log(), vec![id(1)]);
    }

    #[tokio::test]
    async fn test_identical_commit_is_unchanged() {
        let remote = MemoryRemote::new();
        remote.insert(id(1), RemoteContent::new("same", vec![]));
        let outcome = remote.commit(id(1), "same", &[]).await.unwrap();
        assert_eq!(outcome, CommitOutcome::Unchanged);
        assert!(remote.commit_log().is_empty());
    }

    #[tokio::test]
    async fn test_missing_document() {
        let remote = MemoryRemote::new();
        assert_eq!(remote.fetch(id(9)).await, Err(RemoteError::NotFound(id(9))));
        assert_eq!(remote.commit(id(9), "x", &[]).await, Err(RemoteError::NotFound(id(9))));
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let remote = MemoryRemote::new();
        remote.insert(id(1), RemoteContent::new("a", vec![]));
        remote.insert(id(2), RemoteContent::new("b", vec![]));
        remote.deny(id(1));
        remote.fail_next_commit(id(2), "flood wait");

        assert_eq!(
            remote.commit(id(1), "x", &[]).await,
            Err(RemoteError::PermissionDenied(id(1)))
        );
        assert_eq!(
            remote.commit(id(2), "x", &[]).await,
            Err(RemoteError::other("flood wait"))
        );
        // armed failure fires once
        assert_eq!(remote.commit(id(2), "x", &[]).await, Ok(CommitOutcome::Applied));
        assert_eq!(remote.get(id(1)).unwrap().plain_text, "a");
    }
}
