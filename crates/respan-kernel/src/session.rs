//! Interactive review of a replacement across the local store.
//!
//! A [`ReplaceSession`] queues every document the replacement would change,
//! then walks the queue in id order asking a [`Reviewer`] what to do with each
//! one. Approvals commit immediately, so quitting or cancelling never has
//! anything staged to discard.
//!
//! ```text
//! Running ──(queue empty)──▶ Exhausted
//!    │ ├──(Quit)───────────▶ Quit
//!    │ └──(Cancel)─────────▶ Cancelled
//!    └── per item: PendingReview ──▶ Approved | Skipped
//! ```
//!
//! Remote sessions remember the most recent remote commit. The reviewer may
//! undo it while looking at the next item, or once more after the loop ends.
//! Only that one commit is ever undoable.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};

use respan_core::{ReplaceParams, Replacer};
use respan_types::{DocumentId, EditMode, EditRecord};

use crate::commit::{Committed, DEFAULT_REMOTE_DELAY, EditTarget, commit_local, commit_remote};
use crate::error::WorkflowError;
use crate::preview::{Preview, find_candidates};
use crate::restore::restore;
use crate::store::LocalStore;

/// What the reviewer wants done with the current item.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Skip,
    /// Stop reviewing; committed edits stay.
    Quit,
    /// Same as quit.
    Cancel,
    /// Revert the last remote commit, then review the current item again.
    Undo,
}

/// Session lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Running,
    Exhausted,
    Quit,
    Cancelled,
}

/// The single commit a session can still undo.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LastCommit {
    pub id: DocumentId,
    pub history_index: usize,
    pub record: EditRecord,
}

/// How one reviewed item (or undo) ended.
#[derive(Debug)]
pub enum ItemOutcome {
    Applied { changes: usize },
    Skipped,
    /// The fresh content had nothing to replace; nothing was written.
    StaleNoOp,
    /// The remote already held the replaced content.
    RemoteUnchanged,
    /// The last remote commit was reverted.
    Undone { id: DocumentId },
    /// The item failed; the session moves on.
    Failed(WorkflowError),
}

/// What the reviewer sees for each item.
#[derive(Debug)]
pub struct ReviewContext<'a> {
    /// 1-based position in the queue.
    pub position: usize,
    pub total: usize,
    pub preview: &'a Preview,
    pub params: &'a ReplaceParams,
    pub mode: EditMode,
    /// Present when [`Decision::Undo`] is available.
    pub undoable: Option<&'a LastCommit>,
}

/// Front end that makes decisions for a session.
#[async_trait]
pub trait Reviewer: Send {
    /// Decide what to do with the current item.
    async fn review(&mut self, ctx: ReviewContext<'_>) -> Decision;

    /// Offered once after the loop ends while a remote commit is undoable.
    async fn confirm_final_undo(&mut self, _last: &LastCommit) -> bool {
        false
    }

    /// Told how each item or undo turned out.
    fn outcome(&mut self, _id: DocumentId, _outcome: &ItemOutcome) {}
}

/// Counters for the end-of-run summary.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionSummary {
    pub found: usize,
    pub applied: usize,
    pub skipped: usize,
    pub errors: usize,
    pub restored: usize,
    pub total_replacements: usize,
}

/// One review run over the local store.
pub struct ReplaceSession<'a> {
    store: &'a mut LocalStore,
    target: EditTarget<'a>,
    replacer: Replacer,
    delay: Duration,
    queue: Vec<Preview>,
    position: usize,
    state: SessionState,
    last_committed: Option<LastCommit>,
    summary: SessionSummary,
}

impl<'a> ReplaceSession<'a> {
    /// Build the queue of candidates for `params`.
    pub fn new(
        store: &'a mut LocalStore,
        params: ReplaceParams,
        target: EditTarget<'a>,
    ) -> Result<Self, WorkflowError> {
        let replacer = Replacer::new(params)?;
        let queue = find_candidates(store, &replacer);
        let summary = SessionSummary {
            found: queue.len(),
            ..Default::default()
        };
        Ok(Self {
            store,
            target,
            replacer,
            delay: DEFAULT_REMOTE_DELAY,
            queue,
            position: 0,
            state: SessionState::Running,
            last_committed: None,
            summary,
        })
    }

    /// Pause after each remote push and restore.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn queue(&self) -> &[Preview] {
        &self.queue
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn last_committed(&self) -> Option<&LastCommit> {
        self.last_committed.as_ref()
    }

    pub fn summary(&self) -> &SessionSummary {
        &self.summary
    }

    pub fn mode(&self) -> EditMode {
        self.target.mode()
    }

    /// Review every queued item, then offer a final undo.
    #[instrument(skip_all, fields(search = %self.replacer.params().search, mode = %self.mode()))]
    pub async fn run(&mut self, reviewer: &mut dyn Reviewer) -> SessionSummary {
        while self.state == SessionState::Running {
            let Some(preview) = self.queue.get(self.position) else {
                self.state = SessionState::Exhausted;
                break;
            };
            let id = preview.id;
            let ctx = ReviewContext {
                position: self.position + 1,
                total: self.queue.len(),
                preview,
                params: self.replacer.params(),
                mode: self.target.mode(),
                undoable: self.last_committed.as_ref(),
            };

            match reviewer.review(ctx).await {
                Decision::Approve => {
                    let outcome = self.approve(id).await;
                    reviewer.outcome(id, &outcome);
                    self.position += 1;
                }
                Decision::Skip => {
                    self.summary.skipped += 1;
                    reviewer.outcome(id, &ItemOutcome::Skipped);
                    self.position += 1;
                }
                Decision::Quit => self.state = SessionState::Quit,
                Decision::Cancel => self.state = SessionState::Cancelled,
                Decision::Undo => match self.undo().await {
                    Ok((undone, outcome)) => reviewer.outcome(undone, &outcome),
                    Err(e) => {
                        debug!(%id, "undo requested with nothing to undo");
                        reviewer.outcome(id, &ItemOutcome::Failed(e));
                    }
                },
            }
        }

        let offer_undo = match &self.last_committed {
            Some(last) => reviewer.confirm_final_undo(last).await,
            None => false,
        };
        if offer_undo {
            if let Ok((undone, outcome)) = self.undo().await {
                reviewer.outcome(undone, &outcome);
            }
        }

        info!(
            found = self.summary.found,
            applied = self.summary.applied,
            skipped = self.summary.skipped,
            errors = self.summary.errors,
            restored = self.summary.restored,
            "review finished"
        );
        self.summary.clone()
    }

    /// Commit the current item and fold the result into the counters.
    async fn approve(&mut self, id: DocumentId) -> ItemOutcome {
        let result = match self.target {
            EditTarget::LocalOnly => commit_local(self.store, &self.replacer, id),
            EditTarget::Remote(remote) => {
                commit_remote(self.store, remote, &self.replacer, id, self.delay).await
            }
        };

        match result {
            Ok(Committed::Applied {
                changes,
                history_index,
            }) => {
                self.summary.applied += 1;
                self.summary.total_replacements += changes;
                if self.target.mode().is_remote() {
                    self.remember(id, history_index);
                }
                ItemOutcome::Applied { changes }
            }
            Ok(Committed::Stale) => {
                self.summary.skipped += 1;
                ItemOutcome::StaleNoOp
            }
            Ok(Committed::RemoteUnchanged) => {
                self.summary.skipped += 1;
                ItemOutcome::RemoteUnchanged
            }
            Err(e) => {
                warn!(%id, error = %e, "item failed");
                self.summary.errors += 1;
                // the remote did change, so it counts and stays undoable
                if let WorkflowError::MirrorFailed {
                    history_index,
                    changes,
                    ..
                } = &e
                {
                    self.summary.applied += 1;
                    self.summary.total_replacements += changes;
                    self.remember(id, *history_index);
                }
                ItemOutcome::Failed(e)
            }
        }
    }

    fn remember(&mut self, id: DocumentId, history_index: usize) {
        self.last_committed = self
            .store
            .get(id)
            .and_then(|doc| doc.record(history_index))
            .map(|record| LastCommit {
                id,
                history_index,
                record: record.clone(),
            });
    }

    /// Revert the remembered remote commit.
    ///
    /// The remembered commit is cleared whether or not the revert succeeds;
    /// a failed revert can still be retried later through history restore.
    /// Only [`WorkflowError::NothingToUndo`] is returned as an error, revert
    /// failures come back as an [`ItemOutcome::Failed`].
    async fn undo(&mut self) -> Result<(DocumentId, ItemOutcome), WorkflowError> {
        let (EditTarget::Remote(remote), Some(last)) = (self.target, self.last_committed.take())
        else {
            return Err(WorkflowError::NothingToUndo);
        };

        let result = restore(
            self.store,
            last.id,
            last.history_index,
            EditTarget::Remote(remote),
            self.delay,
        )
        .await;

        let outcome = match result {
            Ok(()) => {
                self.summary.applied = self.summary.applied.saturating_sub(1);
                self.summary.total_replacements =
                    self.summary.total_replacements.saturating_sub(last.record.changes);
                self.summary.restored += 1;
                ItemOutcome::Undone { id: last.id }
            }
            Err(e) => {
                warn!(id = %last.id, error = %e, "undo failed, entry stays restorable");
                ItemOutcome::Failed(e)
            }
        };
        Ok((last.id, outcome))
    }
}
