//! Committing one approved replacement.
//!
//! Both paths end the same way: append the history entry, mutate the local
//! snapshot, flush that one document. The remote path first re-fetches the
//! authoritative copy and pushes to it, so the local mirror only changes once
//! the remote has accepted the edit.

use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use respan_core::Replacer;
use respan_types::{DocumentId, EditMode, EditRecord};

use crate::error::{StoreError, WorkflowError};
use crate::remote::{CommitOutcome, RemoteStore};
use crate::store::LocalStore;

/// Pause after each remote push.
pub const DEFAULT_REMOTE_DELAY: Duration = Duration::from_millis(500);

/// Where edits and restores are written.
#[derive(Clone, Copy)]
pub enum EditTarget<'a> {
    /// The local snapshot only.
    LocalOnly,
    /// The remote store first, mirrored into the local snapshot.
    Remote(&'a dyn RemoteStore),
}

impl EditTarget<'_> {
    pub fn mode(&self) -> EditMode {
        match self {
            EditTarget::LocalOnly => EditMode::LocalOnly,
            EditTarget::Remote(_) => EditMode::RemoteSynchronized,
        }
    }
}

impl std::fmt::Debug for EditTarget<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EditTarget({})", self.mode())
    }
}

/// Result of committing one item.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Committed {
    /// The edit landed; `history_index` locates its record.
    Applied { changes: usize, history_index: usize },
    /// The content no longer contains anything to replace.
    Stale,
    /// The remote already held the replaced content.
    RemoteUnchanged,
}

/// Replace within the local snapshot of `id` and persist it.
pub fn commit_local(
    store: &mut LocalStore,
    replacer: &Replacer,
    id: DocumentId,
) -> Result<Committed, WorkflowError> {
    let doc = store.require_mut(id)?;
    let before = doc.content();
    let out = replacer.apply(&before.plain_text, &before.spans);
    if !out.changed() {
        debug!(%id, "nothing left to replace locally");
        return Ok(Committed::Stale);
    }

    let changes = out.total_changes();
    let params = replacer.params();
    let record = EditRecord::local(&params.search, &params.replace, before, changes, Utc::now());

    doc.apply_mutation(out.text, out.spans)?;
    let history_index = doc.push_history(record);
    store.flush(id)?;

    info!(%id, changes, "updated locally");
    Ok(Committed::Applied {
        changes,
        history_index,
    })
}

/// Replace within the remote copy of `id`, then mirror it locally.
///
/// The replacement is computed against content fetched right now, never the
/// local cache. If that fresh content has nothing to replace the edit is
/// abandoned as [`Committed::Stale`]. Once the remote has accepted, a local
/// failure comes back as [`WorkflowError::MirrorFailed`] with the history
/// entry already recorded.
#[instrument(skip(store, remote, replacer), fields(search = %replacer.params().search))]
pub async fn commit_remote(
    store: &mut LocalStore,
    remote: &dyn RemoteStore,
    replacer: &Replacer,
    id: DocumentId,
    delay: Duration,
) -> Result<Committed, WorkflowError> {
    if !store.contains(id) {
        return Err(StoreError::NotFound(id).into());
    }

    let fresh = remote.fetch(id).await?;
    if fresh.plain_text.is_empty() {
        return Err(WorkflowError::EmptyRemote(id));
    }

    let out = replacer.apply(&fresh.plain_text, &fresh.spans);
    if !out.changed() {
        warn!(%id, "no replacements in fresh remote content, leaving it alone");
        return Ok(Committed::Stale);
    }
    let changes = out.total_changes();

    match remote.commit(id, &out.text, &out.spans).await? {
        CommitOutcome::Unchanged => {
            debug!(%id, "remote reported content unchanged");
            return Ok(Committed::RemoteUnchanged);
        }
        CommitOutcome::Applied => {}
    }

    // The remote has changed from here on; record it before any local step
    // that can fail so the edit stays undoable.
    let doc = store.require_mut(id)?;
    let params = replacer.params();
    let record = EditRecord::remote(
        &params.search,
        &params.replace,
        fresh.into(),
        doc.content(),
        changes,
        Utc::now(),
    );
    let history_index = doc.push_history(record);
    doc.set_edited_remotely(true);
    let mutated = doc.apply_mutation(out.text, out.spans);
    let flushed = store.flush(id);
    tokio::time::sleep(delay).await;

    if let Err(e) = mutated.map_err(WorkflowError::from).and(flushed.map_err(WorkflowError::from)) {
        warn!(%id, error = %e, "edited on remote, local copy not saved");
        return Err(WorkflowError::MirrorFailed {
            id,
            history_index,
            changes,
            source: Box::new(e),
        });
    }

    info!(%id, changes, "edited on remote and saved locally");
    Ok(Committed::Applied {
        changes,
        history_index,
    })
}
