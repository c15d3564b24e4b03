//! Restoring documents from their edit history.
//!
//! Every history entry holds the full before-state of its edit. An entry can
//! be restored once; afterwards it is marked consumed and further attempts are
//! rejected with [`WorkflowError::RestoreAlreadyConsumed`].

use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{info, instrument};

use respan_types::{DocumentId, EditRecord};

use crate::commit::EditTarget;
use crate::error::{StoreError, WorkflowError};
use crate::remote::CommitOutcome;
use crate::store::LocalStore;

/// Where a restore is written. Same shape as the edit target.
pub type RestoreTarget<'a> = EditTarget<'a>;

/// A history entry that can still be restored.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RestorableEdit {
    pub id: DocumentId,
    pub index: usize,
    pub record: EditRecord,
}

/// Per-document history summary.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EditedDocument {
    pub id: DocumentId,
    pub edits: usize,
    pub remote_edits: usize,
    pub restorable: usize,
    pub last_edit: Option<DateTime<Utc>>,
}

/// Restore history entry `index` of `id` onto `target`.
///
/// Remote restores push the before-state first; the local snapshot and the
/// entry only change once the push succeeds. A remote that already holds the
/// before-state counts as success. Local restores rewrite just the snapshot.
#[instrument(skip(store, target, delay), fields(target = ?target))]
pub async fn restore(
    store: &mut LocalStore,
    id: DocumentId,
    index: usize,
    target: RestoreTarget<'_>,
    delay: Duration,
) -> Result<(), WorkflowError> {
    let record = checked_record(store, id, index)?;
    if matches!(target, EditTarget::Remote(_)) && !record.mode.is_remote() {
        return Err(WorkflowError::LocalRecord { id, index });
    }
    let before = record.before();

    if let EditTarget::Remote(remote) = target {
        let outcome = remote.commit(id, &before.plain_text, &before.spans).await?;
        if outcome == CommitOutcome::Unchanged {
            info!(%id, "remote already held the original content");
        }
    }

    let locally_only = matches!(target, EditTarget::LocalOnly);
    let doc = store.require_mut(id)?;
    doc.apply_mutation(before.plain_text, before.spans)?;
    if !locally_only {
        doc.set_restored_from_backup(true);
    }
    if let Some(record) = doc.record_mut(index) {
        record.mark_restored(locally_only, Utc::now());
    }
    store.flush(id)?;

    info!(%id, index, locally_only, "restored from history");
    if !locally_only {
        tokio::time::sleep(delay).await;
    }
    Ok(())
}

fn checked_record(store: &LocalStore, id: DocumentId, index: usize) -> Result<&EditRecord, WorkflowError> {
    let doc = store.get(id).ok_or(StoreError::NotFound(id))?;
    let record = doc.record(index).ok_or(WorkflowError::NoSuchRecord { id, index })?;
    if !record.restorable {
        return Err(WorkflowError::RestoreAlreadyConsumed { id, index });
    }
    Ok(record)
}

/// Every restorable entry, by document id then history order.
pub fn restorable_edits(store: &LocalStore) -> Vec<RestorableEdit> {
    store
        .iter()
        .flat_map(|(id, doc)| {
            doc.history()
                .iter()
                .enumerate()
                .filter(|(_, r)| r.restorable)
                .map(move |(index, record)| RestorableEdit {
                    id,
                    index,
                    record: record.clone(),
                })
        })
        .collect()
}

/// Documents with any history, by id.
pub fn edited_documents(store: &LocalStore) -> Vec<EditedDocument> {
    store
        .iter()
        .filter(|(_, doc)| !doc.history().is_empty())
        .map(|(id, doc)| {
            let history = doc.history();
            EditedDocument {
                id,
                edits: history.len(),
                remote_edits: history.iter().filter(|r| r.mode.is_remote()).count(),
                restorable: history.iter().filter(|r| r.restorable).count(),
                last_edit: history.iter().map(|r| r.timestamp).max(),
            }
        })
        .collect()
}
