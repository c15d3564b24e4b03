//! Non-interactive replacement over the whole local store.

use serde::Serialize;
use tracing::{info, instrument, warn};

use respan_core::{ReplaceParams, Replacer};

use crate::commit::{Committed, commit_local};
use crate::error::WorkflowError;
use crate::preview::find_candidates;
use crate::store::LocalStore;

/// What a batch run found and changed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub found: usize,
    pub replaced: usize,
    pub total_replacements: usize,
    pub dry_run: bool,
}

/// Apply `params` as a local edit to every candidate document.
///
/// With `dry_run` nothing is written; the report counts what would change.
/// The first failing commit aborts the run, leaving earlier commits in place.
#[instrument(skip(store), fields(search = %params.search))]
pub fn batch_replace(
    store: &mut LocalStore,
    params: &ReplaceParams,
    dry_run: bool,
) -> Result<BatchReport, WorkflowError> {
    let replacer = Replacer::new(params.clone())?;
    let candidates = find_candidates(store, &replacer);

    let mut report = BatchReport {
        found: candidates.len(),
        dry_run,
        ..Default::default()
    };

    for preview in &candidates {
        if dry_run {
            report.replaced += 1;
            report.total_replacements += preview.total_changes();
            continue;
        }
        match commit_local(store, &replacer, preview.id)? {
            Committed::Applied { changes, .. } => {
                report.replaced += 1;
                report.total_replacements += changes;
            }
            other => warn!(id = %preview.id, ?other, "candidate did not change"),
        }
    }

    info!(
        found = report.found,
        replaced = report.replaced,
        total = report.total_replacements,
        dry_run,
        "batch replace finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use respan_core::DocumentSnapshot;
    use respan_types::{DocumentId, Span, SpanKind};

    fn store() -> LocalStore {
        let mut store = LocalStore::in_memory();
        store.insert(DocumentId::new(1), DocumentSnapshot::new("Old news, old times", vec![
            Span::new(SpanKind::Bold, 0, 8),
        ]));
        store.insert(DocumentId::new(2), DocumentSnapshot::new("nothing", vec![]));
        store.insert(
            DocumentId::new(3),
            DocumentSnapshot::new("link", vec![Span::new(
                SpanKind::TextLink { url: "https://old.example".into() },
                0,
                4,
            )]),
        );
        store
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let mut store = store();
        let report = batch_replace(&mut store, &ReplaceParams::new("old", "new", false), true).unwrap();
        assert_eq!(report, BatchReport {
            found: 2,
            replaced: 2,
            total_replacements: 3,
            dry_run: true,
        });
        assert_eq!(store.get(DocumentId::new(1)).unwrap().plain_text(), "Old news, old times");
        assert!(store.get(DocumentId::new(3)).unwrap().history().is_empty());
    }

    #[test]
    fn test_batch_applies_local_edits() {
        let mut store = store();
        let report = batch_replace(&mut store, &ReplaceParams::new("old", "new", false), false).unwrap();
        assert_eq!(report.replaced, 2);
        assert_eq!(report.total_replacements, 3);

        let doc = store.get(DocumentId::new(1)).unwrap();
        assert_eq!(doc.plain_text(), "new news, new times");
        assert_eq!(doc.spans(), &[Span::new(SpanKind::Bold, 0, 8)]);
        assert_eq!(doc.history().len(), 1);

        let link = store.get(DocumentId::new(3)).unwrap();
        assert_eq!(link.spans()[0].url(), Some("https://new.example"));
    }

    #[test]
    fn test_empty_search_rejected() {
        let mut store = store();
        let err = batch_replace(&mut store, &ReplaceParams::new("", "x", true), false).unwrap_err();
        assert!(matches!(err, WorkflowError::Core(respan_core::CoreError::EmptySearch)));
    }
}
