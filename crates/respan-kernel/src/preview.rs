//! Candidate discovery and before/after previews.

use tracing::debug;

use respan_core::{DocumentSnapshot, Replacer, markup};
use respan_types::DocumentId;

use crate::store::LocalStore;

/// What a replacement would do to one document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Preview {
    pub id: DocumentId,
    /// Display markup of the current content.
    pub original: String,
    /// Display markup after the replacement.
    pub replaced: String,
    /// Occurrences in the text.
    pub matches: usize,
    /// Link URLs that would change.
    pub url_changes: usize,
}

impl Preview {
    pub fn total_changes(&self) -> usize {
        self.matches + self.url_changes
    }
}

/// Run `replacer` against a throwaway copy of `doc`'s content.
///
/// `None` when nothing would change, in the text or in any link URL.
pub fn probe(replacer: &Replacer, id: DocumentId, doc: &DocumentSnapshot) -> Option<Preview> {
    let (text, spans) = doc.effective_spans();
    let out = replacer.apply(&text, &spans);
    if !out.changed() {
        return None;
    }
    Some(Preview {
        id,
        original: markup::render(&text, &spans),
        replaced: markup::render(&out.text, &out.spans),
        matches: out.matches,
        url_changes: out.url_changes,
    })
}

/// Every document the replacement would change, by ascending id.
pub fn find_candidates(store: &LocalStore, replacer: &Replacer) -> Vec<Preview> {
    let candidates: Vec<Preview> = store
        .iter()
        .filter_map(|(id, doc)| probe(replacer, id, doc))
        .collect();
    debug!(
        search = %replacer.params().search,
        scanned = store.len(),
        found = candidates.len(),
        "probed local store"
    );
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use respan_core::ReplaceParams;
    use respan_types::{Span, SpanKind};

    fn replacer(search: &str, replace: &str, case_sensitive: bool) -> Replacer {
        Replacer::new(ReplaceParams::new(search, replace, case_sensitive)).unwrap()
    }

    fn store() -> LocalStore {
        let mut store = LocalStore::in_memory();
        store.insert(DocumentId::new(30), DocumentSnapshot::new("cats and dogs", vec![]));
        store.insert(DocumentId::new(10), DocumentSnapshot::new("Cats rule", vec![
            Span::new(SpanKind::Bold, 0, 4),
        ]));
        store.insert(DocumentId::new(20), DocumentSnapshot::new("nothing here", vec![]));
        store.insert(
            DocumentId::new(40),
            DocumentSnapshot::new("read more", vec![Span::new(
                SpanKind::TextLink { url: "https://cats.example".into() },
                0,
                9,
            )]),
        );
        store
    }

    #[test]
    fn test_candidates_sorted_and_filtered() {
        let found = find_candidates(&store(), &replacer("cats", "birds", false));
        let ids: Vec<u64> = found.iter().map(|p| p.id.get()).collect();
        assert_eq!(ids, vec![10, 30, 40]);
    }

    #[test]
    fn test_url_only_candidate_admitted() {
        let found = find_candidates(&store(), &replacer("cats", "birds", true));
        let link = found.iter().find(|p| p.id.get() == 40).unwrap();
        assert_eq!(link.matches, 0);
        assert_eq!(link.url_changes, 1);
        assert_eq!(link.replaced, "[read more](https://birds.example)");
    }

    #[test]
    fn test_probe_renders_both_sides() {
        let store = store();
        let id = DocumentId::new(10);
        let preview = probe(&replacer("cats", "dogs", false), id, store.get(id).unwrap()).unwrap();
        assert_eq!(preview.original, "**Cats** rule");
        assert_eq!(preview.replaced, "**dogs** rule");
        assert_eq!(preview.total_changes(), 1);
        // the store is untouched
        assert_eq!(store.get(id).unwrap().plain_text(), "Cats rule");
    }
}
