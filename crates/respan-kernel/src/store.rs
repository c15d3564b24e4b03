//! Local document store.
//!
//! All snapshots live in memory, keyed and ordered by [`DocumentId`]. When
//! backed by a [`DocumentDb`], [`LocalStore::flush`] writes one document
//! through synchronously; the workflow calls it after every commit.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::{debug, warn};

use respan_core::DocumentSnapshot;
use respan_types::DocumentId;

use crate::db::DocumentDb;
use crate::error::StoreError;

pub type StoreResult<T> = Result<T, StoreError>;

/// In-memory document map with optional write-through persistence.
#[derive(Default)]
pub struct LocalStore {
    docs: BTreeMap<DocumentId, DocumentSnapshot>,
    db: Option<DocumentDb>,
}

impl LocalStore {
    /// A store with no persistence.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load every record from `db` and keep it for write-through.
    ///
    /// Rows that no longer parse are skipped with a warning.
    pub fn with_db(db: DocumentDb) -> StoreResult<Self> {
        let mut docs = BTreeMap::new();
        for row in db.load_all()? {
            match serde_json::from_str::<DocumentSnapshot>(&row.record) {
                Ok(doc) => {
                    docs.insert(row.id, doc);
                }
                Err(e) => warn!(id = %row.id, error = %e, "skipping unreadable document record"),
            }
        }
        debug!(documents = docs.len(), "loaded local store");
        Ok(Self { docs, db: Some(db) })
    }

    /// Open (or create) a SQLite-backed store at `path`.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Self::with_db(DocumentDb::open(path)?)
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    pub fn contains(&self, id: DocumentId) -> bool {
        self.docs.contains_key(&id)
    }

    pub fn get(&self, id: DocumentId) -> Option<&DocumentSnapshot> {
        self.docs.get(&id)
    }

    pub fn get_mut(&mut self, id: DocumentId) -> Option<&mut DocumentSnapshot> {
        self.docs.get_mut(&id)
    }

    /// Like [`get_mut`](Self::get_mut), but missing documents are an error.
    pub fn require_mut(&mut self, id: DocumentId) -> StoreResult<&mut DocumentSnapshot> {
        self.docs.get_mut(&id).ok_or(StoreError::NotFound(id))
    }

    /// Ids in ascending order.
    pub fn ids(&self) -> Vec<DocumentId> {
        self.docs.keys().copied().collect()
    }

    /// Documents in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = (DocumentId, &DocumentSnapshot)> {
        self.docs.iter().map(|(id, doc)| (*id, doc))
    }

    /// Add or replace a document in memory. Call [`flush`](Self::flush) to
    /// persist it.
    pub fn insert(&mut self, id: DocumentId, doc: DocumentSnapshot) {
        self.docs.insert(id, doc);
    }

    /// Persist one document. A no-op for in-memory stores.
    pub fn flush(&self, id: DocumentId) -> StoreResult<()> {
        let Some(db) = &self.db else {
            return Ok(());
        };
        let doc = self.docs.get(&id).ok_or(StoreError::NotFound(id))?;
        db.upsert(id, &serde_json::to_string(doc)?)?;
        debug!(%id, "flushed document");
        Ok(())
    }

    /// Merge a whole-store JSON object (`{"<id>": record, ...}`) into this
    /// store and persist the imported documents. Returns how many were read.
    pub fn import_json(&mut self, json: &str) -> StoreResult<usize> {
        let raw: BTreeMap<String, DocumentSnapshot> = serde_json::from_str(json)?;
        let mut imported = Vec::with_capacity(raw.len());
        for (key, doc) in raw {
            let id = DocumentId::from_key(&key).ok_or(StoreError::InvalidKey(key))?;
            imported.push((id, doc));
        }

        let count = imported.len();
        for (id, doc) in imported {
            self.docs.insert(id, doc);
            self.flush(id)?;
        }
        Ok(count)
    }

    /// The whole store as one pretty-printed JSON object keyed by id.
    pub fn export_json(&self) -> StoreResult<String> {
        let keyed: BTreeMap<String, &DocumentSnapshot> =
            self.docs.iter().map(|(id, doc)| (id.to_key(), doc)).collect();
        Ok(serde_json::to_string_pretty(&keyed)?)
    }

    /// Read a whole-store JSON file from disk.
    pub fn import_file(&mut self, path: impl AsRef<Path>) -> StoreResult<usize> {
        let json = std::fs::read_to_string(path)?;
        self.import_json(&json)
    }

    /// Write the whole store to a JSON file.
    pub fn export_file(&self, path: impl AsRef<Path>) -> StoreResult<()> {
        std::fs::write(path, self.export_json()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use respan_types::{Span, SpanKind};

    fn id(n: u64) -> DocumentId {
        DocumentId::new(n)
    }

    #[test]
    fn test_flush_writes_through() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.db");

        let mut store = LocalStore::open(&path).unwrap();
        store.insert(id(3), DocumentSnapshot::new("hi", vec![Span::new(SpanKind::Bold, 0, 2)]));
        store.insert(id(4), DocumentSnapshot::new("unflushed", vec![]));
        store.flush(id(3)).unwrap();
        drop(store);

        let reopened = LocalStore::open(&path).unwrap();
        assert_eq!(reopened.ids(), vec![id(3)]);
        assert_eq!(reopened.get(id(3)).unwrap().display_text(), "**hi**");
    }

    #[test]
    fn test_flush_missing_document() {
        let store = LocalStore::with_db(DocumentDb::in_memory().unwrap()).unwrap();
        assert!(matches!(store.flush(id(1)), Err(StoreError::NotFound(_))));
        // in-memory stores have nothing to flush
        assert!(LocalStore::in_memory().flush(id(1)).is_ok());
    }

    #[test]
    fn test_import_export_json() {
        let json = r#"{
            "20": {"plain_text": "second", "spans": [], "display_text": "second"},
            "5": {"plain_text": "first", "spans": [{"kind": "italic", "offset": 0, "length": 5}],
                  "display_text": "*first*"}
        }"#;
        let mut store = LocalStore::in_memory();
        assert_eq!(store.import_json(json).unwrap(), 2);
        assert_eq!(store.ids(), vec![id(5), id(20)]);

        let exported = store.export_json().unwrap();
        let mut again = LocalStore::in_memory();
        again.import_json(&exported).unwrap();
        assert_eq!(again.get(id(5)), store.get(id(5)));
    }

    #[test]
    fn test_import_rejects_bad_key() {
        let mut store = LocalStore::in_memory();
        let err = store.import_json(r#"{"abc": {}}"#).unwrap_err();
        assert!(matches!(err, StoreError::InvalidKey(k) if k == "abc"));
        assert!(store.is_empty());
    }
}
