//! SQLite persistence for document records.
//!
//! One row per document, holding the whole snapshot as JSON. Rows are
//! written individually so a commit is durable before the next item runs.

use rusqlite::{Connection, Result as SqliteResult, params};
use std::path::Path;

use respan_types::DocumentId;

/// Database handle for document records.
pub struct DocumentDb {
    conn: Connection,
}

/// A stored document row.
#[derive(Debug, Clone)]
pub struct DocumentRow {
    pub id: DocumentId,
    pub record: String,
    pub updated_at: i64,
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS documents (
    id INTEGER PRIMARY KEY,
    record TEXT NOT NULL,
    updated_at INTEGER DEFAULT (unixepoch())
);
"#;

impl DocumentDb {
    /// Open or create a database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> SqliteResult<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Create an in-memory database (for testing).
    pub fn in_memory() -> SqliteResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Insert or replace one document record.
    pub fn upsert(&self, id: DocumentId, record: &str) -> SqliteResult<()> {
        self.conn.execute(
            "INSERT INTO documents (id, record, updated_at) VALUES (?1, ?2, unixepoch())
             ON CONFLICT(id) DO UPDATE SET record = excluded.record, updated_at = excluded.updated_at",
            params![id.get() as i64, record],
        )?;
        Ok(())
    }

    /// All records, ordered by id.
    pub fn load_all(&self) -> SqliteResult<Vec<DocumentRow>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, record, updated_at FROM documents ORDER BY id")?;
        let rows = stmt.query_map([], row_to_document)?;
        rows.collect()
    }
}

fn row_to_document(row: &rusqlite::Row<'_>) -> SqliteResult<DocumentRow> {
    let id: i64 = row.get(0)?;
    Ok(DocumentRow {
        id: DocumentId::new(id as u64),
        record: row.get(1)?,
        updated_at: row.get::<_, Option<i64>>(2)?.unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upsert_replaces_row() {
        let db = DocumentDb::in_memory().unwrap();
        let id = DocumentId::new(7);

        db.upsert(id, r#"{"plain_text":"a"}"#).unwrap();
        db.upsert(id, r#"{"plain_text":"b"}"#).unwrap();

        let rows = db.load_all().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, id);
        assert_eq!(rows[0].record, r#"{"plain_text":"b"}"#);
        assert!(rows[0].updated_at > 0);
    }

    #[test]
    fn test_load_all_ordered() {
        let db = DocumentDb::in_memory().unwrap();
        for n in [30, 10, 20] {
            db.upsert(DocumentId::new(n), "{}").unwrap();
        }
        let ids: Vec<u64> = db.load_all().unwrap().iter().map(|r| r.id.get()).collect();
        assert_eq!(ids, vec![10, 20, 30]);
    }

    #[test]
    fn test_reopen_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("documents.db");
        {
            let db = DocumentDb::open(&path).unwrap();
            db.upsert(DocumentId::new(1), "{}").unwrap();
        }
        let db = DocumentDb::open(&path).unwrap();
        assert_eq!(db.load_all().unwrap().len(), 1);
    }
}
