// SQLite-backed document store: one table of JSON documents keyed by
// (collection, id). Useful as a local mirror and for offline runs.

use std::path::Path;

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use super::{apply_set, DocRef, DocumentStore, Fields, WriteBatch, WriteOp};
use crate::error::StoreError;

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        Self::from_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    pub fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        setup_database(&conn)?;
        Ok(SqliteStore { conn })
    }

    pub fn count(&self, collection: &str) -> Result<i64, StoreError> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM documents WHERE collection = ?1",
            [collection],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

pub fn setup_database(conn: &Connection) -> Result<(), StoreError> {
    // Enable WAL mode for crash recovery (in-memory databases report "memory")
    let _mode: String =
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS documents (
            collection TEXT NOT NULL,
            id TEXT NOT NULL,
            fields TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            PRIMARY KEY (collection, id)
        )",
        [],
    )?;

    Ok(())
}

fn read_fields(conn: &Connection, doc: &DocRef) -> Result<Option<Fields>, StoreError> {
    let json: Option<String> = conn
        .query_row(
            "SELECT fields FROM documents WHERE collection = ?1 AND id = ?2",
            params![doc.collection, doc.id],
            |row| row.get(0),
        )
        .optional()?;
    match json {
        Some(json) => Ok(Some(serde_json::from_str(&json)?)),
        None => Ok(None),
    }
}

impl DocumentStore for SqliteStore {
    fn list_ids(&self, collection: &str, limit: usize) -> Result<Vec<String>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id FROM documents WHERE collection = ?1 ORDER BY id LIMIT ?2")?;
        let ids = stmt
            .query_map(params![collection, limit as i64], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(ids)
    }

    fn get(&self, doc: &DocRef) -> Result<Option<Fields>, StoreError> {
        read_fields(&self.conn, doc)
    }

    fn commit(&mut self, batch: WriteBatch) -> Result<(), StoreError> {
        let now = Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;

        for op in batch.into_ops() {
            match op {
                WriteOp::Set {
                    doc,
                    fields,
                    merge,
                    server_timestamp,
                } => {
                    let existing = read_fields(&tx, &doc)?;
                    let next = apply_set(existing, &fields, merge, server_timestamp.as_deref(), &now);
                    tx.execute(
                        "INSERT INTO documents (collection, id, fields, updated_at)
                         VALUES (?1, ?2, ?3, ?4)
                         ON CONFLICT(collection, id)
                         DO UPDATE SET fields = excluded.fields, updated_at = excluded.updated_at",
                        params![doc.collection, doc.id, serde_json::to_string(&next)?, now],
                    )?;
                }
                WriteOp::Delete { doc } => {
                    tx.execute(
                        "DELETE FROM documents WHERE collection = ?1 AND id = ?2",
                        params![doc.collection, doc.id],
                    )?;
                }
            }
        }

        // Dropping the transaction on an early return rolls it back.
        tx.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: serde_json::Value) -> Fields {
        match value {
            serde_json::Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_merge_write_preserves_existing_fields() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let doc = DocRef::new("priceItems", "p_1");

        let mut first = WriteBatch::new();
        first.set_merge(doc.clone(), fields(json!({"name": "X", "note": "keep me"})), None);
        store.commit(first).unwrap();

        let mut second = WriteBatch::new();
        second.set_merge(doc.clone(), fields(json!({"name": "Y"})), Some("updatedAt"));
        store.commit(second).unwrap();

        let stored = store.get(&doc).unwrap().unwrap();
        assert_eq!(stored["name"], "Y");
        assert_eq!(stored["note"], "keep me");
        assert!(stored["updatedAt"].is_string());
        assert_eq!(store.count("priceItems").unwrap(), 1);

        println!("✅ SQLite merge write test PASSED");
    }

    #[test]
    fn test_delete_and_list() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let mut batch = WriteBatch::new();
        for id in ["c", "a", "b"] {
            batch.set_merge(DocRef::new("priceItems", id), Fields::new(), None);
        }
        batch.set_merge(DocRef::new("other", "z"), Fields::new(), None);
        store.commit(batch).unwrap();

        assert_eq!(store.list_ids("priceItems", 2).unwrap(), vec!["a", "b"]);

        let mut delete = WriteBatch::new();
        delete.delete(DocRef::new("priceItems", "a"));
        store.commit(delete).unwrap();

        assert_eq!(store.list_ids("priceItems", 10).unwrap(), vec!["b", "c"]);
        assert_eq!(store.count("other").unwrap(), 1);
        assert!(store.get(&DocRef::new("priceItems", "a")).unwrap().is_none());
    }

    #[test]
    fn test_reopen_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prices.db");
        {
            let mut store = SqliteStore::open(&path).unwrap();
            let mut batch = WriteBatch::new();
            batch.set_merge(DocRef::new("priceItems", "p_1"), fields(json!({"price1": 10.0})), None);
            store.commit(batch).unwrap();
        }
        let store = SqliteStore::open(&path).unwrap();
        let doc = store.get(&DocRef::new("priceItems", "p_1")).unwrap().unwrap();
        assert_eq!(doc["price1"], 10.0);
    }
}
