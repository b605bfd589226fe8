// 🗄️ Document store
// Minimal document-store surface the import pipeline needs: page through ids,
// read one document, and commit an atomic batch of merge-writes and deletes.

pub mod firestore;
pub mod memory;
pub mod sqlite;

use crate::error::StoreError;

pub use firestore::FirestoreStore;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Document fields as a JSON object.
pub type Fields = serde_json::Map<String, serde_json::Value>;

/// Address of one document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocRef {
    pub collection: String,
    pub id: String,
}

impl DocRef {
    pub fn new(collection: impl Into<String>, id: impl Into<String>) -> Self {
        DocRef {
            collection: collection.into(),
            id: id.into(),
        }
    }
}

/// One write inside a batch.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    /// Create or update. With `merge` only the given fields are replaced and
    /// the rest of the stored document survives. `server_timestamp` names a
    /// field the store sets to its own commit time.
    Set {
        doc: DocRef,
        fields: Fields,
        merge: bool,
        server_timestamp: Option<String>,
    },
    Delete { doc: DocRef },
}

/// Ordered group of writes committed atomically.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        WriteBatch { ops: Vec::new() }
    }

    /// Merge-upsert `fields` into `doc`, stamping `server_timestamp` if given.
    pub fn set_merge(
        &mut self,
        doc: DocRef,
        fields: Fields,
        server_timestamp: Option<&str>,
    ) -> &mut Self {
        self.ops.push(WriteOp::Set {
            doc,
            fields,
            merge: true,
            server_timestamp: server_timestamp.map(str::to_string),
        });
        self
    }

    pub fn delete(&mut self, doc: DocRef) -> &mut Self {
        self.ops.push(WriteOp::Delete { doc });
        self
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<WriteOp> {
        self.ops
    }
}

/// Backend-neutral document store.
///
/// Handles are created once by the caller and passed in explicitly; nothing
/// in the crate keeps a process-wide client.
pub trait DocumentStore {
    /// Up to `limit` document ids from `collection`, in the store's order.
    fn list_ids(&self, collection: &str, limit: usize) -> Result<Vec<String>, StoreError>;

    fn get(&self, doc: &DocRef) -> Result<Option<Fields>, StoreError>;

    /// Commit every op of `batch` or none of them.
    fn commit(&mut self, batch: WriteBatch) -> Result<(), StoreError>;
}

/// Resolve a `Set` against the currently stored fields. Used by the local
/// backends; the remote backend lets the server do this.
pub(crate) fn apply_set(
    existing: Option<Fields>,
    fields: &Fields,
    merge: bool,
    server_timestamp: Option<&str>,
    now: &str,
) -> Fields {
    let mut doc = match existing {
        Some(existing) if merge => existing,
        _ => Fields::new(),
    };
    for (key, value) in fields {
        doc.insert(key.clone(), value.clone());
    }
    if let Some(field) = server_timestamp {
        doc.insert(field.to_string(), serde_json::Value::String(now.to_string()));
    }
    doc
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
    fn test_apply_set_merge_keeps_out_of_band_fields() {
        let existing = fields(json!({"price1": 1, "note": "manual"}));
        let merged = apply_set(
            Some(existing),
            &fields(json!({"price1": 2})),
            true,
            Some("updatedAt"),
            "2026-01-01T00:00:00Z",
        );
        assert_eq!(merged["price1"], 2);
        assert_eq!(merged["note"], "manual");
        assert_eq!(merged["updatedAt"], "2026-01-01T00:00:00Z");
    }

    #[test]
    fn test_apply_set_overwrite_drops_other_fields() {
        let existing = fields(json!({"price1": 1, "note": "manual"}));
        let replaced = apply_set(Some(existing), &fields(json!({"price1": 2})), false, None, "now");
        assert_eq!(replaced.len(), 1);
    }

    #[test]
    fn test_batch_builder() {
        let mut batch = WriteBatch::new();
        batch
            .set_merge(DocRef::new("priceItems", "p_1"), Fields::new(), Some("updatedAt"))
            .delete(DocRef::new("priceItems", "p_2"));
        assert_eq!(batch.len(), 2);
        assert!(matches!(batch.ops()[1], WriteOp::Delete { .. }));
    }
}
