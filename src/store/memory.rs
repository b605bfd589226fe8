// In-memory document store. Backs the CLI dry-run mode and lets tests inject
// a commit failure at a chosen batch.

use std::collections::BTreeMap;

use chrono::Utc;

use super::{apply_set, DocRef, DocumentStore, Fields, WriteBatch, WriteOp};
use crate::error::StoreError;

#[derive(Debug, Default)]
pub struct MemoryStore {
    docs: BTreeMap<DocRef, Fields>,
    commits: usize,
    fail_on_commit: Option<usize>,
    commit_sizes: Vec<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the `n`-th commit attempt (1-based) fail without applying.
    pub fn fail_on_commit(mut self, n: usize) -> Self {
        self.fail_on_commit = Some(n);
        self
    }

    /// Sizes of the batches that were applied, in order.
    pub fn commit_sizes(&self) -> &[usize] {
        &self.commit_sizes
    }

    pub fn count(&self, collection: &str) -> usize {
        self.docs.keys().filter(|d| d.collection == collection).count()
    }

    /// Seed a document directly, bypassing batches.
    pub fn insert(&mut self, doc: DocRef, fields: Fields) {
        self.docs.insert(doc, fields);
    }
}

impl DocumentStore for MemoryStore {
    fn list_ids(&self, collection: &str, limit: usize) -> Result<Vec<String>, StoreError> {
        Ok(self
            .docs
            .keys()
            .filter(|d| d.collection == collection)
            .take(limit)
            .map(|d| d.id.clone())
            .collect())
    }

    fn get(&self, doc: &DocRef) -> Result<Option<Fields>, StoreError> {
        Ok(self.docs.get(doc).cloned())
    }

    fn commit(&mut self, batch: WriteBatch) -> Result<(), StoreError> {
        self.commits += 1;
        if self.fail_on_commit == Some(self.commits) {
            return Err(StoreError::Injected(self.commits));
        }

        let now = Utc::now().to_rfc3339();
        let size = batch.len();
        for op in batch.into_ops() {
            match op {
                WriteOp::Set {
                    doc,
                    fields,
                    merge,
                    server_timestamp,
                } => {
                    let existing = self.docs.remove(&doc);
                    let next = apply_set(existing, &fields, merge, server_timestamp.as_deref(), &now);
                    self.docs.insert(doc, next);
                }
                WriteOp::Delete { doc } => {
                    self.docs.remove(&doc);
                }
            }
        }
        self.commit_sizes.push(size);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn one_field(key: &str, value: serde_json::Value) -> Fields {
        let mut fields = Fields::new();
        fields.insert(key.to_string(), value);
        fields
    }

    #[test]
    fn test_commit_and_list() {
        let mut store = MemoryStore::new();
        let mut batch = WriteBatch::new();
        batch.set_merge(DocRef::new("a", "2"), one_field("x", json!(1)), None);
        batch.set_merge(DocRef::new("a", "1"), one_field("x", json!(2)), Some("updatedAt"));
        batch.set_merge(DocRef::new("b", "3"), one_field("x", json!(3)), None);
        store.commit(batch).unwrap();

        assert_eq!(store.list_ids("a", 10).unwrap(), vec!["1", "2"]);
        assert_eq!(store.list_ids("a", 1).unwrap(), vec!["1"]);
        assert_eq!(store.count("b"), 1);
        let doc = store.get(&DocRef::new("a", "1")).unwrap().unwrap();
        assert!(doc.contains_key("updatedAt"));
        assert_eq!(store.commit_sizes(), &[3]);
    }

    #[test]
    fn test_injected_failure_applies_nothing() {
        let mut store = MemoryStore::new().fail_on_commit(1);
        let mut batch = WriteBatch::new();
        batch.set_merge(DocRef::new("a", "1"), Fields::new(), None);
        let err = store.commit(batch.clone()).unwrap_err();
        assert!(matches!(err, StoreError::Injected(1)));
        assert_eq!(store.count("a"), 0);

        // Later attempts go through.
        store.commit(batch).unwrap();
        assert_eq!(store.count("a"), 1);
    }
}
