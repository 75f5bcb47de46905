//! In-memory override store
//!
//! Default for development and the test double for resolver tests.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::{OverrideRecord, OverrideStore, PersistenceError};

#[derive(Default)]
pub struct InMemoryOverrideStore {
    scopes: RwLock<HashMap<String, BTreeMap<String, OverrideRecord>>>,
    reads: AtomicUsize,
    writes: AtomicUsize,
}

impl InMemoryOverrideStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a store from records, e.g. in tests
    pub fn with_records(records: impl IntoIterator<Item = OverrideRecord>) -> Self {
        let store = Self::new();
        {
            let mut scopes = store.scopes.write();
            for record in records {
                scopes
                    .entry(record.scope_id.clone())
                    .or_default()
                    .insert(record.config_key.clone(), record);
            }
        }
        store
    }

    /// Number of read calls served
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::Relaxed)
    }

    /// Number of write and remove calls served
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl OverrideStore for InMemoryOverrideStore {
    async fn get(
        &self,
        scope_id: &str,
        key: &str,
    ) -> Result<Option<OverrideRecord>, PersistenceError> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        Ok(self
            .scopes
            .read()
            .get(scope_id)
            .and_then(|scope| scope.get(key))
            .cloned())
    }

    async fn list_by_scope(&self, scope_id: &str) -> Result<Vec<OverrideRecord>, PersistenceError> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        Ok(self
            .scopes
            .read()
            .get(scope_id)
            .map(|scope| scope.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn write(&self, record: &OverrideRecord) -> Result<(), PersistenceError> {
        self.writes.fetch_add(1, Ordering::Relaxed);
        self.scopes
            .write()
            .entry(record.scope_id.clone())
            .or_default()
            .insert(record.config_key.clone(), record.clone());
        Ok(())
    }

    async fn remove(&self, scope_id: &str, key: &str) -> Result<(), PersistenceError> {
        self.writes.fetch_add(1, Ordering::Relaxed);
        let mut scopes = self.scopes.write();
        if let Some(scope) = scopes.get_mut(scope_id) {
            scope.remove(key);
            if scope.is_empty() {
                scopes.remove(scope_id);
            }
        }
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_write_get_list_remove() {
        let store = InMemoryOverrideStore::new();
        store
            .write(&OverrideRecord::new("server#g1", "notes.enabled", json!(false)))
            .await
            .unwrap();
        store
            .write(&OverrideRecord::new("server#g1", "ask.enabled", json!(true)).with_updated_by("u1"))
            .await
            .unwrap();

        let record = store.get("server#g1", "ask.enabled").await.unwrap().unwrap();
        assert_eq!(record.updated_by.as_deref(), Some("u1"));

        let listed = store.list_by_scope("server#g1").await.unwrap();
        assert_eq!(listed.len(), 2);
        assert!(store.list_by_scope("server#g2").await.unwrap().is_empty());

        store.remove("server#g1", "ask.enabled").await.unwrap();
        store.remove("server#g1", "missing").await.unwrap();
        assert!(store.get("server#g1", "ask.enabled").await.unwrap().is_none());
        assert_eq!(store.write_count(), 4);
    }

    #[tokio::test]
    async fn test_write_replaces_existing_row() {
        let store = InMemoryOverrideStore::with_records([OverrideRecord::new(
            "user#g1#u1",
            "transcription.language",
            json!("en"),
        )]);
        store
            .write(&OverrideRecord::new("user#g1#u1", "transcription.language", json!("fr")))
            .await
            .unwrap();

        let listed = store.list_by_scope("user#g1#u1").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].value, json!("fr"));
    }
}
