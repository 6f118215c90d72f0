//! In-memory record store.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use super::{Listing, RecordStore, StoreError, StoreResult};

#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, BTreeMap<String, serde_json::Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordStore for MemoryStore {
    fn put(&self, collection: &str, id: &str, value: &serde_json::Value) -> StoreResult<()> {
        let mut collections = self
            .collections
            .write()
            .map_err(|_| StoreError::LockPoisoned)?;
        collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), value.clone());
        Ok(())
    }

    fn get(&self, collection: &str, id: &str) -> StoreResult<Option<serde_json::Value>> {
        let collections = self
            .collections
            .read()
            .map_err(|_| StoreError::LockPoisoned)?;
        Ok(collections
            .get(collection)
            .and_then(|records| records.get(id))
            .cloned())
    }

    fn list(&self, collection: &str) -> StoreResult<Listing<serde_json::Value>> {
        let collections = self
            .collections
            .read()
            .map_err(|_| StoreError::LockPoisoned)?;
        let records = collections
            .get(collection)
            .map(|records| records.values().cloned().collect())
            .unwrap_or_default();
        Ok(Listing {
            records,
            skipped: 0,
        })
    }
}
