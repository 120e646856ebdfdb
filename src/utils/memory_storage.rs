//! In-memory storage implementation for testing

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use crate::traits::*;
use crate::types::*;

/// In-memory store for testing and development
///
/// Clones share the same data, so a test can keep a handle while the job
/// owns another.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    records: Arc<RwLock<BTreeMap<PropertyId, Record>>>,
    insert_calls: Arc<AtomicUsize>,
    close_calls: Arc<AtomicUsize>,
    unavailable: Arc<AtomicBool>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(BTreeMap::new())),
            insert_calls: Arc::new(AtomicUsize::new(0)),
            close_calls: Arc::new(AtomicUsize::new(0)),
            unavailable: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Create a store pre-populated with records
    pub fn with_records(records: impl IntoIterator<Item = Record>) -> Self {
        let store = Self::new();
        if let Ok(mut map) = store.records.write() {
            for record in records {
                if let Some(id) = record.id {
                    map.insert(id, record);
                }
            }
        }
        store
    }

    /// Number of records held
    pub fn len(&self) -> usize {
        self.records.read().map(|map| map.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Look up a stored record
    pub fn get(&self, id: PropertyId) -> Option<Record> {
        self.records.read().ok()?.get(&id).cloned()
    }

    /// How many times `insert_many` has been called
    pub fn insert_calls(&self) -> usize {
        self.insert_calls.load(Ordering::SeqCst)
    }

    /// How many times `close` has been called
    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }

    /// Simulate losing (or regaining) connectivity
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Clear all data (useful for testing)
    pub fn clear(&self) {
        if let Ok(mut map) = self.records.write() {
            map.clear();
        }
    }

    fn ensure_available(&self) -> SyncResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(SyncError::Store("memory store is unavailable".to_string()))
        } else {
            Ok(())
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned<T>(_: T) -> SyncError {
    SyncError::Store("memory store lock poisoned".to_string())
}

#[async_trait]
impl PropertyStore for MemoryStore {
    async fn fetch_ids(&self) -> SyncResult<BTreeSet<PropertyId>> {
        self.ensure_available()?;
        let map = self.records.read().map_err(poisoned)?;
        Ok(map.keys().copied().collect())
    }

    async fn insert_many(&mut self, records: &[Record]) -> SyncResult<usize> {
        self.ensure_available()?;
        self.insert_calls.fetch_add(1, Ordering::SeqCst);

        let mut map = self.records.write().map_err(poisoned)?;
        for record in records {
            let id = record.id.ok_or_else(|| {
                SyncError::Store("cannot insert a record without an identifier".to_string())
            })?;
            if map.contains_key(&id) {
                return Err(SyncError::Store(format!("duplicate identifier {id}")));
            }
        }
        for record in records {
            if let Some(id) = record.id {
                map.insert(id, record.clone());
            }
        }
        Ok(records.len())
    }

    async fn close(&mut self) -> SyncResult<()> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: PropertyId) -> Record {
        Record::with_id(id, "zpid", Attributes::new())
    }

    #[tokio::test]
    async fn test_insert_and_fetch_ids() {
        let mut store = MemoryStore::new();
        let written = store.insert_many(&[record(3), record(1)]).await.unwrap();

        assert_eq!(written, 2);
        assert_eq!(store.insert_calls(), 1);
        let ids: Vec<_> = store.fetch_ids().await.unwrap().into_iter().collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[tokio::test]
    async fn test_duplicate_insert_is_rejected_without_partial_write() {
        let mut store = MemoryStore::with_records([record(1)]);
        let result = store.insert_many(&[record(2), record(1)]).await;

        assert!(matches!(result, Err(SyncError::Store(_))));
        assert_eq!(store.len(), 1);
        assert!(store.get(2).is_none());
    }

    #[tokio::test]
    async fn test_unavailable_store_fails() {
        let store = MemoryStore::new();
        store.set_unavailable(true);
        assert!(matches!(store.fetch_ids().await, Err(SyncError::Store(_))));

        store.set_unavailable(false);
        assert!(store.fetch_ids().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_clones_share_data() {
        let handle = MemoryStore::new();
        let mut owned = handle.clone();
        owned.insert_many(&[record(9)]).await.unwrap();
        owned.close().await.unwrap();

        assert_eq!(handle.len(), 1);
        assert_eq!(handle.close_calls(), 1);
    }
}
