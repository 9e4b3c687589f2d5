use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{EntryKey, Item, MetadataBackend, BATCH_WRITE_LIMIT};
use crate::error::StoreError;

/// Failures the in-memory backend can be told to produce.
#[derive(Debug, Clone, Default)]
pub struct MetadataFaults {
    pub fail_put: bool,
    pub fail_get: bool,
    pub fail_delete: bool,
    pub fail_batch: bool,
    /// Batch deletes leave keys for these users unprocessed
    pub unprocessed_users: HashSet<String>,
}

#[derive(Debug, Default)]
struct Inner {
    tables: HashMap<String, HashMap<EntryKey, Item>>,
    faults: MetadataFaults,
    batch_sizes: Vec<usize>,
    calls: usize,
}

/// In-memory metadata backend, for tests and local runs.
#[derive(Debug, Clone, Default)]
pub struct MemoryMetadataBackend {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryMetadataBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_faults(&self, faults: MetadataFaults) {
        self.inner.lock().faults = faults;
    }

    /// Store `item` under `key` unconditionally.
    pub fn insert_item(&self, table: &str, key: EntryKey, item: Item) {
        self.inner
            .lock()
            .tables
            .entry(table.to_string())
            .or_default()
            .insert(key, item);
    }

    pub fn item(&self, table: &str, key: &EntryKey) -> Option<Item> {
        self.inner
            .lock()
            .tables
            .get(table)
            .and_then(|items| items.get(key).cloned())
    }

    pub fn len(&self, table: &str) -> usize {
        self.inner
            .lock()
            .tables
            .get(table)
            .map(|items| items.len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self, table: &str) -> bool {
        self.len(table) == 0
    }

    /// Sizes of the batch delete requests received so far.
    pub fn batch_sizes(&self) -> Vec<usize> {
        self.inner.lock().batch_sizes.clone()
    }

    /// Number of backend calls received so far.
    pub fn call_count(&self) -> usize {
        self.inner.lock().calls
    }
}

#[async_trait]
impl MetadataBackend for MemoryMetadataBackend {
    async fn put_if_absent(
        &self,
        table: &str,
        key: &EntryKey,
        item: Item,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        inner.calls += 1;
        if inner.faults.fail_put {
            return Err(StoreError::service(
                "InternalServerError",
                "injected put failure",
            ));
        }

        let items = inner.tables.entry(table.to_string()).or_default();
        if items.contains_key(key) {
            return Err(StoreError::ConditionalCheckFailed);
        }
        items.insert(key.clone(), item);
        Ok(())
    }

    async fn get(
        &self,
        table: &str,
        key: &EntryKey,
        projection: &[&str],
    ) -> Result<Option<Item>, StoreError> {
        let mut inner = self.inner.lock();
        inner.calls += 1;
        if inner.faults.fail_get {
            return Err(StoreError::service(
                "InternalServerError",
                "injected get failure",
            ));
        }

        let item = inner.tables.get(table).and_then(|items| items.get(key));
        Ok(item.map(|item| {
            if projection.is_empty() {
                return item.clone();
            }
            item.iter()
                .filter(|(name, _)| projection.contains(&name.as_str()))
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect()
        }))
    }

    async fn delete(&self, table: &str, key: &EntryKey) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        inner.calls += 1;
        if inner.faults.fail_delete {
            return Err(StoreError::service(
                "InternalServerError",
                "injected delete failure",
            ));
        }

        if let Some(items) = inner.tables.get_mut(table) {
            items.remove(key);
        }
        Ok(())
    }

    async fn batch_delete(
        &self,
        table: &str,
        keys: Vec<EntryKey>,
    ) -> Result<Vec<EntryKey>, StoreError> {
        let mut inner = self.inner.lock();
        inner.calls += 1;
        if keys.len() > BATCH_WRITE_LIMIT {
            return Err(StoreError::service(
                "ValidationException",
                format!(
                    "batch of {} keys exceeds the limit of {}",
                    keys.len(),
                    BATCH_WRITE_LIMIT
                ),
            ));
        }
        inner.batch_sizes.push(keys.len());
        if inner.faults.fail_batch {
            return Err(StoreError::service(
                "InternalServerError",
                "injected batch failure",
            ));
        }

        let unprocessed_users = inner.faults.unprocessed_users.clone();
        let items = inner.tables.entry(table.to_string()).or_default();
        let mut unprocessed = Vec::new();
        for key in keys {
            if unprocessed_users.contains(&key.user) {
                unprocessed.push(key);
            } else {
                items.remove(&key);
            }
        }
        Ok(unprocessed)
    }
}
