use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;

use super::ObjectBackend;
use crate::error::StoreError;

/// Failures the in-memory backend can be told to produce.
#[derive(Debug, Clone, Default)]
pub struct ObjectFaults {
    pub fail_head: bool,
    pub fail_put: bool,
}

#[derive(Debug, Default)]
struct Inner {
    objects: HashMap<String, Bytes>,
    faults: ObjectFaults,
    calls: usize,
}

/// In-memory object backend, for tests and local runs.
#[derive(Debug, Clone, Default)]
pub struct MemoryObjectBackend {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryObjectBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_faults(&self, faults: ObjectFaults) {
        self.inner.lock().faults = faults;
    }

    pub fn insert(&self, key: impl Into<String>, body: Bytes) {
        self.inner.lock().objects.insert(key.into(), body);
    }

    pub fn object(&self, key: &str) -> Option<Bytes> {
        self.inner.lock().objects.get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of backend calls received so far.
    pub fn call_count(&self) -> usize {
        self.inner.lock().calls
    }
}

#[async_trait]
impl ObjectBackend for MemoryObjectBackend {
    async fn head(&self, key: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        inner.calls += 1;
        if inner.faults.fail_head {
            return Err(StoreError::service("InternalError", "injected head failure"));
        }
        if inner.objects.contains_key(key) {
            Ok(())
        } else {
            Err(StoreError::NotFound(key.to_string()))
        }
    }

    async fn put(&self, key: &str, body: Bytes) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        inner.calls += 1;
        if inner.faults.fail_put {
            return Err(StoreError::service("InternalError", "injected put failure"));
        }
        inner.objects.insert(key.to_string(), body);
        Ok(())
    }
}
