//! In-memory storage backend.
//!
//! Blobs are kept as `serde_json::Value`, so values make the same round trip
//! through serialization that they would through a persistent store. A
//! second cache opened over the same backend sees exactly what was written.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use nscache_core::{CacheState, CacheValue, StorageError, StorageResult};
use serde_json::Value;

use crate::backend::StorageBackend;
use crate::persist::PersistHandle;

/// In-memory backend for tests and short-lived hosts.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    namespaces: RwLock<HashMap<String, Value>>,
    writes: AtomicU64,
}

impl MemoryBackend {
    /// Create an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a raw blob for `namespace`, bypassing any cache.
    ///
    /// Useful to simulate state left behind by an earlier session. Not
    /// counted as a write.
    pub fn insert_raw(&self, namespace: &str, blob: Value) -> StorageResult<()> {
        self.store(namespace, Some(blob))
    }

    /// Unset `namespace`, bypassing any cache. Not counted as a write.
    pub fn remove_raw(&self, namespace: &str) -> StorageResult<()> {
        self.store(namespace, None)
    }

    /// The raw blob currently stored for `namespace`.
    pub fn raw(&self, namespace: &str) -> StorageResult<Option<Value>> {
        let namespaces = self
            .namespaces
            .read()
            .map_err(|_| StorageError::LockPoisoned)?;
        Ok(namespaces.get(namespace).cloned())
    }

    /// Returns true if `namespace` currently has a stored blob.
    pub fn contains_namespace(&self, namespace: &str) -> bool {
        self.namespaces
            .read()
            .map(|namespaces| namespaces.contains_key(namespace))
            .unwrap_or(false)
    }

    /// Number of writes (including unsets) issued through the backend trait.
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    fn store(&self, namespace: &str, blob: Option<Value>) -> StorageResult<()> {
        let mut namespaces = self
            .namespaces
            .write()
            .map_err(|_| StorageError::LockPoisoned)?;
        match blob {
            Some(blob) => {
                namespaces.insert(namespace.to_string(), blob);
            }
            None => {
                namespaces.remove(namespace);
            }
        }
        Ok(())
    }
}

impl StorageBackend for MemoryBackend {
    fn read_namespace<T: CacheValue>(
        &self,
        namespace: &str,
    ) -> StorageResult<Option<CacheState<T>>> {
        let Some(blob) = self.raw(namespace)? else {
            return Ok(None);
        };

        serde_json::from_value(blob)
            .map(Some)
            .map_err(|e| StorageError::Deserialization {
                namespace: namespace.to_string(),
                reason: e.to_string(),
            })
    }

    fn write_namespace<T: CacheValue>(
        &self,
        namespace: &str,
        state: Option<&CacheState<T>>,
    ) -> PersistHandle {
        self.writes.fetch_add(1, Ordering::SeqCst);

        let result = state
            .map(serde_json::to_value)
            .transpose()
            .map_err(|e| StorageError::Serialization {
                namespace: namespace.to_string(),
                reason: e.to_string(),
            })
            .and_then(|blob| self.store(namespace, blob));

        if let Err(e) = &result {
            tracing::warn!(namespace, error = %e, "Memory backend write failed");
        }

        PersistHandle::ready(result)
    }
}
