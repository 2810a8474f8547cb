//! nscache Test Utilities
//!
//! Shared test infrastructure for the nscache workspace:
//! - Proptest generators for keys, values and TTLs
//! - A backend whose writes complete only when the test says so
//! - Fixtures for common cache setups

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

pub use nscache_core::{
    CacheConfig, CacheEntry, CacheError, CacheState, CacheValue, Clock, Expiration, FixedClock,
    ManualClock, StorageError, StorageResult,
};
pub use nscache_storage::{MemoryBackend, NamespacedCache, PersistCompleter, PersistHandle};

use nscache_storage::StorageBackend;
use proptest::prelude::*;
use serde_json::Value;

// ============================================================================
// FIXTURES
// ============================================================================

/// 2024-01-01 00:00:00 UTC
pub const EPOCH_2024: i64 = 1_704_067_200;

/// A manual clock starting at [`EPOCH_2024`].
pub fn test_clock() -> ManualClock {
    ManualClock::new(EPOCH_2024)
}

/// A JSON-valued cache over `backend`, driven by `clock`.
pub fn memory_cache(
    backend: Arc<MemoryBackend>,
    namespace: &str,
    clock: ManualClock,
) -> NamespacedCache<Value, MemoryBackend> {
    NamespacedCache::builder()
        .backend(backend)
        .namespace(namespace)
        .clock(clock)
        .build()
        .expect("memory cache should build")
}

// ============================================================================
// PROPTEST STRATEGIES
// ============================================================================

/// Strategy for cache keys.
pub fn key_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        // Identifier-like keys
        "[a-z][a-z0-9_]{0,11}",
        // Hierarchical keys as used for inventory paths
        "[a-z]{1,6}(:[a-z0-9]{1,6}){1,3}",
        // Odd but legal keys
        Just(String::new()),
        Just("has space".to_string()),
    ]
}

/// Strategy for JSON values, nested up to a small depth.
pub fn json_value_strategy() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        "[a-zA-Z0-9 ]{0,16}".prop_map(Value::from),
    ];

    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map("[a-z]{1,6}", inner, 0..4)
                .prop_map(|map| Value::Object(map.into_iter().collect())),
        ]
    })
}

/// Strategy for TTLs: mostly positive, sometimes absent or zero.
pub fn ttl_strategy() -> impl Strategy<Value = Option<u64>> {
    prop_oneof![
        3 => (1u64..86_400).prop_map(Some),
        1 => Just(None),
        1 => Just(Some(0)),
    ]
}

/// One mutating call against a cache.
#[derive(Debug, Clone)]
pub enum CacheOp {
    Set {
        key: String,
        value: Value,
        ttl_secs: Option<u64>,
    },
    Remove {
        key: String,
    },
    Advance {
        secs: i64,
    },
    Clear,
}

/// Strategy for a single [`CacheOp`]. Clears are rare so sequences build up
/// state.
pub fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        6 => (key_strategy(), json_value_strategy(), ttl_strategy())
            .prop_map(|(key, value, ttl_secs)| CacheOp::Set { key, value, ttl_secs }),
        2 => key_strategy().prop_map(|key| CacheOp::Remove { key }),
        2 => (0i64..120).prop_map(|secs| CacheOp::Advance { secs }),
        1 => Just(CacheOp::Clear),
    ]
}

/// Apply `op` to `cache`, advancing `clock` for [`CacheOp::Advance`].
pub fn apply_op<B: StorageBackend>(
    cache: &mut NamespacedCache<Value, B>,
    clock: &ManualClock,
    op: &CacheOp,
) -> Option<PersistHandle> {
    match op {
        CacheOp::Set {
            key,
            value,
            ttl_secs,
        } => Some(cache.set(key, value.clone(), *ttl_secs)),
        CacheOp::Remove { key } => Some(cache.remove(key)),
        CacheOp::Advance { secs } => {
            clock.advance(*secs);
            None
        }
        CacheOp::Clear => Some(cache.clear()),
    }
}

// ============================================================================
// DEFERRED BACKEND
// ============================================================================

struct QueuedWrite {
    namespace: String,
    blob: StorageResult<Option<Value>>,
    completer: PersistCompleter,
}

/// Backend whose writes stay pending until [`flush`](Self::flush) or
/// [`flush_one`](Self::flush_one) applies them to an inner [`MemoryBackend`].
///
/// Models a host store whose persistence completes asynchronously, so tests
/// can observe the cache's in-memory state running ahead of the backend.
#[derive(Default)]
pub struct DeferredBackend {
    inner: MemoryBackend,
    queue: Mutex<VecDeque<QueuedWrite>>,
}

impl DeferredBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// The backend that flushed writes land in.
    pub fn inner(&self) -> &MemoryBackend {
        &self.inner
    }

    /// Number of writes issued but not yet applied.
    pub fn pending_writes(&self) -> usize {
        self.queue.lock().map(|queue| queue.len()).unwrap_or(0)
    }

    /// Apply the oldest pending write. Returns false if none was pending.
    pub fn flush_one(&self) -> bool {
        let next = match self.queue.lock() {
            Ok(mut queue) => queue.pop_front(),
            Err(_) => None,
        };
        match next {
            Some(write) => {
                self.apply(write);
                true
            }
            None => false,
        }
    }

    /// Apply the newest pending write first, then the rest newest-to-oldest.
    ///
    /// Simulates a backend that completes back-to-back writes out of order.
    pub fn flush_reversed(&self) -> usize {
        let writes: Vec<QueuedWrite> = match self.queue.lock() {
            Ok(mut queue) => queue.drain(..).rev().collect(),
            Err(_) => Vec::new(),
        };
        let count = writes.len();
        for write in writes {
            self.apply(write);
        }
        count
    }

    /// Apply every pending write in issue order. Returns how many ran.
    pub fn flush(&self) -> usize {
        let mut count = 0;
        while self.flush_one() {
            count += 1;
        }
        count
    }

    /// Drop every pending write without applying it.
    pub fn abandon(&self) -> usize {
        match self.queue.lock() {
            Ok(mut queue) => {
                let count = queue.len();
                queue.clear();
                count
            }
            Err(_) => 0,
        }
    }

    fn apply(&self, write: QueuedWrite) {
        let result = write.blob.and_then(|blob| match blob {
            Some(blob) => self.inner.insert_raw(&write.namespace, blob),
            None => self.inner.remove_raw(&write.namespace),
        });
        tracing::trace!(namespace = %write.namespace, ok = result.is_ok(), "Deferred write applied");
        write.completer.complete(result);
    }
}

impl StorageBackend for DeferredBackend {
    fn read_namespace<T: CacheValue>(
        &self,
        namespace: &str,
    ) -> StorageResult<Option<CacheState<T>>> {
        self.inner.read_namespace(namespace)
    }

    fn write_namespace<T: CacheValue>(
        &self,
        namespace: &str,
        state: Option<&CacheState<T>>,
    ) -> PersistHandle {
        let blob = state
            .map(serde_json::to_value)
            .transpose()
            .map_err(|e| StorageError::Serialization {
                namespace: namespace.to_string(),
                reason: e.to_string(),
            });

        let (handle, completer) = PersistHandle::pending(namespace);
        match self.queue.lock() {
            Ok(mut queue) => queue.push_back(QueuedWrite {
                namespace: namespace.to_string(),
                blob,
                completer,
            }),
            Err(_) => completer.complete(Err(StorageError::LockPoisoned)),
        }
        handle
    }
}
