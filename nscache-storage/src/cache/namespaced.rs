//! Namespaced cache with per-key expiration.
//!
//! The cache loads its namespace's entire blob from the backend when it is
//! constructed, mutates the in-memory copy on every write, and persists the
//! full blob back on every mutating call.
//!
//! # Expiration
//!
//! Expired entries are filtered at read time by [`get`](NamespacedCache::get)
//! and [`has`](NamespacedCache::has) only. They stay in memory and in the
//! backend until overwritten, removed, or cleared, and they still show up in
//! [`keys`](NamespacedCache::keys) and [`all`](NamespacedCache::all).

use std::collections::HashMap;
use std::sync::Arc;

use nscache_core::{
    CacheEntry, CacheError, CacheResult, CacheState, CacheValue, Clock, Expiration,
};

use super::builder::CacheBuilder;
use super::stats::{CacheStats, Lookup, StatsRecorder};
use crate::backend::StorageBackend;
use crate::persist::PersistHandle;

/// Expiring key-value cache over one namespace of a [`StorageBackend`].
///
/// Mutations take `&mut self`; a cache is driven from one logical thread of
/// control and needs no locking. The returned [`PersistHandle`] reports when
/// the backend finished the write, but the in-memory state is already updated
/// when the call returns.
///
/// # Example
///
/// ```ignore
/// let backend = Arc::new(MemoryBackend::new());
/// let mut cache: NamespacedCache<serde_json::Value, _> = NamespacedCache::open(backend, None)?;
///
/// cache.set("a", json!({"n": 1}), Some(60)).await?;
/// assert_eq!(cache.get("a"), Some(json!({"n": 1})));
/// ```
pub struct NamespacedCache<T, B> {
    backend: Arc<B>,
    namespace: String,
    state: CacheState<T>,
    clock: Arc<dyn Clock>,
    default_ttl_secs: Option<u64>,
    stats: StatsRecorder,
}

impl<T, B> std::fmt::Debug for NamespacedCache<T, B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NamespacedCache")
            .field("namespace", &self.namespace)
            .field("entries", &self.state.len())
            .field("default_ttl_secs", &self.default_ttl_secs)
            .finish_non_exhaustive()
    }
}

impl<T: CacheValue, B: StorageBackend> NamespacedCache<T, B> {
    /// Create a cache over `namespace` (default `"cache"`) of `backend`.
    ///
    /// # Errors
    ///
    /// - [`CacheError::MissingBackend`] if `backend` is `None`
    /// - [`CacheError::Load`] if the backend cannot read the namespace
    pub fn create(backend: Option<Arc<B>>, namespace: Option<&str>) -> CacheResult<Self> {
        let mut builder = Self::builder();
        if let Some(backend) = backend {
            builder = builder.backend(backend);
        }
        if let Some(namespace) = namespace {
            builder = builder.namespace(namespace);
        }
        builder.build()
    }

    /// Create a cache over a backend the caller already holds.
    pub fn open(backend: Arc<B>, namespace: Option<&str>) -> CacheResult<Self> {
        Self::create(Some(backend), namespace)
    }

    pub fn builder() -> CacheBuilder<T, B> {
        CacheBuilder::new()
    }

    pub(crate) fn load(
        backend: Arc<B>,
        namespace: String,
        clock: Arc<dyn Clock>,
        default_ttl_secs: Option<u64>,
    ) -> CacheResult<Self> {
        let state = backend
            .read_namespace::<T>(&namespace)
            .map_err(|source| CacheError::Load {
                namespace: namespace.clone(),
                source,
            })?
            .unwrap_or_default();

        tracing::debug!(namespace = %namespace, entries = state.len(), "Loaded cache namespace");

        Ok(Self {
            backend,
            namespace,
            state,
            clock,
            default_ttl_secs,
            stats: StatsRecorder::default(),
        })
    }

    // ========================================================================
    // MUTATIONS
    // ========================================================================

    /// Store `value` under `key`, expiring `ttl_secs` seconds from now.
    ///
    /// A missing value (`None`) is a no-op that resolves immediately and
    /// issues no backend write. A TTL of `None` falls back to the configured
    /// default; without one, or with a TTL of zero, the entry never expires.
    pub fn set(
        &mut self,
        key: &str,
        value: impl Into<Option<T>>,
        ttl_secs: Option<u64>,
    ) -> PersistHandle {
        let Some(value) = value.into() else {
            tracing::trace!(namespace = %self.namespace, key, "Ignoring set without a value");
            return PersistHandle::done();
        };

        let expiration = Expiration::after(self.now(), ttl_secs.or(self.default_ttl_secs));
        self.state
            .insert(key.to_string(), CacheEntry::new(value, expiration));

        tracing::debug!(
            namespace = %self.namespace,
            key,
            expiration = i64::from(expiration),
            "Cache entry set"
        );
        self.persist()
    }

    /// Delete `key`.
    ///
    /// Removing an absent key is a no-op that issues no backend write.
    /// Expired entries are present and are removed like any other.
    pub fn remove(&mut self, key: &str) -> PersistHandle {
        if self.state.remove(key).is_none() {
            tracing::trace!(namespace = %self.namespace, key, "Ignoring remove of absent key");
            return PersistHandle::done();
        }

        tracing::debug!(namespace = %self.namespace, key, "Cache entry removed");
        self.persist()
    }

    /// Drop every entry and unset the namespace in the backend.
    ///
    /// The backend record is unset rather than replaced with an empty map.
    pub fn clear(&mut self) -> PersistHandle {
        self.state.clear();
        self.stats.record_write();

        tracing::debug!(namespace = %self.namespace, "Cache namespace cleared");
        self.backend.write_namespace::<T>(&self.namespace, None)
    }

    fn persist(&self) -> PersistHandle {
        self.stats.record_write();
        self.backend
            .write_namespace(&self.namespace, Some(&self.state))
    }

    // ========================================================================
    // READS
    // ========================================================================

    /// Value stored under `key`, or `None` if absent or expired.
    pub fn get(&self, key: &str) -> Option<T> {
        self.lookup(key).cloned()
    }

    /// Value stored under `key`, or `default` if the key is absent.
    ///
    /// An expired entry yields `None`, not `default`: expiry wins over the
    /// caller's fallback.
    pub fn get_or(&self, key: &str, default: T) -> Option<T> {
        match self.state.get(key) {
            None => {
                self.stats.record(Lookup::Miss);
                Some(default)
            }
            Some(_) => self.get(key),
        }
    }

    /// Returns true if `key` is present and not expired.
    pub fn has(&self, key: &str) -> bool {
        self.lookup(key).is_some()
    }

    fn lookup(&self, key: &str) -> Option<&T> {
        let Some(entry) = self.state.get(key) else {
            self.stats.record(Lookup::Miss);
            return None;
        };

        if entry.is_expired_at(self.now()) {
            tracing::trace!(namespace = %self.namespace, key, "Cache entry expired");
            self.stats.record(Lookup::Expired);
            return None;
        }

        self.stats.record(Lookup::Hit);
        Some(&entry.value)
    }

    /// Every key held by the cache, sorted, expired ones included.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.state.keys().cloned().collect();
        keys.sort_unstable();
        keys
    }

    /// Every stored value by key, expired ones included.
    pub fn all(&self) -> HashMap<String, T> {
        self.state
            .iter()
            .map(|(key, entry)| (key.clone(), entry.value.clone()))
            .collect()
    }

    /// Raw expiration of `key` in seconds since the epoch.
    ///
    /// `None` if the key is absent or never expires.
    pub fn get_expiration(&self, key: &str) -> Option<i64> {
        self.state
            .get(key)
            .and_then(|entry| entry.expiration.timestamp())
    }

    /// Returns true if `key` is present with an expiration that has passed.
    pub fn is_expired(&self, key: &str) -> bool {
        self.state
            .get(key)
            .is_some_and(|entry| entry.is_expired_at(self.now()))
    }

    /// Current time in whole seconds since the epoch.
    pub fn now(&self) -> i64 {
        self.clock.now_epoch_secs()
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Number of entries held, expired ones included.
    pub fn len(&self) -> usize {
        self.state.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot(self.state.len())
    }
}
