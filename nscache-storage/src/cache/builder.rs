//! Builder for [`NamespacedCache`].

use std::marker::PhantomData;
use std::sync::Arc;

use nscache_core::{
    resolve_namespace, CacheConfig, CacheError, CacheResult, CacheValue, Clock, SystemClock,
};

use super::namespaced::NamespacedCache;
use crate::backend::StorageBackend;

/// Builder for a [`NamespacedCache`].
///
/// A backend is required; everything else has a default. An explicit
/// [`namespace`](Self::namespace) wins over the one in the config.
pub struct CacheBuilder<T, B> {
    backend: Option<Arc<B>>,
    namespace: Option<String>,
    clock: Option<Arc<dyn Clock>>,
    config: CacheConfig,
    _value: PhantomData<fn() -> T>,
}

impl<T, B> Default for CacheBuilder<T, B> {
    fn default() -> Self {
        Self {
            backend: None,
            namespace: None,
            clock: None,
            config: CacheConfig::default(),
            _value: PhantomData,
        }
    }
}

impl<T: CacheValue, B: StorageBackend> CacheBuilder<T, B> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the storage backend.
    pub fn backend(mut self, backend: Arc<B>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Set the namespace. An empty name falls back to the default.
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Set the clock used for expiration. Defaults to [`SystemClock`].
    pub fn clock<C: Clock + 'static>(mut self, clock: C) -> Self {
        self.clock = Some(Arc::new(clock));
        self
    }

    /// Set the cache configuration.
    pub fn config(mut self, config: CacheConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the cache, loading its namespace from the backend.
    ///
    /// # Errors
    ///
    /// - [`CacheError::MissingBackend`] if no backend was supplied
    /// - [`CacheError::Config`] if the configuration is invalid
    /// - [`CacheError::Load`] if the backend cannot read the namespace
    pub fn build(self) -> CacheResult<NamespacedCache<T, B>> {
        let backend = self.backend.ok_or(CacheError::MissingBackend)?;
        self.config.validate()?;

        let namespace = match self.namespace.as_deref() {
            Some(namespace) => resolve_namespace(Some(namespace)),
            None => self.config.namespace,
        };
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));

        NamespacedCache::load(backend, namespace, clock, self.config.default_ttl_secs)
    }
}
