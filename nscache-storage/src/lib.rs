//! nscache Storage - Namespaced Expiring Cache and Storage Backends
//!
//! Defines the storage backend abstraction, the in-memory and LMDB backends,
//! and the namespaced cache that persists through them.

pub mod backend;
pub mod cache;
pub mod lmdb_backend;
pub mod memory;
pub mod persist;

pub use backend::StorageBackend;
pub use cache::{CacheBuilder, CacheStats, NamespacedCache};
pub use lmdb_backend::{LmdbBackend, LmdbBackendError};
pub use memory::MemoryBackend;
pub use persist::{PersistCompleter, PersistHandle};

// Re-export core types used in this crate's public API
pub use nscache_core::{
    CacheConfig, CacheEntry, CacheError, CacheResult, CacheState, CacheValue, Clock, Expiration,
    FixedClock, LmdbConfig, ManualClock, StorageError, StorageResult, SystemClock,
};
