//! Namespaced expiring cache.
//!
//! A [`NamespacedCache`] mirrors one namespace of a storage backend in
//! memory. Reads are served from memory; every mutation writes the whole
//! namespace back and hands the caller a [`PersistHandle`](crate::PersistHandle)
//! for the write's completion.
//!
//! # Example
//!
//! ```ignore
//! let backend = Arc::new(MemoryBackend::new());
//! let mut cache = NamespacedCache::<Value, _>::builder()
//!     .backend(backend)
//!     .namespace("inventory")
//!     .build()?;
//!
//! cache.set("a", json!({"n": 1}), Some(60));
//! assert!(cache.has("a"));
//! ```

pub mod builder;
pub mod namespaced;
pub mod stats;

pub use builder::CacheBuilder;
pub use namespaced::NamespacedCache;
pub use stats::CacheStats;
