//! Storage backend trait.
//!
//! A backend stores one opaque blob per namespace. The cache reads its
//! namespace once when it is constructed and writes the whole blob back on
//! every mutation. Converting cache values to and from the backend's blob
//! format is the backend's job.

use nscache_core::{CacheState, CacheValue, StorageResult};

use crate::persist::PersistHandle;

/// Pluggable persistence for cache namespaces.
///
/// Implementations must be shareable across threads; several caches (for
/// different namespaces, or successive instances of the same one) may hold
/// the same backend through an `Arc`.
pub trait StorageBackend: Send + Sync {
    /// Read the blob stored for `namespace`.
    ///
    /// Returns `Ok(None)` if the namespace has never been written or was
    /// unset.
    fn read_namespace<T: CacheValue>(&self, namespace: &str)
        -> StorageResult<Option<CacheState<T>>>;

    /// Replace the blob stored for `namespace`.
    ///
    /// `None` unsets the namespace; a later read returns `Ok(None)` rather
    /// than an empty state. The write is issued before this returns and its
    /// completion is reported through the handle.
    fn write_namespace<T: CacheValue>(
        &self,
        namespace: &str,
        state: Option<&CacheState<T>>,
    ) -> PersistHandle;
}
