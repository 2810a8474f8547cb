//! nscache Core - Data Model, Errors, Clocks and Configuration
//!
//! Shared types for the namespaced expiring cache. The cache itself and
//! the storage backends it persists through live in nscache-storage.

pub mod clock;
pub mod config;
pub mod entry;
pub mod error;

pub use clock::{Clock, FixedClock, ManualClock, SystemClock};
pub use config::{resolve_namespace, CacheConfig, LmdbConfig, DEFAULT_NAMESPACE};
pub use entry::{CacheEntry, CacheState, CacheValue, Expiration, NEVER_EXPIRES};
pub use error::{CacheError, CacheResult, ConfigError, StorageError, StorageResult};
