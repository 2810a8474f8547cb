//! LMDB-backed storage with one record per namespace.
//!
//! Uses the heed crate (Rust bindings for LMDB) to provide a persistent,
//! memory-mapped store for cache namespaces.
//!
//! # Record Format
//!
//! - Key: namespace name as UTF-8 bytes
//! - Value: JSON blob of the namespace's `CacheState`
//!
//! Unsetting a namespace deletes its record.
//!
//! # Thread Safety
//!
//! LMDB provides ACID transactions. Reads use read transactions; writes and
//! unsets each commit their own write transaction before the handle is
//! returned, so every handle from this backend is already resolved.

use std::path::Path;

use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};
use nscache_core::{CacheState, CacheValue, LmdbConfig, StorageError, StorageResult};

use crate::backend::StorageBackend;
use crate::persist::PersistHandle;

/// Error type for LMDB backend setup and operations.
#[derive(Debug, thiserror::Error)]
pub enum LmdbBackendError {
    /// Failed to open or create the LMDB environment.
    #[error("Failed to open LMDB environment: {0}")]
    EnvOpen(String),

    /// Failed to open the database within the environment.
    #[error("Failed to open database: {0}")]
    DbOpen(String),

    /// Transaction error.
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<LmdbBackendError> for StorageError {
    fn from(e: LmdbBackendError) -> Self {
        StorageError::Transaction {
            reason: e.to_string(),
        }
    }
}

/// LMDB-backed storage backend.
///
/// # Example
///
/// ```ignore
/// use nscache_core::LmdbConfig;
/// use nscache_storage::{LmdbBackend, NamespacedCache};
/// use std::sync::Arc;
///
/// let backend = Arc::new(LmdbBackend::open(&LmdbConfig::new("/tmp/nscache", 16))?);
/// let mut cache: NamespacedCache<String, _> = NamespacedCache::open(backend, Some("inventory"))?;
/// cache.set("root", "vco:root".to_string(), Some(300));
/// ```
pub struct LmdbBackend {
    /// The LMDB environment.
    env: Env,
    /// The main database (single unnamed database).
    db: Database<Bytes, Bytes>,
}

impl std::fmt::Debug for LmdbBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LmdbBackend")
            .field("path", &self.env.path())
            .finish_non_exhaustive()
    }
}

impl LmdbBackend {
    /// Open an LMDB backend from configuration.
    pub fn open(config: &LmdbConfig) -> Result<Self, LmdbBackendError> {
        config
            .validate()
            .map_err(|e| LmdbBackendError::Config(e.to_string()))?;
        Self::new(&config.path, config.max_size_mb)
    }

    /// Create a new LMDB backend.
    ///
    /// # Arguments
    ///
    /// * `path` - Directory where LMDB files will be stored
    /// * `max_size_mb` - Maximum size of the database in megabytes
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `max_size_mb` is zero or too large to express in bytes
    /// - The directory cannot be created
    /// - LMDB environment cannot be opened
    /// - Database cannot be created
    pub fn new<P: AsRef<Path>>(path: P, max_size_mb: usize) -> Result<Self, LmdbBackendError> {
        let map_size = max_size_mb
            .checked_mul(1024 * 1024)
            .filter(|bytes| *bytes > 0)
            .ok_or_else(|| {
                LmdbBackendError::Config(format!("invalid max_size_mb: {}", max_size_mb))
            })?;

        std::fs::create_dir_all(&path)?;

        // SAFETY: the environment is opened once per path by this process and
        // the files are not modified or truncated by anything else.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(1)
                .open(path.as_ref())
        }
        .map_err(|e| LmdbBackendError::EnvOpen(e.to_string()))?;

        let mut wtxn = env
            .write_txn()
            .map_err(|e| LmdbBackendError::Transaction(e.to_string()))?;

        let db: Database<Bytes, Bytes> = env
            .create_database(&mut wtxn, None)
            .map_err(|e| LmdbBackendError::DbOpen(e.to_string()))?;

        wtxn.commit()
            .map_err(|e| LmdbBackendError::Transaction(e.to_string()))?;

        tracing::debug!(path = %path.as_ref().display(), max_size_mb, "Opened LMDB backend");

        Ok(Self { env, db })
    }

    /// Names of all namespaces with a stored record.
    pub fn namespaces(&self) -> StorageResult<Vec<String>> {
        let rtxn = self.env.read_txn().map_err(transaction_error)?;

        let mut namespaces = Vec::new();
        for result in self.db.iter(&rtxn).map_err(transaction_error)? {
            let (key, _) = result.map_err(transaction_error)?;
            namespaces.push(String::from_utf8_lossy(key).into_owned());
        }

        Ok(namespaces)
    }

    fn put(&self, namespace: &str, blob: &[u8]) -> StorageResult<()> {
        let mut wtxn = self.env.write_txn().map_err(transaction_error)?;
        self.db
            .put(&mut wtxn, namespace.as_bytes(), blob)
            .map_err(transaction_error)?;
        wtxn.commit().map_err(transaction_error)
    }

    fn delete(&self, namespace: &str) -> StorageResult<()> {
        let mut wtxn = self.env.write_txn().map_err(transaction_error)?;
        self.db
            .delete(&mut wtxn, namespace.as_bytes())
            .map_err(transaction_error)?;
        wtxn.commit().map_err(transaction_error)
    }
}

fn transaction_error(e: heed::Error) -> StorageError {
    LmdbBackendError::Transaction(e.to_string()).into()
}

impl StorageBackend for LmdbBackend {
    fn read_namespace<T: CacheValue>(
        &self,
        namespace: &str,
    ) -> StorageResult<Option<CacheState<T>>> {
        let rtxn = self.env.read_txn().map_err(transaction_error)?;

        let Some(bytes) = self
            .db
            .get(&rtxn, namespace.as_bytes())
            .map_err(transaction_error)?
        else {
            return Ok(None);
        };

        serde_json::from_slice(bytes)
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
        let result = match state {
            Some(state) => serde_json::to_vec(state)
                .map_err(|e| StorageError::Serialization {
                    namespace: namespace.to_string(),
                    reason: e.to_string(),
                })
                .and_then(|blob| self.put(namespace, &blob)),
            None => self.delete(namespace),
        };

        if let Err(e) = &result {
            tracing::warn!(namespace, error = %e, "LMDB backend write failed");
        }

        PersistHandle::ready(result)
    }
}
