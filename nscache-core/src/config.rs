//! Configuration types

use crate::{CacheResult, ConfigError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Namespace used when the caller does not name one.
pub const DEFAULT_NAMESPACE: &str = "cache";

/// Resolve a caller-supplied namespace, falling back to [`DEFAULT_NAMESPACE`]
/// when it is missing or empty.
pub fn resolve_namespace(namespace: Option<&str>) -> String {
    match namespace {
        Some(ns) if !ns.is_empty() => ns.to_string(),
        _ => DEFAULT_NAMESPACE.to_string(),
    }
}

/// Cache configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Backend namespace the cache reads and writes.
    pub namespace: String,
    /// TTL applied when `set` is called without one. `None` keeps entries
    /// forever.
    pub default_ttl_secs: Option<u64>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            default_ttl_secs: None,
        }
    }
}

impl CacheConfig {
    /// Create a new cache config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the namespace. An empty name falls back to the default.
    pub fn with_namespace(mut self, namespace: impl AsRef<str>) -> Self {
        self.namespace = resolve_namespace(Some(namespace.as_ref()));
        self
    }

    /// Set the TTL used when `set` is called without one.
    pub fn with_default_ttl(mut self, ttl_secs: u64) -> Self {
        self.default_ttl_secs = Some(ttl_secs);
        self
    }

    /// Validate the configuration.
    ///
    /// Validates:
    /// - namespace is not empty
    /// - default_ttl_secs, when set, is positive
    pub fn validate(&self) -> CacheResult<()> {
        if self.namespace.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "namespace".to_string(),
                value: String::new(),
                reason: "must not be empty".to_string(),
            }
            .into());
        }

        if self.default_ttl_secs == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "default_ttl_secs".to_string(),
                value: "0".to_string(),
                reason: "must be positive".to_string(),
            }
            .into());
        }

        Ok(())
    }
}

/// LMDB backend configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LmdbConfig {
    /// Directory where LMDB files are stored. Created if missing.
    pub path: PathBuf,
    /// Maximum size of the memory map in megabytes.
    pub max_size_mb: usize,
}

impl LmdbConfig {
    pub fn new(path: impl Into<PathBuf>, max_size_mb: usize) -> Self {
        Self {
            path: path.into(),
            max_size_mb,
        }
    }

    /// Map size in bytes, or `None` if it does not fit in a `usize`.
    pub fn map_size_bytes(&self) -> Option<usize> {
        self.max_size_mb.checked_mul(1024 * 1024)
    }

    /// Validate the configuration.
    ///
    /// Validates:
    /// - max_size_mb is positive
    /// - max_size_mb in bytes fits in a `usize`
    pub fn validate(&self) -> CacheResult<()> {
        if self.max_size_mb == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_size_mb".to_string(),
                value: "0".to_string(),
                reason: "must be positive".to_string(),
            }
            .into());
        }

        if self.map_size_bytes().is_none() {
            return Err(ConfigError::InvalidValue {
                field: "max_size_mb".to_string(),
                value: self.max_size_mb.to_string(),
                reason: "map size overflows usize".to_string(),
            }
            .into());
        }

        Ok(())
    }
}
