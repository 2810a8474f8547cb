//! Error types for cache operations

use thiserror::Error;

/// Storage backend errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Storage lock poisoned")]
    LockPoisoned,

    #[error("Serialization failed for namespace {namespace}: {reason}")]
    Serialization { namespace: String, reason: String },

    #[error("Deserialization failed for namespace {namespace}: {reason}")]
    Deserialization { namespace: String, reason: String },

    #[error("Transaction failed: {reason}")]
    Transaction { reason: String },

    #[error("Write to namespace {namespace} was abandoned before completion")]
    Abandoned { namespace: String },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Master error type for cache construction.
///
/// Once a cache exists none of its operations fail: mutations that make no
/// sense resolve as no-ops, and reads fall back to `None`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("Missing storage backend")]
    MissingBackend,

    #[error("Failed to load namespace {namespace}: {source}")]
    Load {
        namespace: String,
        source: StorageError,
    },

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias for cache construction.
pub type CacheResult<T> = Result<T, CacheError>;

/// Result type alias for storage backend operations.
pub type StorageResult<T> = Result<T, StorageError>;

// =============================================================================
// TESTS
// =============================================================================
