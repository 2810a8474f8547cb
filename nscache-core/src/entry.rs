//! Cache entry types
//!
//! An entry pairs a value with its expiration. On the wire an entry keeps the
//! `{ "value": ..., "expiration": -1 }` shape, where `-1` means the entry
//! never expires.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::HashMap;

/// Serialized expiration sentinel for entries that never expire.
pub const NEVER_EXPIRES: i64 = -1;

/// Marker trait for values that can be stored in a cache namespace.
///
/// Blanket-implemented for every type that can be cloned out of the cache and
/// round-tripped through a backend's blob format.
pub trait CacheValue: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {}

impl<T> CacheValue for T where T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {}

/// When a cache entry stops being visible to reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum Expiration {
    /// The entry never expires.
    #[default]
    Never,
    /// The entry expires at this many seconds since the Unix epoch.
    At(i64),
}

impl Expiration {
    /// Compute the expiration for an entry written at `now`.
    ///
    /// Only a positive TTL produces a deadline; `None` and `Some(0)` mean the
    /// entry never expires.
    pub fn after(now: i64, ttl_secs: Option<u64>) -> Self {
        match ttl_secs {
            Some(ttl) if ttl > 0 => {
                let ttl = i64::try_from(ttl).unwrap_or(i64::MAX);
                Self::At(now.saturating_add(ttl))
            }
            _ => Self::Never,
        }
    }

    /// Raw deadline in seconds since the epoch, if any.
    pub fn timestamp(&self) -> Option<i64> {
        match self {
            Self::Never => None,
            Self::At(at) => Some(*at),
        }
    }

    /// Returns true if this expiration has been reached at `now`.
    pub fn is_expired_at(&self, now: i64) -> bool {
        match self {
            Self::Never => false,
            Self::At(at) => now >= *at,
        }
    }

    /// Returns true if the entry never expires.
    pub fn is_never(&self) -> bool {
        matches!(self, Self::Never)
    }
}

impl From<i64> for Expiration {
    fn from(raw: i64) -> Self {
        if raw < 0 {
            Self::Never
        } else {
            Self::At(raw)
        }
    }
}

impl From<Expiration> for i64 {
    fn from(expiration: Expiration) -> Self {
        match expiration {
            Expiration::Never => NEVER_EXPIRES,
            Expiration::At(at) => at,
        }
    }
}

/// A cached value and its expiration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    pub value: T,
    /// Missing in older blobs; those entries never expire.
    #[serde(default)]
    pub expiration: Expiration,
}

impl<T> CacheEntry<T> {
    pub fn new(value: T, expiration: Expiration) -> Self {
        Self { value, expiration }
    }

    /// Create an entry that never expires.
    pub fn permanent(value: T) -> Self {
        Self::new(value, Expiration::Never)
    }

    pub fn is_expired_at(&self, now: i64) -> bool {
        self.expiration.is_expired_at(now)
    }

    pub fn into_value(self) -> T {
        self.value
    }
}

/// In-memory mirror of one namespace's persisted blob.
pub type CacheState<T> = HashMap<String, CacheEntry<T>>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_expiration_after_positive_ttl() {
        assert_eq!(Expiration::after(1_000, Some(60)), Expiration::At(1_060));
    }

    #[test]
    fn test_expiration_after_zero_or_missing_ttl_never_expires() {
        assert_eq!(Expiration::after(1_000, None), Expiration::Never);
        assert_eq!(Expiration::after(1_000, Some(0)), Expiration::Never);
    }

    #[test]
    fn test_expiration_after_saturates() {
        assert_eq!(
            Expiration::after(i64::MAX - 1, Some(u64::MAX)),
            Expiration::At(i64::MAX)
        );
    }

    #[test]
    fn test_expiration_boundary_is_inclusive() {
        let expiration = Expiration::At(100);
        assert!(!expiration.is_expired_at(99));
        assert!(expiration.is_expired_at(100));
        assert!(expiration.is_expired_at(101));
    }

    #[test]
    fn test_never_does_not_expire() {
        assert!(!Expiration::Never.is_expired_at(i64::MAX));
        assert_eq!(Expiration::Never.timestamp(), None);
    }

    #[test]
    fn test_entry_serializes_with_sentinel() {
        let entry = CacheEntry::permanent(json!({"n": 1}));
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json, json!({"value": {"n": 1}, "expiration": -1}));
    }

    #[test]
    fn test_entry_serializes_deadline() {
        let entry = CacheEntry::new("x".to_string(), Expiration::At(1_704_067_260));
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json, json!({"value": "x", "expiration": 1_704_067_260i64}));
    }

    #[test]
    fn test_entry_without_expiration_field_never_expires() {
        let entry: CacheEntry<String> = serde_json::from_value(json!({"value": "x"})).unwrap();
        assert_eq!(entry.expiration, Expiration::Never);
    }

    #[test]
    fn test_negative_expiration_reads_as_never() {
        let entry: CacheEntry<i32> =
            serde_json::from_value(json!({"value": 3, "expiration": -7})).unwrap();
        assert!(entry.expiration.is_never());
        assert_eq!(entry.into_value(), 3);
    }

    #[test]
    fn test_state_blob_shape() {
        let blob = json!({
            "a": {"value": 1, "expiration": -1},
            "b": {"value": 2, "expiration": 50},
        });
        let state: CacheState<i32> = serde_json::from_value(blob).unwrap();
        assert_eq!(state.len(), 2);
        assert!(!state["a"].is_expired_at(1_000));
        assert!(state["b"].is_expired_at(50));
    }
}
