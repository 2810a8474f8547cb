//! Property-Based Tests for the Namespaced Cache
//!
//! **Property 1: Expiration**
//! A value written with a positive TTL is readable until the TTL has
//! elapsed and unreadable afterwards, whatever default the caller passes.
//!
//! **Property 2: Guarded mutations**
//! Writes without a value and removes of absent keys never reach the backend.
//!
//! **Property 3: Enumeration vs. reads**
//! `keys`/`all` report every stored entry; `get`/`has` hide expired ones.
//!
//! **Property 4: Reload**
//! A second cache over the same backend answers `get`/`has` like the first.

use std::collections::HashMap;
use std::sync::Arc;

use nscache_storage::{MemoryBackend, NamespacedCache};
use nscache_test_utils::{
    apply_op, cache_op_strategy, json_value_strategy, key_strategy, memory_cache, test_clock,
    ttl_strategy, CacheOp, ManualClock,
};
use proptest::prelude::*;
use serde_json::Value;

// ============================================================================
// REFERENCE MODEL
// ============================================================================

/// Expected contents: key -> (value, deadline).
#[derive(Debug, Default)]
struct Model {
    entries: HashMap<String, (Value, Option<i64>)>,
}

impl Model {
    fn apply(&mut self, op: &CacheOp, now: i64) {
        match op {
            CacheOp::Set {
                key,
                value,
                ttl_secs,
            } => {
                let deadline = ttl_secs.filter(|ttl| *ttl > 0).map(|ttl| now + ttl as i64);
                self.entries.insert(key.clone(), (value.clone(), deadline));
            }
            CacheOp::Remove { key } => {
                self.entries.remove(key);
            }
            CacheOp::Advance { .. } => {}
            CacheOp::Clear => self.entries.clear(),
        }
    }

    fn live(&self, key: &str, now: i64) -> Option<&Value> {
        self.entries.get(key).and_then(|(value, deadline)| match deadline {
            Some(deadline) if now >= *deadline => None,
            _ => Some(value),
        })
    }
}

fn fresh_cache() -> (NamespacedCache<Value, MemoryBackend>, Arc<MemoryBackend>, ManualClock) {
    let backend = Arc::new(MemoryBackend::new());
    let clock = test_clock();
    let cache = memory_cache(backend.clone(), "cache", clock.clone());
    (cache, backend, clock)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_value_expires_after_ttl(
        key in key_strategy(),
        value in json_value_strategy(),
        default in json_value_strategy(),
        ttl in 1u64..10_000,
        overshoot in 0i64..10_000,
    ) {
        let (mut cache, _backend, clock) = fresh_cache();

        let _ = cache.set(&key, value.clone(), Some(ttl));
        prop_assert_eq!(cache.get(&key), Some(value.clone()));
        prop_assert!(!cache.is_expired(&key));

        clock.advance(ttl as i64 - 1);
        prop_assert!(cache.has(&key));

        clock.advance(1 + overshoot);
        prop_assert!(cache.is_expired(&key));
        prop_assert_eq!(cache.get(&key), None);
        prop_assert_eq!(cache.get_or(&key, default), None);
        prop_assert!(!cache.has(&key));
        prop_assert_eq!(cache.keys(), vec![key]);
    }

    #[test]
    fn prop_no_ttl_never_expires(
        key in key_strategy(),
        value in json_value_strategy(),
        advance in 0i64..4_000_000_000,
    ) {
        let (mut cache, _backend, clock) = fresh_cache();

        let _ = cache.set(&key, value.clone(), None);
        clock.advance(advance);

        prop_assert!(!cache.is_expired(&key));
        prop_assert_eq!(cache.get_expiration(&key), None);
        prop_assert_eq!(cache.get(&key), Some(value));
    }

    #[test]
    fn prop_set_without_value_is_noop(
        key in key_strategy(),
        ttl in ttl_strategy(),
        existing in proptest::option::of(json_value_strategy()),
    ) {
        let (mut cache, backend, _clock) = fresh_cache();
        if let Some(existing) = &existing {
            let _ = cache.set(&key, existing.clone(), None);
        }
        let writes_before = backend.write_count();
        let had_key = cache.has(&key);

        let _ = cache.set(&key, None::<Value>, ttl);

        prop_assert_eq!(cache.has(&key), had_key);
        prop_assert_eq!(cache.get(&key), existing);
        prop_assert_eq!(backend.write_count(), writes_before);
    }

    #[test]
    fn prop_remove_semantics(
        key in key_strategy(),
        other in key_strategy(),
        value in json_value_strategy(),
    ) {
        prop_assume!(key != other);
        let (mut cache, backend, _clock) = fresh_cache();

        let _ = cache.remove(&key);
        prop_assert_eq!(backend.write_count(), 0);

        let _ = cache.set(&key, value.clone(), None);
        let _ = cache.set(&other, value, None);
        let _ = cache.remove(&key);

        prop_assert!(!cache.has(&key));
        prop_assert_eq!(backend.write_count(), 3);
        let blob = backend.raw("cache").unwrap().expect("namespace should be stored");
        prop_assert!(blob.get(&key).is_none());
        prop_assert!(blob.get(&other).is_some());
    }

    /// Random operation sequences agree with a reference model, including the
    /// asymmetry between enumeration and reads.
    #[test]
    fn prop_matches_reference_model(
        ops in prop::collection::vec(cache_op_strategy(), 1..40),
    ) {
        let (mut cache, backend, clock) = fresh_cache();
        let mut model = Model::default();

        for op in &ops {
            model.apply(op, cache.now());
            let _ = apply_op(&mut cache, &clock, op);
        }

        let now = cache.now();
        let mut expected_keys: Vec<String> = model.entries.keys().cloned().collect();
        expected_keys.sort();
        prop_assert_eq!(cache.keys(), expected_keys);

        let expected_all: HashMap<String, Value> = model
            .entries
            .iter()
            .map(|(k, (v, _))| (k.clone(), v.clone()))
            .collect();
        prop_assert_eq!(cache.all(), expected_all);

        for (key, (_, deadline)) in &model.entries {
            let got = cache.get(key);
            prop_assert_eq!(got.as_ref(), model.live(key, now));
            prop_assert_eq!(cache.has(key), model.live(key, now).is_some());
            prop_assert_eq!(cache.get_expiration(key), *deadline);
        }

        if model.entries.is_empty() && matches!(ops.last(), Some(CacheOp::Clear)) {
            prop_assert!(!backend.contains_namespace("cache"));
        }
    }

    #[test]
    fn prop_reload_reproduces_reads(
        ops in prop::collection::vec(cache_op_strategy(), 1..40),
    ) {
        let (mut cache, backend, clock) = fresh_cache();
        for op in &ops {
            let _ = apply_op(&mut cache, &clock, op);
        }

        let reloaded = memory_cache(backend, "cache", clock.clone());
        prop_assert_eq!(reloaded.keys(), cache.keys());
        for key in cache.keys() {
            prop_assert_eq!(reloaded.get(&key), cache.get(&key));
            prop_assert_eq!(reloaded.has(&key), cache.has(&key));
            prop_assert_eq!(reloaded.get_expiration(&key), cache.get_expiration(&key));
        }
    }

    #[test]
    fn prop_clear_empties_and_unsets(
        entries in prop::collection::vec((key_strategy(), json_value_strategy(), ttl_strategy()), 0..10),
    ) {
        let (mut cache, backend, _clock) = fresh_cache();
        for (key, value, ttl) in entries {
            let _ = cache.set(&key, value, ttl);
        }

        let _ = cache.clear();

        prop_assert!(cache.keys().is_empty());
        prop_assert!(cache.is_empty());
        prop_assert!(!backend.contains_namespace("cache"));
    }
}
