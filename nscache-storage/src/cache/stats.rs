//! Cache usage statistics.

use std::sync::atomic::{AtomicU64, Ordering};

/// Statistics about cache usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Reads that found a live entry.
    pub hits: u64,
    /// Reads for keys that were not present.
    pub misses: u64,
    /// Reads for keys that were present but expired.
    pub expired_reads: u64,
    /// Writes and unsets issued to the backend.
    pub writes: u64,
    /// Entries currently held in memory, expired ones included.
    pub entries: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0). Expired reads count as misses.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses + self.expired_reads;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Lookup outcome, recorded by reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Lookup {
    Hit,
    Miss,
    Expired,
}

/// Counters behind [`CacheStats`], updated from `&self` reads.
#[derive(Debug, Default)]
pub(crate) struct StatsRecorder {
    hits: AtomicU64,
    misses: AtomicU64,
    expired_reads: AtomicU64,
    writes: AtomicU64,
}

impl StatsRecorder {
    pub(crate) fn record(&self, lookup: Lookup) {
        let counter = match lookup {
            Lookup::Hit => &self.hits,
            Lookup::Miss => &self.misses,
            Lookup::Expired => &self.expired_reads,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self, entries: usize) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            expired_reads: self.expired_reads.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            entries: entries as u64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_stats_hit_rate() {
        let stats = CacheStats {
            hits: 6,
            misses: 2,
            expired_reads: 2,
            ..Default::default()
        };
        assert!((stats.hit_rate() - 0.6).abs() < 0.001);

        let empty_stats = CacheStats::default();
        assert!((empty_stats.hit_rate() - 0.0).abs() < 0.001);
    }

    #[test]
    fn test_recorder_snapshot() {
        let recorder = StatsRecorder::default();
        recorder.record(Lookup::Hit);
        recorder.record(Lookup::Hit);
        recorder.record(Lookup::Miss);
        recorder.record(Lookup::Expired);
        recorder.record_write();

        let stats = recorder.snapshot(3);
        assert_eq!(
            stats,
            CacheStats {
                hits: 2,
                misses: 1,
                expired_reads: 1,
                writes: 1,
                entries: 3,
            }
        );
    }
}
