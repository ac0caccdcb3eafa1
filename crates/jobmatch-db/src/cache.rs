//! Result cache keyed by request fingerprint.
//!
//! A single `RwLock`-guarded map from fingerprint to `(payload, inserted)`.
//! Entries expire after a TTL; on insert, if the map exceeds its soft cap
//! the oldest half (by insertion time) is evicted in one pass. This is
//! deliberately simpler than the mail layer's S3-FIFO/adaptive-TTL cache:
//! the matching pipeline's cache only needs a TTL and a bound on memory,
//! not per-entry access-frequency promotion.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use jobmatch_core::MatchResponse;
use parking_lot::RwLock;
use tracing::debug;

struct Entry {
    value: MatchResponse,
    inserted: Instant,
}

/// Cache hit/miss counters, exposed for health/metrics reporting.
#[derive(Debug, Default)]
pub struct CacheMetrics {
    pub hits: std::sync::atomic::AtomicU64,
    pub misses: std::sync::atomic::AtomicU64,
}

impl CacheMetrics {
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        use std::sync::atomic::Ordering::Relaxed;
        let hits = self.hits.load(Relaxed);
        let misses = self.misses.load(Relaxed);
        let total = hits + misses;
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }
}

/// Fingerprint-keyed result cache with TTL expiry and soft-cap eviction.
pub struct ResultCache {
    entries: RwLock<HashMap<String, Entry>>,
    ttl: Duration,
    soft_cap: usize,
    metrics: CacheMetrics,
}

impl ResultCache {
    #[must_use]
    pub fn new(ttl: Duration, soft_cap: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            soft_cap,
            metrics: CacheMetrics::default(),
        }
    }

    /// Look up a fingerprint. Returns `None` on miss or if the stored
    /// entry has aged past the TTL (expired entries are not evicted here;
    /// they are reclaimed lazily on the next insert that triggers the
    /// soft-cap sweep).
    #[must_use]
    pub fn get(&self, fingerprint: &str) -> Option<MatchResponse> {
        use std::sync::atomic::Ordering::Relaxed;
        let entries = self.entries.read();
        let hit = entries
            .get(fingerprint)
            .filter(|e| e.inserted.elapsed() < self.ttl)
            .map(|e| e.value.clone());
        if hit.is_some() {
            self.metrics.hits.fetch_add(1, Relaxed);
        } else {
            self.metrics.misses.fetch_add(1, Relaxed);
        }
        hit
    }

    /// Insert a result, evicting the oldest half of entries first if the
    /// cache is at or over its soft cap.
    pub fn insert(&self, fingerprint: String, value: MatchResponse) {
        let mut entries = self.entries.write();
        if entries.len() >= self.soft_cap {
            evict_oldest_half(&mut entries);
        }
        entries.insert(
            fingerprint,
            Entry {
                value,
                inserted: Instant::now(),
            },
        );
    }

    #[must_use]
    pub fn metrics(&self) -> &CacheMetrics {
        &self.metrics
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn evict_oldest_half(entries: &mut HashMap<String, Entry>) {
    let mut keyed: Vec<(String, Instant)> = entries
        .iter()
        .map(|(k, e)| (k.clone(), e.inserted))
        .collect();
    keyed.sort_by_key(|(_, inserted)| *inserted);
    let evict_count = keyed.len() / 2;
    debug!(evict_count, total = keyed.len(), "cache soft cap reached, evicting oldest half");
    for (key, _) in keyed.into_iter().take(evict_count) {
        entries.remove(&key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(id: &str) -> MatchResponse {
        let mut resp = MatchResponse::default();
        resp.total_count = Some(id.len() as u64);
        resp
    }

    #[test]
    fn miss_then_hit_after_insert() {
        let cache = ResultCache::new(Duration::from_secs(60), 10);
        assert!(cache.get("fp1").is_none());
        cache.insert("fp1".to_string(), sample("fp1"));
        assert!(cache.get("fp1").is_some());
        assert_eq!(cache.metrics().hits.load(std::sync::atomic::Ordering::Relaxed), 1);
        assert_eq!(cache.metrics().misses.load(std::sync::atomic::Ordering::Relaxed), 1);
    }

    #[test]
    fn expired_entry_counts_as_a_miss() {
        let cache = ResultCache::new(Duration::from_millis(1), 10);
        cache.insert("fp1".to_string(), sample("fp1"));
        std::thread::sleep(Duration::from_millis(5));
        assert!(cache.get("fp1").is_none());
    }

    #[test]
    fn soft_cap_evicts_oldest_half() {
        let cache = ResultCache::new(Duration::from_secs(60), 4);
        for i in 0..4 {
            cache.insert(format!("fp{i}"), sample("x"));
            std::thread::sleep(Duration::from_millis(2));
        }
        assert_eq!(cache.len(), 4);
        // fifth insert should trigger eviction of the oldest two first
        cache.insert("fp4".to_string(), sample("x"));
        assert_eq!(cache.len(), 3);
        assert!(cache.get("fp0").is_none());
        assert!(cache.get("fp1").is_none());
        assert!(cache.get("fp4").is_some());
    }
}
