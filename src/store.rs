//! TTL-aware cache storage.
//!
//! `CacheStore` holds the results of live queries keyed by their canonical
//! cache key. Entries expire lazily: an entry whose age exceeds its own TTL
//! is treated as absent by `get` and removed on the spot, and a periodic
//! [`CacheStore::cleanup`] sweep bounds the memory of entries nobody reads
//! again.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use metrics::{counter, gauge, histogram};
use serde_json::Value;
use tracing::debug;

use super::key::{QueryKey, decode};
use super::lock::{rw_read, rw_write};
use super::telemetry::{
    METRIC_ENTRIES, METRIC_EXPIRED_TOTAL, METRIC_HIT_TOTAL, METRIC_INVALIDATED_TOTAL,
    METRIC_MISS_TOTAL, METRIC_SWEEP_MS,
};

const SOURCE: &str = "store";

/// One cached query result with its freshness window.
#[derive(Debug, Clone)]
struct CacheEntry {
    data: Value,
    stored_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    /// Fresh iff `now - stored_at <= ttl`.
    fn is_expired(&self, now: Instant) -> bool {
        now.duration_since(self.stored_at) > self.ttl
    }
}

/// Keyed, TTL-aware value store with expiration-on-read semantics and
/// pattern-based bulk invalidation.
///
/// Every operation is synchronous and infallible. Writes are last-write-wins
/// per key: two consumers bound to the same `(query, args)` pair share one
/// key and converge after either's live update lands.
pub struct CacheStore {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl CacheStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Unconditional overwrite; resets the entry's freshness clock.
    pub fn set(&self, key: &QueryKey, data: Value, ttl: Duration) {
        let mut entries = rw_write(&self.entries, SOURCE, "set");
        entries.insert(
            key.as_str().to_string(),
            CacheEntry {
                data,
                stored_at: Instant::now(),
                ttl,
            },
        );
        gauge!(METRIC_ENTRIES).set(entries.len() as f64);
    }

    /// Look up a fresh value.
    ///
    /// An entry whose age exceeds its TTL counts as a miss and is deleted
    /// eagerly, so a stale value is never handed out from here.
    pub fn get(&self, key: &QueryKey) -> Option<Value> {
        let mut entries = rw_write(&self.entries, SOURCE, "get");
        let now = Instant::now();
        match entries.get(key.as_str()) {
            Some(entry) if !entry.is_expired(now) => {
                counter!(METRIC_HIT_TOTAL).increment(1);
                return Some(entry.data.clone());
            }
            None => {
                counter!(METRIC_MISS_TOTAL).increment(1);
                return None;
            }
            Some(_) => {}
        }

        // Expired: discard eagerly so the next reader sees a clean miss.
        entries.remove(key.as_str());
        gauge!(METRIC_ENTRIES).set(entries.len() as f64);
        counter!(METRIC_EXPIRED_TOTAL).increment(1);
        counter!(METRIC_MISS_TOTAL).increment(1);
        debug!(key = %key, "Cache entry expired on read");
        None
    }

    /// Look up whatever is physically present, fresh or expired.
    ///
    /// This backs the stale-while-revalidate path: a binding waiting for its
    /// first live value may serve an expired-but-not-yet-swept entry.
    pub fn peek(&self, key: &QueryKey) -> Option<Value> {
        rw_read(&self.entries, SOURCE, "peek")
            .get(key.as_str())
            .map(|entry| entry.data.clone())
    }

    /// Idempotent removal; no-op if the key is absent.
    pub fn delete(&self, key: &QueryKey) {
        let mut entries = rw_write(&self.entries, SOURCE, "delete");
        entries.remove(key.as_str());
        gauge!(METRIC_ENTRIES).set(entries.len() as f64);
    }

    /// Remove every entry unconditionally.
    pub fn clear(&self) {
        let mut entries = rw_write(&self.entries, SOURCE, "clear");
        let removed = entries.len();
        entries.clear();
        gauge!(METRIC_ENTRIES).set(0.0);
        debug!(removed, "Cache cleared");
    }

    /// Sweep the whole store once, removing every entry whose age exceeds
    /// its own TTL. Intended to run on a fixed interval independent of
    /// read/write traffic.
    pub fn cleanup(&self) {
        let sweep_started_at = Instant::now();
        let mut entries = rw_write(&self.entries, SOURCE, "cleanup");
        let before = entries.len();
        let now = Instant::now();
        entries.retain(|_, entry| !entry.is_expired(now));
        let removed = before - entries.len();
        gauge!(METRIC_ENTRIES).set(entries.len() as f64);
        if removed > 0 {
            counter!(METRIC_EXPIRED_TOTAL).increment(removed as u64);
        }
        histogram!(METRIC_SWEEP_MS).record(sweep_started_at.elapsed().as_secs_f64() * 1000.0);
        debug!(removed, remaining = entries.len(), "TTL sweep complete");
    }

    /// Delete every entry whose query-identifier component contains any of
    /// the given patterns as a substring.
    ///
    /// Arguments never participate in matching: invalidation is always
    /// query-family-granular, never argument-specific.
    pub fn invalidate_by_patterns(&self, patterns: &[&str]) {
        if patterns.is_empty() {
            return;
        }
        let mut entries = rw_write(&self.entries, SOURCE, "invalidate_by_patterns");
        let before = entries.len();
        entries.retain(|raw, _| match decode(raw) {
            Some((query, _)) => !patterns.iter().any(|pattern| query.contains(pattern)),
            // Undecodable keys cannot be produced through the public API;
            // treat them as unmatched rather than silently dropping data.
            None => true,
        });
        let removed = before - entries.len();
        gauge!(METRIC_ENTRIES).set(entries.len() as f64);
        if removed > 0 {
            counter!(METRIC_INVALIDATED_TOTAL).increment(removed as u64);
        }
        debug!(?patterns, removed, "Pattern invalidation complete");
    }

    /// Number of entries currently held, expired or not.
    pub fn len(&self) -> usize {
        rw_read(&self.entries, SOURCE, "len").len()
    }

    /// Check if the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for CacheStore {
    fn default() -> Self {
        Self::new()
    }
}
