//! TTL cache for memoized query results.
//!
//! Entries expire lazily on access and eagerly via [`TtlCache::sweep`] (or a
//! background [`sweeper::Sweeper`]). When the cache is full, the oldest
//! inserted entry is evicted first; re-inserting a key refreshes both its
//! value and its eviction position.

pub mod clock;
pub mod sweeper;

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use serde::Serialize;
use tracing::debug;

use crate::cache::clock::Clock;

/// Tuning knobs for a [`TtlCache`].
#[derive(Debug, Clone, Copy)]
pub struct CacheConfig {
    pub default_ttl: Duration,
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: Duration::minutes(5),
            max_entries: 256,
        }
    }
}

#[derive(Debug, Clone)]
struct Entry<V> {
    value: V,
    expires_at: DateTime<Utc>,
}

/// Hit/miss accounting, exposed for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expirations: u64,
}

/// String-keyed cache with per-entry expiry and bounded size.
pub struct TtlCache<V> {
    config: CacheConfig,
    clock: Arc<dyn Clock>,
    entries: HashMap<String, Entry<V>>,
    // Insertion order, oldest at the front; drives eviction.
    order: VecDeque<String>,
    stats: CacheStats,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            entries: HashMap::new(),
            order: VecDeque::new(),
            stats: CacheStats::default(),
        }
    }

    /// Insert with the configured default TTL.
    pub fn insert(&mut self, key: impl Into<String>, value: V) {
        self.insert_with_ttl(key, value, self.config.default_ttl);
    }

    /// Insert with an explicit TTL, refreshing the eviction position when the
    /// key already exists.
    pub fn insert_with_ttl(&mut self, key: impl Into<String>, value: V, ttl: Duration) {
        let key = key.into();
        let expires_at = self.clock.now() + ttl;
        if self.entries.insert(key.clone(), Entry { value, expires_at }).is_some() {
            self.order.retain(|existing| *existing != key);
        }
        self.order.push_back(key);
        self.enforce_capacity();
    }

    /// Look up a live entry, dropping it first if it has expired.
    pub fn get(&mut self, key: &str) -> Option<V> {
        let now = self.clock.now();
        match self.entries.get(key) {
            Some(entry) if entry.expires_at > now => {
                self.stats.hits += 1;
                Some(entry.value.clone())
            }
            Some(_) => {
                self.drop_entry(key);
                self.stats.expirations += 1;
                self.stats.misses += 1;
                None
            }
            None => {
                self.stats.misses += 1;
                None
            }
        }
    }

    /// Whether a live entry exists, without touching the hit counters.
    pub fn contains(&self, key: &str) -> bool {
        self.entries
            .get(key)
            .is_some_and(|entry| entry.expires_at > self.clock.now())
    }

    pub fn remove(&mut self, key: &str) -> Option<V> {
        let entry = self.entries.remove(key)?;
        self.order.retain(|existing| existing != key);
        Some(entry.value)
    }

    /// Drop every entry whose key matches the pattern. Returns the number of
    /// entries removed.
    pub fn invalidate_pattern(&mut self, pattern: &Regex) -> usize {
        let doomed: Vec<String> = self
            .entries
            .keys()
            .filter(|key| pattern.is_match(key))
            .cloned()
            .collect();
        for key in &doomed {
            self.drop_entry(key);
        }
        if !doomed.is_empty() {
            debug!(pattern = %pattern, removed = doomed.len(), "cache invalidated by pattern");
        }
        doomed.len()
    }

    /// Fetch a live entry or compute, insert and return a fresh one.
    pub fn get_or_insert_with(&mut self, key: &str, compute: impl FnOnce() -> V) -> V {
        if let Some(value) = self.get(key) {
            return value;
        }
        let value = compute();
        self.insert(key.to_string(), value.clone());
        value
    }

    /// Eagerly drop every expired entry. Returns the number removed.
    pub fn sweep(&mut self) -> usize {
        let now = self.clock.now();
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.expires_at <= now)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            self.drop_entry(key);
        }
        self.stats.expirations += expired.len() as u64;
        if !expired.is_empty() {
            debug!(removed = expired.len(), "cache swept");
        }
        expired.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    /// Number of stored entries, expired ones included until swept.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            ..self.stats
        }
    }

    fn enforce_capacity(&mut self) {
        while self.entries.len() > self.config.max_entries {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            self.entries.remove(&oldest);
            self.stats.evictions += 1;
            debug!(key = %oldest, "cache evicted oldest entry");
        }
    }

    fn drop_entry(&mut self, key: &str) {
        self.entries.remove(key);
        self.order.retain(|existing| existing != key);
    }
}

impl<V: Clone + Serialize> TtlCache<V> {
    /// Approximate memory footprint of the cached values, as the size of
    /// their JSON encoding.
    pub fn approximate_size_bytes(&self) -> usize {
        self.entries
            .values()
            .filter_map(|entry| serde_json::to_vec(&entry.value).ok())
            .map(|bytes| bytes.len())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::clock::ManualClock;

    fn cache(max_entries: usize) -> (TtlCache<String>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let config = CacheConfig {
            default_ttl: Duration::milliseconds(100),
            max_entries,
        };
        (TtlCache::new(config, clock.clone()), clock)
    }

    #[test]
    fn entries_expire_after_ttl() {
        let (mut cache, clock) = cache(8);
        cache.insert("k", "v".to_string());
        clock.advance(Duration::milliseconds(50));
        assert_eq!(cache.get("k"), Some("v".to_string()));
        clock.advance(Duration::milliseconds(100));
        assert_eq!(cache.get("k"), None);
        assert_eq!(cache.stats().expirations, 1);
    }

    #[test]
    fn full_cache_evicts_oldest_insertion() {
        let (mut cache, _clock) = cache(3);
        for key in ["a", "b", "c"] {
            cache.insert(key, key.to_string());
        }
        cache.insert("d", "d".to_string());
        assert!(!cache.contains("a"));
        assert!(cache.contains("b") && cache.contains("c") && cache.contains("d"));
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn reinserting_refreshes_eviction_position() {
        let (mut cache, _clock) = cache(3);
        for key in ["a", "b", "c"] {
            cache.insert(key, key.to_string());
        }
        cache.insert("a", "a2".to_string());
        cache.insert("d", "d".to_string());
        // "b" is now the oldest, not "a".
        assert!(!cache.contains("b"));
        assert_eq!(cache.get("a"), Some("a2".to_string()));
    }

    #[test]
    fn pattern_invalidation_targets_matching_keys() {
        let (mut cache, _clock) = cache(8);
        cache.insert("listings:q=dog", "1".to_string());
        cache.insert("listings:q=cat", "2".to_string());
        cache.insert("stats:global", "3".to_string());
        let removed = cache.invalidate_pattern(&Regex::new("^listings:").unwrap());
        assert_eq!(removed, 2);
        assert!(cache.contains("stats:global"));
    }

    #[test]
    fn sweep_drops_only_expired_entries() {
        let (mut cache, clock) = cache(8);
        cache.insert_with_ttl("short", "s".to_string(), Duration::milliseconds(50));
        cache.insert_with_ttl("long", "l".to_string(), Duration::milliseconds(500));
        clock.advance(Duration::milliseconds(100));
        assert_eq!(cache.sweep(), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.contains("long"));
    }
}
