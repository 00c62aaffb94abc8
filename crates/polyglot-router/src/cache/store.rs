//! In-memory translation cache with LRU eviction and per-entry TTL.

use super::types::{CacheEntry, CacheKey, CacheStats};
use polyglot_abstraction::TranslationResult;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info};

const SNAPSHOT_VERSION: u32 = 1;

/// Errors from the cache's backing store.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Reading or writing the snapshot file failed.
    #[error("cache snapshot I/O failed for {path}: {source}")]
    Io {
        /// Snapshot path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The snapshot is not valid JSON for this format.
    #[error("cache snapshot is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),

    /// The snapshot was written by an incompatible version.
    #[error("unsupported cache snapshot version {0}")]
    UnsupportedVersion(u32),
}

#[derive(Debug)]
struct CacheState {
    entries: HashMap<CacheKey, CacheEntry>,
    clock: u64,
    stats: CacheStats,
}

impl CacheState {
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    /// Least-recently-accessed key; ties go to the oldest insertion.
    fn find_lru_key(&self) -> Option<CacheKey> {
        self.entries
            .iter()
            .min_by_key(|(_, entry)| (entry.last_accessed, entry.inserted_seq))
            .map(|(key, _)| key.clone())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Snapshot {
    version: u32,
    entries: Vec<SnapshotEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotEntry {
    key: CacheKey,
    result: TranslationResult,
    remaining_ttl_ms: u64,
    access_count: u64,
}

/// Bounded, time-aware cache of translation results.
///
/// Expiry is checked on every read. Entries never leave the cache by
/// reference: hits return clones.
#[derive(Debug)]
pub struct TranslationCache {
    capacity: usize,
    state: Mutex<CacheState>,
}

impl TranslationCache {
    /// Creates an empty cache holding at most `capacity` entries (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            state: Mutex::new(CacheState {
                entries: HashMap::new(),
                clock: 0,
                stats: CacheStats { capacity, ..CacheStats::default() },
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Looks up `key`. Expired entries are removed and reported as a miss.
    pub fn get(&self, key: &CacheKey) -> Option<TranslationResult> {
        let mut state = self.lock();

        let Some(expired) = state.entries.get(key).map(CacheEntry::is_expired) else {
            state.stats.misses += 1;
            return None;
        };

        if expired {
            state.entries.remove(key);
            state.stats.expirations += 1;
            state.stats.misses += 1;
            state.stats.size = state.entries.len();
            debug!(key = %key, "Cache entry expired");
            return None;
        }

        let now = state.tick();
        state.stats.hits += 1;
        let entry = state.entries.get_mut(key)?;
        entry.last_accessed = now;
        entry.access_count += 1;
        Some(entry.result.clone())
    }

    /// Inserts or refreshes `key`, evicting the least-recently-used entry
    /// when full. A zero TTL stores nothing.
    pub fn put(&self, key: CacheKey, result: TranslationResult, ttl: Duration) {
        if ttl.is_zero() {
            return;
        }
        let mut state = self.lock();
        Self::insert_locked(&mut state, self.capacity, key, result, ttl, 0);
    }

    fn insert_locked(
        state: &mut CacheState,
        capacity: usize,
        key: CacheKey,
        result: TranslationResult,
        ttl: Duration,
        access_count: u64,
    ) {
        if !state.entries.contains_key(&key) && state.entries.len() >= capacity {
            if let Some(lru_key) = state.find_lru_key() {
                state.entries.remove(&lru_key);
                state.stats.evictions += 1;
                debug!(key = %lru_key, "Evicted LRU entry from cache");
            }
        }

        let now = state.tick();
        state.entries.insert(
            key,
            CacheEntry {
                result,
                inserted_at: Instant::now(),
                last_accessed: now,
                inserted_seq: now,
                access_count,
                ttl,
            },
        );
        state.stats.size = state.entries.len();
    }

    /// Removes `key`. Returns `true` if it was present.
    pub fn remove(&self, key: &CacheKey) -> bool {
        let mut state = self.lock();
        let removed = state.entries.remove(key).is_some();
        state.stats.size = state.entries.len();
        removed
    }

    /// Drops every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let mut state = self.lock();
        let before = state.entries.len();
        state.entries.retain(|_, entry| !entry.is_expired());
        let purged = before - state.entries.len();
        state.stats.expirations += purged as u64;
        state.stats.size = state.entries.len();
        if purged > 0 {
            debug!(purged, "Purged expired cache entries");
        }
        purged
    }

    /// Removes every entry. Counters are kept.
    pub fn clear(&self) {
        let mut state = self.lock();
        let cleared_count = state.entries.len();
        state.entries.clear();
        state.stats.size = 0;
        info!(cleared_count, "Cleared translation cache");
    }

    /// Number of stored entries, expired or not.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of entries.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current statistics.
    pub fn stats(&self) -> CacheStats {
        self.lock().stats.clone()
    }

    /// Writes live entries to `path` as JSON, least recently used first.
    ///
    /// # Errors
    /// Returns [`CacheError`] if serialisation or the write fails.
    pub fn save_to(&self, path: &Path) -> Result<usize, CacheError> {
        let snapshot = {
            let state = self.lock();
            let mut live: Vec<(&CacheKey, &CacheEntry)> =
                state.entries.iter().filter(|(_, e)| !e.is_expired()).collect();
            live.sort_by_key(|(_, e)| (e.last_accessed, e.inserted_seq));
            Snapshot {
                version: SNAPSHOT_VERSION,
                entries: live
                    .into_iter()
                    .map(|(key, entry)| SnapshotEntry {
                        key: key.clone(),
                        result: entry.result.clone(),
                        remaining_ttl_ms: entry.remaining_ttl().as_millis() as u64,
                        access_count: entry.access_count,
                    })
                    .collect(),
            }
        };

        let json = serde_json::to_string_pretty(&snapshot)?;
        std::fs::write(path, json)
            .map_err(|source| CacheError::Io { path: path.to_path_buf(), source })?;

        info!(path = %path.display(), entries = snapshot.entries.len(), "Saved cache snapshot");
        Ok(snapshot.entries.len())
    }

    /// Loads entries saved by [`TranslationCache::save_to`] into this cache.
    ///
    /// Each entry keeps the TTL it had left when saved; entries with none
    /// left are skipped. Returns the number of entries loaded.
    ///
    /// # Errors
    /// Returns [`CacheError`] if the file is unreadable or corrupt. The cache
    /// is left untouched in that case.
    pub fn load_from(&self, path: &Path) -> Result<usize, CacheError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|source| CacheError::Io { path: path.to_path_buf(), source })?;
        let snapshot: Snapshot = serde_json::from_str(&raw)?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(CacheError::UnsupportedVersion(snapshot.version));
        }

        let mut state = self.lock();
        let mut loaded = 0;
        for entry in snapshot.entries {
            if entry.remaining_ttl_ms == 0 {
                continue;
            }
            Self::insert_locked(
                &mut state,
                self.capacity,
                entry.key,
                entry.result,
                Duration::from_millis(entry.remaining_ttl_ms),
                entry.access_count,
            );
            loaded += 1;
        }

        info!(path = %path.display(), loaded, "Loaded cache snapshot");
        Ok(loaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn result(text: &str) -> TranslationResult {
        TranslationResult::new(text, "deepl", 0.9, 0.001, Duration::from_millis(5))
    }

    fn key(n: u32) -> CacheKey {
        CacheKey::derive(&format!("text {n}"), "es", "en")
    }

    const HOUR: Duration = Duration::from_secs(3600);

    #[test]
    fn test_put_then_get_round_trip() {
        let cache = TranslationCache::new(10);
        cache.put(key(1), result("one"), HOUR);

        let hit = cache.get(&key(1)).unwrap();
        assert_eq!(hit.text, "one");
        assert_eq!(hit.provider, "deepl");

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.size, 1);
    }

    #[test]
    fn test_miss_is_counted() {
        let cache = TranslationCache::new(10);
        assert!(cache.get(&key(1)).is_none());
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn test_expired_entry_is_a_miss_and_removed() {
        let cache = TranslationCache::new(10);
        cache.put(key(1), result("one"), Duration::from_millis(1));
        thread::sleep(Duration::from_millis(10));

        assert!(cache.get(&key(1)).is_none());
        assert_eq!(cache.len(), 0);
        let stats = cache.stats();
        assert_eq!(stats.expirations, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn test_evicts_least_recently_accessed() {
        let cache = TranslationCache::new(3);
        cache.put(key(1), result("one"), HOUR);
        cache.put(key(2), result("two"), HOUR);
        cache.put(key(3), result("three"), HOUR);

        // Touch 1 so 2 becomes the LRU entry.
        assert!(cache.get(&key(1)).is_some());
        cache.put(key(4), result("four"), HOUR);

        assert_eq!(cache.len(), 3);
        assert!(cache.get(&key(2)).is_none());
        assert!(cache.get(&key(1)).is_some());
        assert!(cache.get(&key(3)).is_some());
        assert!(cache.get(&key(4)).is_some());
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_untouched_entries_evict_in_insertion_order() {
        let cache = TranslationCache::new(2);
        cache.put(key(1), result("one"), HOUR);
        cache.put(key(2), result("two"), HOUR);
        cache.put(key(3), result("three"), HOUR);
        assert!(cache.get(&key(1)).is_none());
        assert!(cache.get(&key(2)).is_some());
    }

    #[test]
    fn test_refresh_does_not_evict() {
        let cache = TranslationCache::new(2);
        cache.put(key(1), result("one"), HOUR);
        cache.put(key(2), result("two"), HOUR);
        cache.put(key(1), result("uno"), HOUR);

        assert_eq!(cache.stats().evictions, 0);
        assert_eq!(cache.get(&key(1)).unwrap().text, "uno");
        assert!(cache.get(&key(2)).is_some());
    }

    #[test]
    fn test_zero_ttl_is_not_stored() {
        let cache = TranslationCache::new(2);
        cache.put(key(1), result("one"), Duration::ZERO);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_purge_remove_and_clear() {
        let cache = TranslationCache::new(10);
        cache.put(key(1), result("one"), Duration::from_millis(1));
        cache.put(key(2), result("two"), HOUR);
        cache.put(key(3), result("three"), HOUR);
        thread::sleep(Duration::from_millis(10));

        assert_eq!(cache.purge_expired(), 1);
        assert!(cache.remove(&key(2)));
        assert!(!cache.remove(&key(2)));
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.stats().size, 0);
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let cache = TranslationCache::new(0);
        assert_eq!(cache.capacity(), 1);
        cache.put(key(1), result("one"), HOUR);
        assert_eq!(cache.len(), 1);
    }
}
