//! Main cache store implementation with TTL expiry and FIFO eviction

use crate::cache::{
    config::CacheConfig,
    entry::CacheEntry,
    types::{CacheKey, CacheStats, CacheValue},
};
use std::collections::{HashMap, VecDeque};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Bounded key/value cache with TTL expiry
///
/// This implementation provides:
/// - One mutex serializing every operation on the whole structure
/// - Expiry measured from insertion time; expired entries read as absent
/// - Eviction of the oldest-inserted entry when capacity is reached,
///   regardless of how recently it was read
pub struct TtlCache {
    /// Cache configuration
    config: CacheConfig,

    /// Internal storage
    store: Mutex<CacheStore>,
}

/// Internal cache storage
struct CacheStore {
    /// Main storage: key -> entry
    entries: HashMap<CacheKey, CacheEntry>,

    /// Insertion order, oldest at the front
    insertion_order: VecDeque<CacheKey>,

    /// Running counters
    stats: CacheStats,
}

impl TtlCache {
    /// Create a new cache with the given configuration
    pub fn new(config: CacheConfig) -> Self {
        info!(
            "Initializing TTL cache (max_entries: {}, ttl: {:?})",
            config.max_entries, config.ttl
        );

        let store = CacheStore {
            entries: HashMap::new(),
            insertion_order: VecDeque::new(),
            stats: CacheStats::default(),
        };

        Self {
            config,
            store: Mutex::new(store),
        }
    }

    /// Get the cache configuration
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Insert a value into the cache
    ///
    /// A new key arriving at capacity evicts the oldest-inserted entry first.
    /// Re-inserting an existing key replaces its value and restarts its TTL.
    pub async fn insert(&self, key: CacheKey, value: CacheValue) {
        let entry = CacheEntry::new(key.clone(), value);
        let mut store = self.store.lock().await;

        if store.entries.contains_key(&key) {
            debug!("Replacing existing cache entry: {}", key);
            store.insertion_order.retain(|k| k != &key);
        } else {
            self.evict_if_needed(&mut store);
            debug!("Inserting new cache entry: {}", key);
        }

        store.entries.insert(key.clone(), entry);
        store.insertion_order.push_back(key);
    }

    /// Get a value from the cache
    ///
    /// Expired entries are removed on the way out and reported as a miss.
    pub async fn get(&self, key: &str) -> Option<CacheValue> {
        let mut guard = self.store.lock().await;
        let store = &mut *guard;

        let expired = match store.entries.get_mut(key) {
            None => {
                debug!("Cache miss: {}", key);
                store.stats.misses += 1;
                return None;
            }
            Some(entry) if entry.is_expired(self.config.ttl) => true,
            Some(entry) => {
                entry.mark_accessed();
                let value = entry.value.clone();
                store.stats.hits += 1;
                debug!("Cache hit: {}", key);
                return Some(value);
            }
        };

        if expired {
            debug!("Cache entry expired: {}", key);
            Self::remove_entry(store, key);
            store.stats.misses += 1;
            store.stats.evictions_ttl += 1;
        }
        None
    }

    /// Check if a live entry exists for the key (without touching access metadata)
    pub async fn contains_key(&self, key: &str) -> bool {
        let store = self.store.lock().await;
        store
            .entries
            .get(key)
            .is_some_and(|entry| !entry.is_expired(self.config.ttl))
    }

    /// Remove a specific entry from the cache
    pub async fn remove(&self, key: &str) -> Option<CacheValue> {
        let mut store = self.store.lock().await;

        let removed = Self::remove_entry(&mut store, key);
        if removed.is_some() {
            store.stats.invalidations += 1;
            debug!("Removed cache entry: {}", key);
        }
        removed.map(|entry| entry.value)
    }

    /// Clear all entries from the cache
    pub async fn clear(&self) {
        let mut store = self.store.lock().await;

        let count = store.entries.len();
        store.entries.clear();
        store.insertion_order.clear();
        store.stats.invalidations += count as u64;

        info!("Cleared {} entries from cache", count);
    }

    /// Remove all expired entries, returning how many were purged
    pub async fn cleanup_expired(&self) -> usize {
        let mut store = self.store.lock().await;
        let ttl = self.config.ttl;

        let expired_keys: Vec<CacheKey> = store
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(ttl))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired_keys {
            Self::remove_entry(&mut store, key);
        }
        store.stats.evictions_ttl += expired_keys.len() as u64;

        if !expired_keys.is_empty() {
            debug!("Cleaned up {} expired entries", expired_keys.len());
        }
        expired_keys.len()
    }

    /// Get cache statistics
    pub async fn stats(&self) -> CacheStats {
        let store = self.store.lock().await;
        CacheStats {
            cache_size: store.entries.len(),
            max_size: self.config.max_entries,
            ttl_seconds: self.config.ttl.as_secs(),
            ..store.stats.clone()
        }
    }

    /// Get number of entries in cache
    pub async fn len(&self) -> usize {
        let store = self.store.lock().await;
        store.entries.len()
    }

    /// Check if cache is empty
    pub async fn is_empty(&self) -> bool {
        let store = self.store.lock().await;
        store.entries.is_empty()
    }

    fn remove_entry(store: &mut CacheStore, key: &str) -> Option<CacheEntry> {
        let entry = store.entries.remove(key)?;
        store.insertion_order.retain(|k| k != key);
        Some(entry)
    }

    /// Evict the oldest-inserted entries until there is room for one more
    fn evict_if_needed(&self, store: &mut CacheStore) {
        while store.entries.len() >= self.config.max_entries {
            match store.insertion_order.pop_front() {
                Some(key) => {
                    debug!("Evicting entry due to max_entries limit: {}", key);
                    store.entries.remove(&key);
                    store.stats.evictions_size += 1;
                }
                None => break,
            }
        }
    }
}
