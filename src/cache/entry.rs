//! Cache entry bookkeeping

use crate::cache::types::{CacheKey, CacheValue};
use std::time::Duration;
use tokio::time::Instant;

/// A cache entry stamped with its insertion time
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The cache key
    pub key: CacheKey,

    /// The cached value
    pub value: CacheValue,

    /// When the entry was inserted; drives both expiry and eviction order
    pub inserted_at: Instant,

    /// Last time the entry was served
    pub accessed_at: Instant,

    /// Number of times this entry has been served
    pub access_count: u64,
}

impl CacheEntry {
    /// Create a new cache entry inserted now
    pub fn new(key: CacheKey, value: CacheValue) -> Self {
        let now = Instant::now();

        Self {
            key,
            value,
            inserted_at: now,
            accessed_at: now,
            access_count: 0,
        }
    }

    /// An entry is live while `now - inserted_at < ttl`
    pub fn is_expired(&self, ttl: Duration) -> bool {
        self.age() >= ttl
    }

    /// Get the age of the entry
    pub fn age(&self) -> Duration {
        Instant::now().saturating_duration_since(self.inserted_at)
    }

    /// Mark the entry as accessed (updates access time and count)
    pub fn mark_accessed(&mut self) {
        self.accessed_at = Instant::now();
        self.access_count += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_entry_expiration() {
        let entry = CacheEntry::new("test".to_string(), "value".to_string());
        let ttl = Duration::from_secs(10);

        assert!(!entry.is_expired(ttl));

        tokio::time::advance(Duration::from_millis(9_999)).await;
        assert!(!entry.is_expired(ttl));

        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(entry.is_expired(ttl));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_ttl_is_always_expired() {
        let entry = CacheEntry::new("test".to_string(), "value".to_string());
        assert!(entry.is_expired(Duration::ZERO));
    }

    #[tokio::test(start_paused = true)]
    async fn test_mark_accessed() {
        let mut entry = CacheEntry::new("test".to_string(), "value".to_string());
        let inserted = entry.inserted_at;

        tokio::time::advance(Duration::from_secs(1)).await;
        entry.mark_accessed();

        assert_eq!(entry.access_count, 1);
        assert!(entry.accessed_at > inserted);
        // Access never refreshes the insertion stamp
        assert_eq!(entry.inserted_at, inserted);
    }
}
