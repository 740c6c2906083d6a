//! Core type definitions for the cache system

use serde::{Deserialize, Serialize};
use std::fmt;

/// Cache key type - hex encoded digest of the search parameters
pub type CacheKey = String;

/// Cache value type - serialized result set
pub type CacheValue = String;

/// Statistics for cache introspection
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct CacheStats {
    /// Number of entries currently stored (live or not yet purged)
    pub cache_size: usize,

    /// Configured capacity
    pub max_size: usize,

    /// Configured time-to-live in seconds
    pub ttl_seconds: u64,

    /// Total number of cache hits
    pub hits: u64,

    /// Total number of cache misses
    pub misses: u64,

    /// Number of evictions due to the capacity limit
    pub evictions_size: u64,

    /// Number of evictions due to TTL expiration
    pub evictions_ttl: u64,

    /// Number of explicit removals and clears
    pub invalidations: u64,
}

impl CacheStats {
    /// Calculate cache hit rate as a percentage
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }

    /// Calculate total evictions
    pub fn total_evictions(&self) -> u64 {
        self.evictions_size + self.evictions_ttl
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CacheStats {{ size: {}/{}, ttl: {}s, hits: {}, misses: {}, hit_rate: {:.2}%, evictions: {} }}",
            self.cache_size,
            self.max_size,
            self.ttl_seconds,
            self.hits,
            self.misses,
            self.hit_rate(),
            self.total_evictions()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_stats_hit_rate() {
        let stats = CacheStats {
            hits: 80,
            misses: 20,
            ..Default::default()
        };

        assert_eq!(stats.hit_rate(), 80.0);
    }

    #[test]
    fn test_cache_stats_zero_requests() {
        let stats = CacheStats::default();
        assert_eq!(stats.hit_rate(), 0.0);
        assert_eq!(stats.total_evictions(), 0);
    }

    #[test]
    fn test_cache_stats_display() {
        let stats = CacheStats {
            cache_size: 75,
            max_size: 100,
            ttl_seconds: 300,
            hits: 100,
            misses: 50,
            evictions_size: 10,
            evictions_ttl: 5,
            invalidations: 3,
        };

        let display = format!("{}", stats);
        assert!(display.contains("size: 75/100"));
        assert!(display.contains("hits: 100"));
        assert!(display.contains("evictions: 15"));
    }
}
