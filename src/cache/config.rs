//! Configuration for the cache system

use crate::error::{GatewayError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Largest accepted capacity
pub const MAX_CACHE_ENTRIES: usize = 10_000;

/// Largest accepted time-to-live
pub const MAX_CACHE_TTL: Duration = Duration::from_secs(3600);

/// Configuration for the search result cache
///
/// Both values are fixed for the lifetime of a cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Time-to-live for cache entries, measured from insertion
    pub ttl: Duration,

    /// Maximum number of entries in the cache
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            // 5 minutes
            ttl: Duration::from_secs(300),
            max_entries: 1_000,
        }
    }
}

impl CacheConfig {
    /// Create a new builder for cache configuration
    pub fn builder() -> CacheConfigBuilder {
        CacheConfigBuilder::default()
    }

    /// Validate the configuration
    ///
    /// Capacity must be within `1..=10_000` and the TTL at most one hour.
    pub fn validate(&self) -> Result<()> {
        if self.max_entries == 0 || self.max_entries > MAX_CACHE_ENTRIES {
            return Err(GatewayError::Config(format!(
                "cache max_entries must be between 1 and {}, got {}",
                MAX_CACHE_ENTRIES, self.max_entries
            )));
        }

        if self.ttl > MAX_CACHE_TTL {
            return Err(GatewayError::Config(format!(
                "cache ttl must be at most {}s, got {}s",
                MAX_CACHE_TTL.as_secs(),
                self.ttl.as_secs()
            )));
        }

        Ok(())
    }
}

/// Builder for cache configuration
#[derive(Debug, Default)]
pub struct CacheConfigBuilder {
    ttl: Option<Duration>,
    max_entries: Option<usize>,
}

impl CacheConfigBuilder {
    /// Set TTL for cache entries
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Set maximum number of cache entries
    pub fn max_entries(mut self, max: usize) -> Self {
        self.max_entries = Some(max);
        self
    }

    /// Build the cache configuration
    pub fn build(self) -> CacheConfig {
        let defaults = CacheConfig::default();

        CacheConfig {
            ttl: self.ttl.unwrap_or(defaults.ttl),
            max_entries: self.max_entries.unwrap_or(defaults.max_entries),
        }
    }
}
