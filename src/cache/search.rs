//! Search result caching on top of the TTL store
//!
//! Result sets are serialized to JSON and stored under a digest of the
//! search parameters. Anything that goes wrong in here is reported as a
//! [`GatewayError::Cache`] so the gateway can log it and fall back to the
//! backend.

use crate::backend::ResultSet;
use crate::cache::{
    config::CacheConfig,
    store::TtlCache,
    types::{CacheKey, CacheStats},
};
use crate::error::{GatewayError, Result};
use sha2::{Digest, Sha256};

/// Cache key builder for search parameters
///
/// Every component is length-prefixed before hashing, so distinct tuples
/// cannot collide by concatenation (`("ab", "c")` vs `("a", "bc")`).
#[derive(Debug, Clone)]
pub struct SearchKeyBuilder {
    query: String,
    max_results: usize,
    center_node_id: Option<String>,
}

impl SearchKeyBuilder {
    /// Create a new key builder for a query
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            max_results: 0,
            center_node_id: None,
        }
    }

    /// Set the requested result count
    pub fn max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    /// Set the centre node used to personalise the search
    pub fn center_node_id(mut self, center: Option<&str>) -> Self {
        self.center_node_id = center.map(str::to_string);
        self
    }

    /// Build the cache key (hex-encoded SHA-256)
    pub fn build(self) -> CacheKey {
        let mut hasher = Sha256::new();

        let center = self.center_node_id.unwrap_or_default();
        for part in [self.query.as_bytes(), center.as_bytes()] {
            hasher.update((part.len() as u64).to_le_bytes());
            hasher.update(part);
        }
        hasher.update((self.max_results as u64).to_le_bytes());

        hex::encode(hasher.finalize())
    }
}

/// Search result cache
///
/// Provides typed get/put of result sets keyed by
/// `(query, max_results, center_node_id)`.
pub struct SearchCache {
    cache: TtlCache,
}

impl SearchCache {
    /// Create a new search cache
    pub fn new(config: CacheConfig) -> Self {
        Self {
            cache: TtlCache::new(config),
        }
    }

    /// Get the underlying store
    pub fn inner(&self) -> &TtlCache {
        &self.cache
    }

    /// Look up a cached result set
    pub async fn get(
        &self,
        query: &str,
        max_results: usize,
        center_node_id: Option<&str>,
    ) -> Result<Option<ResultSet>> {
        let key = Self::key(query, max_results, center_node_id);

        match self.cache.get(&key).await {
            Some(value) => {
                let results = serde_json::from_str(&value).map_err(|e| {
                    GatewayError::Cache(format!("Failed to decode cached results: {}", e))
                })?;
                Ok(Some(results))
            }
            None => Ok(None),
        }
    }

    /// Store a result set
    pub async fn put(
        &self,
        query: &str,
        max_results: usize,
        center_node_id: Option<&str>,
        results: &ResultSet,
    ) -> Result<()> {
        let key = Self::key(query, max_results, center_node_id);
        let value = serde_json::to_string(results)
            .map_err(|e| GatewayError::Cache(format!("Failed to encode results: {}", e)))?;

        self.cache.insert(key, value).await;
        Ok(())
    }

    /// Drop a cached result set, if any
    pub async fn invalidate(
        &self,
        query: &str,
        max_results: usize,
        center_node_id: Option<&str>,
    ) -> bool {
        let key = Self::key(query, max_results, center_node_id);
        self.cache.remove(&key).await.is_some()
    }

    /// Get cache statistics
    pub async fn stats(&self) -> CacheStats {
        self.cache.stats().await
    }

    /// Clear the entire cache
    pub async fn clear(&self) {
        self.cache.clear().await
    }

    fn key(query: &str, max_results: usize, center_node_id: Option<&str>) -> CacheKey {
        SearchKeyBuilder::new(query)
            .max_results(max_results)
            .center_node_id(center_node_id)
            .build()
    }
}
