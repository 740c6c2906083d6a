//! # Search Result Cache
//!
//! A bounded, TTL-based cache placed in front of the knowledge-graph
//! backend so repeated searches do not hit the network.
//!
//! ## Features
//!
//! - **TTL Expiration**: entries older than the configured TTL read as absent
//! - **FIFO Eviction**: the oldest insertion is dropped when capacity is reached
//! - **Coarse Locking**: one mutex guards the whole structure
//! - **Deterministic Keys**: SHA-256 over `(query, max_results, center_node_id)`
//!
//! ## Example
//!
//! ```rust
//! use kg_gateway::cache::{CacheConfig, SearchCache};
//! use kg_gateway::SearchHit;
//! use std::time::Duration;
//!
//! # async fn example() -> kg_gateway::Result<()> {
//! let config = CacheConfig::builder()
//!     .ttl(Duration::from_secs(300))
//!     .max_entries(1_000)
//!     .build();
//!
//! let cache = SearchCache::new(config);
//!
//! cache.put("who knows bob", 5, None, &vec![SearchHit::new("Alice knows Bob")]).await?;
//!
//! if let Some(hits) = cache.get("who knows bob", 5, None).await? {
//!     println!("Cache hit: {} results", hits.len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod entry;
pub mod search;
pub mod store;
pub mod types;

pub use config::{CacheConfig, CacheConfigBuilder};
pub use entry::CacheEntry;
pub use search::{SearchCache, SearchKeyBuilder};
pub use store::TtlCache;
pub use types::{CacheKey, CacheStats, CacheValue};
