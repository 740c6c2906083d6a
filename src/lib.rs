//! # Knowledge Graph Gateway (kg-gateway)
//!
//! A resilient client gateway in front of a knowledge-graph backend.
//! Applications ingest episodes and run searches through a single
//! [`GatewayService`], which layers three protections around every remote
//! call:
//!
//! - **TTL cache** for search results (bounded, FIFO eviction)
//! - **Circuit breaker** that fast-fails while the backend is degraded
//! - **Retry policy** with exponential backoff for transient failures
//!
//! The backend itself sits behind the [`GraphBackend`] trait; a Neo4j
//! implementation ([`Neo4jBackend`]) ships with the crate.
//!
//! ## Example
//!
//! ```no_run
//! use kg_gateway::{format_search_results, GatewayService, GatewaySettings, Neo4jBackend};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = GatewaySettings::load()?;
//!     kg_gateway::logging::init_logging(settings.log_level)?;
//!
//!     let backend = Neo4jBackend::new(settings.neo4j_config());
//!     let gateway = GatewayService::new(backend, settings.gateway_config())?;
//!     gateway.initialize().await?;
//!
//!     gateway.add_text_episode("meeting", "Alice met Bob in Seoul").await?;
//!     let hits = gateway.search("Alice", None, None).await?;
//!     println!("{}", format_search_results(&hits));
//!
//!     gateway.close().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Failure Semantics
//!
//! | Situation                     | Error                              |
//! |-------------------------------|------------------------------------|
//! | Called before `initialize()`  | [`GatewayError::NotInitialized`]   |
//! | Breaker open                  | [`GatewayError::CircuitOpen`]      |
//! | Search failed after retries   | [`GatewayError::SearchFailed`]     |
//! | Write failed                  | [`GatewayError::WriteFailed`]      |
//!
//! Health checks never fail; problems are reported inside the
//! [`HealthReport`].

pub mod backend;
pub mod cache;
pub mod error;
pub mod gateway;
pub mod logging;
pub mod resilience;
pub mod settings;

pub use backend::{
    format_search_results, Episode, EpisodeSource, GraphBackend, Neo4jBackend, Neo4jConfig,
    NodeHit, ResultSet, SearchHit, SearchRequest,
};
pub use cache::{CacheConfig, CacheStats, SearchCache, TtlCache};
pub use error::{GatewayError, Result};
pub use gateway::{GatewayConfig, GatewayService, GatewayState, HealthReport, HealthState};
pub use resilience::{
    CircuitBreaker, CircuitBreakerConfig, CircuitSnapshot, CircuitState, RetryConfig, RetryPolicy,
};
pub use settings::GatewaySettings;
