//! Knowledge-graph backend boundary
//!
//! The gateway only talks to the graph through [`GraphBackend`]. The
//! backend owns entity extraction, ranking and storage; the gateway owns
//! caching, retries and the circuit breaker.

pub mod neo4j;
pub mod types;

use crate::error::Result;
use async_trait::async_trait;

pub use neo4j::{Neo4jBackend, Neo4jConfig};
pub use types::{
    format_search_results, Episode, EpisodeSource, NodeHit, ResultSet, SearchHit, SearchRequest,
};

/// Remote operations the gateway wraps
///
/// Implementations report transport problems as
/// [`GatewayError::Connection`](crate::GatewayError::Connection) and
/// operation failures as [`GatewayError::Remote`](crate::GatewayError::Remote).
#[async_trait]
pub trait GraphBackend: Send + Sync {
    /// Live connection handle, owned by the gateway between
    /// `initialize()` and `close()`
    type Connection: Send + Sync;

    /// Open a connection and prepare the graph for use
    async fn connect(&self) -> Result<Self::Connection>;

    /// Release a connection
    async fn disconnect(&self, connection: Self::Connection) -> Result<()>;

    /// Submit an episode
    async fn write_episode(&self, connection: &Self::Connection, episode: &Episode) -> Result<()>;

    /// Search facts
    async fn search(
        &self,
        connection: &Self::Connection,
        request: &SearchRequest,
    ) -> Result<ResultSet>;

    /// Search entity nodes
    async fn node_search(
        &self,
        connection: &Self::Connection,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<NodeHit>>;

    /// Cheap liveness probe
    async fn probe(&self, connection: &Self::Connection) -> Result<()>;
}
