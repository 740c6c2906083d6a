//! Neo4j implementation of [`GraphBackend`]
//!
//! Episodes are stored as `:Episodic` nodes. Facts are `RELATES_TO` edges
//! between `:Entity` nodes carrying a `fact` string and optional
//! `valid_at` / `invalid_at` timestamps (RFC 3339).

use super::types::{Episode, NodeHit, ResultSet, SearchHit, SearchRequest};
use super::GraphBackend;
use crate::error::{GatewayError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use neo4rs::{query, ConfigBuilder, Graph, Query};
use std::fmt;
use tracing::{debug, info};
use uuid::Uuid;

const INDEX_STATEMENTS: &[&str] = &[
    "CREATE INDEX episodic_uuid IF NOT EXISTS FOR (e:Episodic) ON (e.uuid)",
    "CREATE INDEX episodic_dedup_key IF NOT EXISTS FOR (e:Episodic) ON (e.dedup_key)",
    "CREATE INDEX entity_uuid IF NOT EXISTS FOR (n:Entity) ON (n.uuid)",
    "CREATE INDEX entity_name IF NOT EXISTS FOR (n:Entity) ON (n.name)",
];

/// Connection settings for [`Neo4jBackend`]
#[derive(Clone)]
pub struct Neo4jConfig {
    /// e.g. "bolt://localhost:7687"
    pub uri: String,
    pub user: String,
    pub password: String,
    pub database: String,
    pub fetch_size: usize,
    pub max_connections: usize,
}

impl Default for Neo4jConfig {
    fn default() -> Self {
        Self {
            uri: "bolt://localhost:7687".to_string(),
            user: "neo4j".to_string(),
            password: "password".to_string(),
            database: "neo4j".to_string(),
            fetch_size: 500,
            max_connections: 16,
        }
    }
}

impl fmt::Debug for Neo4jConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Neo4jConfig")
            .field("uri", &self.uri)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .field("fetch_size", &self.fetch_size)
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

/// Knowledge-graph backend over the Bolt protocol
///
/// # Example
/// ```no_run
/// use kg_gateway::{GatewayService, Neo4jBackend, Neo4jConfig};
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let backend = Neo4jBackend::new(Neo4jConfig::default());
///     let gateway = GatewayService::new(backend, Default::default())?;
///     gateway.initialize().await?;
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Neo4jBackend {
    config: Neo4jConfig,
}

impl Neo4jBackend {
    pub fn new(config: Neo4jConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Neo4jConfig {
        &self.config
    }

    async fn ensure_indices(graph: &Graph) -> Result<()> {
        for statement in INDEX_STATEMENTS {
            graph
                .run(query(statement))
                .await
                .map_err(|e| GatewayError::Connection(format!("Failed to create index: {}", e)))?;
        }
        debug!("Ensured {} indices", INDEX_STATEMENTS.len());
        Ok(())
    }
}

fn episode_query(episode: &Episode) -> Query {
    let cypher = match episode.dedup_key {
        Some(_) => {
            "MERGE (e:Episodic {dedup_key: $dedup_key})
             ON CREATE SET e.uuid = $uuid, e.created_at = $created_at
             SET e.name = $name,
                 e.content = $content,
                 e.source = $source,
                 e.source_description = $source_description,
                 e.valid_at = $reference_time"
        }
        None => {
            "CREATE (e:Episodic {
                 uuid: $uuid,
                 name: $name,
                 content: $content,
                 source: $source,
                 source_description: $source_description,
                 valid_at: $reference_time,
                 created_at: $created_at
             })"
        }
    };

    query(cypher)
        .param("uuid", Uuid::new_v4().to_string())
        .param("dedup_key", episode.dedup_key.clone().unwrap_or_default())
        .param("name", episode.name.clone())
        .param("content", episode.body.clone())
        .param("source", episode.source.as_str())
        .param("source_description", episode.source_description.clone())
        .param("reference_time", episode.reference_time.to_rfc3339())
        .param("created_at", Utc::now().to_rfc3339())
}

/// Results are capped server-side; the driver takes `i64` for `LIMIT`
fn limit_param(max_results: usize) -> i64 {
    i64::try_from(max_results).unwrap_or(i64::MAX)
}

fn parse_timestamp(raw: Option<String>) -> Option<DateTime<Utc>> {
    raw.and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

#[async_trait]
impl GraphBackend for Neo4jBackend {
    type Connection = Graph;

    async fn connect(&self) -> Result<Graph> {
        info!(
            "Connecting to Neo4j at {} (database: {})",
            self.config.uri, self.config.database
        );

        let config = ConfigBuilder::default()
            .uri(self.config.uri.as_str())
            .user(self.config.user.as_str())
            .password(self.config.password.as_str())
            .db(self.config.database.as_str())
            .fetch_size(self.config.fetch_size)
            .max_connections(self.config.max_connections)
            .build()
            .map_err(|e| GatewayError::Config(e.to_string()))?;

        let graph = Graph::connect(config)
            .await
            .map_err(|e| GatewayError::Connection(e.to_string()))?;

        Self::ensure_indices(&graph).await?;

        info!("Successfully connected to Neo4j");
        Ok(graph)
    }

    async fn disconnect(&self, graph: Graph) -> Result<()> {
        // The pool closes its connections when the last handle goes away
        drop(graph);
        info!("Disconnected from Neo4j");
        Ok(())
    }

    async fn write_episode(&self, graph: &Graph, episode: &Episode) -> Result<()> {
        graph
            .run(episode_query(episode))
            .await
            .map_err(|e| GatewayError::Remote(format!("Failed to write episode: {}", e)))?;

        debug!(name = %episode.name, source = episode.source.as_str(), "Episode written");
        Ok(())
    }

    async fn search(&self, graph: &Graph, request: &SearchRequest) -> Result<ResultSet> {
        let cypher = query(
            "MATCH (s:Entity)-[r:RELATES_TO]->(t:Entity)
             WHERE toLower(r.fact) CONTAINS toLower($query)
             WITH r, s, t,
                  CASE WHEN $center <> '' AND (s.uuid = $center OR t.uuid = $center)
                       THEN 0 ELSE 1 END AS proximity
             RETURN r.uuid AS uuid, r.fact AS fact,
                    r.valid_at AS valid_from, r.invalid_at AS valid_until,
                    s.uuid AS source_node_id, t.uuid AS target_node_id
             ORDER BY proximity, r.created_at DESC
             LIMIT $limit",
        )
        .param("query", request.query.clone())
        .param("center", request.center_node_id.clone().unwrap_or_default())
        .param("limit", limit_param(request.max_results));

        let mut result = graph
            .execute(cypher)
            .await
            .map_err(|e| GatewayError::Remote(format!("Search query failed: {}", e)))?;

        let mut hits = Vec::new();
        while let Some(row) = result
            .next()
            .await
            .map_err(|e| GatewayError::Remote(format!("Failed to read search row: {}", e)))?
        {
            let fact: String = row
                .get("fact")
                .map_err(|e| GatewayError::Remote(format!("Failed to extract fact: {}", e)))?;

            hits.push(SearchHit {
                uuid: row.get("uuid").ok(),
                fact,
                valid_from: parse_timestamp(row.get("valid_from").ok()),
                valid_until: parse_timestamp(row.get("valid_until").ok()),
                source_node_id: row.get("source_node_id").ok(),
                target_node_id: row.get("target_node_id").ok(),
            });
        }

        Ok(hits)
    }

    async fn node_search(
        &self,
        graph: &Graph,
        query_text: &str,
        max_results: usize,
    ) -> Result<Vec<NodeHit>> {
        let cypher = query(
            "MATCH (n:Entity)
             WHERE toLower(n.name) CONTAINS toLower($query)
                OR toLower(coalesce(n.summary, '')) CONTAINS toLower($query)
             RETURN n.uuid AS uuid, n.name AS name, n.summary AS summary
             ORDER BY n.name
             LIMIT $limit",
        )
        .param("query", query_text.to_string())
        .param("limit", limit_param(max_results));

        let mut result = graph
            .execute(cypher)
            .await
            .map_err(|e| GatewayError::Remote(format!("Node search failed: {}", e)))?;

        let mut nodes = Vec::new();
        while let Some(row) = result
            .next()
            .await
            .map_err(|e| GatewayError::Remote(format!("Failed to read node row: {}", e)))?
        {
            let uuid: String = row
                .get("uuid")
                .map_err(|e| GatewayError::Remote(format!("Failed to extract node uuid: {}", e)))?;
            let name: String = row
                .get("name")
                .map_err(|e| GatewayError::Remote(format!("Failed to extract node name: {}", e)))?;

            nodes.push(NodeHit {
                uuid,
                name,
                summary: row.get("summary").ok(),
            });
        }

        Ok(nodes)
    }

    async fn probe(&self, graph: &Graph) -> Result<()> {
        graph.run(query("RETURN 1")).await?;
        Ok(())
    }
}
