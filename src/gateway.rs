//! Gateway service: the single entry point applications use to talk to the
//! knowledge graph
//!
//! # Lifecycle
//! ```text
//! Uninitialized → Initializing → Ready → Closed
//!        ↑______________|                  |
//!        (failed init)     (re-initialize) ↓
//!                                     Initializing
//! ```
//!
//! Searches consult the result cache first; a hit never reaches the
//! breaker or the backend. Misses run as `retry(breaker(backend.search))`.

use crate::backend::{Episode, GraphBackend, NodeHit, ResultSet, SearchRequest};
use crate::cache::{CacheConfig, CacheStats, SearchCache};
use crate::error::{GatewayError, Result};
use crate::resilience::{
    CircuitBreaker, CircuitBreakerConfig, CircuitSnapshot, CircuitState, RetryConfig, RetryPolicy,
};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Notify};
use tracing::{debug, error, info, warn};

/// Name reported in health reports
pub const SERVICE_NAME: &str = "kg-gateway";

/// Upper bound accepted for `default_max_results`
pub const MAX_RESULTS_LIMIT: usize = 100;

/// Tunables for [`GatewayService`]
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayConfig {
    /// Result count used when a search does not specify one
    pub default_max_results: usize,
    /// Bound on the health probe
    pub health_check_timeout: Duration,
    pub cache: CacheConfig,
    pub circuit_breaker: CircuitBreakerConfig,
    pub initialization_retry: RetryConfig,
    pub search_retry: RetryConfig,
    /// Applied only to episodes carrying a dedup key
    pub write_retry: RetryConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            default_max_results: 5,
            health_check_timeout: Duration::from_secs(5),
            cache: CacheConfig::default(),
            circuit_breaker: CircuitBreakerConfig::default(),
            initialization_retry: RetryConfig::initialization(),
            search_retry: RetryConfig::search(),
            write_retry: RetryConfig::write(),
        }
    }
}

impl GatewayConfig {
    pub fn validate(&self) -> Result<()> {
        if self.default_max_results == 0 || self.default_max_results > MAX_RESULTS_LIMIT {
            return Err(GatewayError::Config(format!(
                "default_max_results must be between 1 and {}, got {}",
                MAX_RESULTS_LIMIT, self.default_max_results
            )));
        }
        if self.health_check_timeout.is_zero() {
            return Err(GatewayError::Config(
                "health_check_timeout must be positive".to_string(),
            ));
        }
        self.cache.validate()?;
        self.circuit_breaker.validate()?;
        self.initialization_retry.validate()?;
        self.search_retry.validate()?;
        self.write_retry.validate()?;
        Ok(())
    }
}

/// Lifecycle state of the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayState {
    Uninitialized,
    Initializing,
    Ready,
    Closed,
}

impl GatewayState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Initializing => "initializing",
            Self::Ready => "ready",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for GatewayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a health check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
    Healthy,
    Unhealthy,
    NotInitialized,
}

impl HealthState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Unhealthy => "unhealthy",
            Self::NotInitialized => "not_initialized",
        }
    }

    /// Convert to HTTP status code equivalent
    pub fn to_http_status_code(&self) -> u16 {
        match self {
            Self::Healthy => 200,
            Self::Unhealthy | Self::NotInitialized => 503,
        }
    }
}

/// Health snapshot returned by [`GatewayService::get_health_status`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub service: String,
    pub status: HealthState,
    pub connection_ready: bool,
    pub circuit_state: CircuitState,
    pub timestamp: DateTime<Utc>,
    pub error: Option<String>,
}

impl HealthReport {
    fn new(status: HealthState, connection_ready: bool, circuit_state: CircuitState) -> Self {
        Self {
            service: SERVICE_NAME.to_string(),
            status,
            connection_ready,
            circuit_state,
            timestamp: Utc::now(),
            error: None,
        }
    }

    fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

struct ConnectionSlot<C> {
    state: GatewayState,
    connection: Option<Arc<C>>,
}

/// Connection handle held for the duration of one call
///
/// Fields drop in order, so the reference count is already released when
/// the signal fires.
struct ConnectionLease<'a, C> {
    connection: Arc<C>,
    _released: ReleaseSignal<'a>,
}

impl<C> Deref for ConnectionLease<'_, C> {
    type Target = C;

    fn deref(&self) -> &C {
        &self.connection
    }
}

struct ReleaseSignal<'a>(&'a Notify);

impl Drop for ReleaseSignal<'_> {
    fn drop(&mut self) {
        self.0.notify_one();
    }
}

/// Rolls an abandoned `initialize` back to `Uninitialized`
struct InitAttempt<'a, C> {
    slot: &'a RwLock<ConnectionSlot<C>>,
    settled: bool,
}

impl<C> Drop for InitAttempt<'_, C> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let mut slot = self.slot.write();
        if slot.state == GatewayState::Initializing {
            slot.state = GatewayState::Uninitialized;
            debug!("Initialization cancelled");
        }
    }
}

/// Resilient facade over a [`GraphBackend`]
///
/// Construct one per process and share it behind an `Arc`.
pub struct GatewayService<B: GraphBackend> {
    backend: B,
    config: GatewayConfig,
    cache: SearchCache,
    breaker: CircuitBreaker,
    init_retry: RetryPolicy,
    search_retry: RetryPolicy,
    write_retry: RetryPolicy,
    single_attempt: RetryPolicy,
    init_lock: Mutex<()>,
    slot: RwLock<ConnectionSlot<B::Connection>>,
    released: Notify,
}

impl<B: GraphBackend> GatewayService<B> {
    /// Build a gateway around `backend`; nothing is connected until
    /// [`initialize`](Self::initialize)
    pub fn new(backend: B, config: GatewayConfig) -> Result<Self> {
        config.validate()?;

        let breaker = CircuitBreaker::new(SERVICE_NAME, config.circuit_breaker.clone())
            .with_failure_predicate(GatewayError::trips_breaker);

        Ok(Self {
            backend,
            cache: SearchCache::new(config.cache.clone()),
            breaker,
            init_retry: RetryPolicy::new(config.initialization_retry.clone()),
            search_retry: RetryPolicy::new(config.search_retry.clone()),
            write_retry: RetryPolicy::new(config.write_retry.clone()),
            single_attempt: RetryPolicy::new(RetryConfig::none()),
            init_lock: Mutex::new(()),
            slot: RwLock::new(ConnectionSlot {
                state: GatewayState::Uninitialized,
                connection: None,
            }),
            released: Notify::new(),
            config,
        })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn state(&self) -> GatewayState {
        self.slot.read().state
    }

    pub fn is_ready(&self) -> bool {
        self.state() == GatewayState::Ready
    }

    pub fn circuit_breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    pub fn circuit_snapshot(&self) -> CircuitSnapshot {
        self.breaker.snapshot()
    }

    /// Connect to the backend
    ///
    /// Idempotent: concurrent callers serialize on the init lock and only
    /// the first one connects. A failed or cancelled attempt leaves the
    /// gateway uninitialized so a later call can try again.
    pub async fn initialize(&self) -> Result<()> {
        let _guard = self.init_lock.lock().await;

        {
            let mut slot = self.slot.write();
            if slot.state == GatewayState::Ready {
                debug!("Gateway already initialized");
                return Ok(());
            }
            slot.state = GatewayState::Initializing;
        }
        let mut attempt = InitAttempt {
            slot: &self.slot,
            settled: false,
        };

        info!("Initializing gateway");

        let backend = &self.backend;
        let breaker = &self.breaker;
        let outcome = self
            .init_retry
            .execute("initialize", move || breaker.call(move || backend.connect()))
            .await;

        attempt.settled = true;
        let mut slot = self.slot.write();
        match outcome {
            Ok(connection) => {
                slot.connection = Some(Arc::new(connection));
                slot.state = GatewayState::Ready;
                info!("Gateway initialized");
                Ok(())
            }
            Err(err) => {
                slot.connection = None;
                slot.state = GatewayState::Uninitialized;
                error!(error = %err, "Gateway initialization failed");
                Err(err)
            }
        }
    }

    /// Disconnect from the backend; a no-op when never initialized
    ///
    /// New calls are rejected immediately. Calls already in flight keep
    /// their connection and the disconnect waits until the last of them
    /// finishes.
    pub async fn close(&self) -> Result<()> {
        let _guard = self.init_lock.lock().await;

        let connection = {
            let mut slot = self.slot.write();
            match slot.state {
                GatewayState::Uninitialized | GatewayState::Closed => return Ok(()),
                _ => {}
            }
            slot.state = GatewayState::Closed;
            slot.connection.take()
        };

        if let Some(mut connection) = connection {
            let connection = loop {
                match Arc::try_unwrap(connection) {
                    Ok(connection) => break connection,
                    Err(shared) => {
                        debug!(
                            in_flight = Arc::strong_count(&shared) - 1,
                            "Waiting for in-flight calls before disconnecting"
                        );
                        connection = shared;
                        self.released.notified().await;
                    }
                }
            };
            self.backend.disconnect(connection).await?;
        }

        info!("Gateway closed");
        Ok(())
    }

    /// Search facts, serving repeated queries from the cache
    ///
    /// `max_results` falls back to the configured default. Circuit-open
    /// rejections surface as [`GatewayError::CircuitOpen`]; backend failures
    /// surface as [`GatewayError::SearchFailed`] once retries are exhausted.
    /// Failures are never cached.
    pub async fn search(
        &self,
        query: &str,
        max_results: Option<usize>,
        center_node_id: Option<&str>,
    ) -> Result<ResultSet> {
        let connection = self.ready_connection()?;
        let max_results = max_results.unwrap_or(self.config.default_max_results);

        match self.cache.get(query, max_results, center_node_id).await {
            Ok(Some(results)) => {
                debug!(query, max_results, "Search cache hit");
                return Ok(results);
            }
            Ok(None) => debug!(query, max_results, "Search cache miss"),
            Err(err) => warn!(error = %err, "Ignoring unreadable cache entry"),
        }

        let request = SearchRequest {
            query: query.to_string(),
            max_results,
            center_node_id: center_node_id.map(str::to_string),
        };

        let backend = &self.backend;
        let breaker = &self.breaker;
        let connection = &*connection;
        let request_ref = &request;
        let outcome = self
            .search_retry
            .execute("search", move || {
                breaker.call(move || backend.search(connection, request_ref))
            })
            .await;

        match outcome {
            Ok(results) => {
                if let Err(err) = self
                    .cache
                    .put(query, max_results, center_node_id, &results)
                    .await
                {
                    warn!(error = %err, "Failed to cache search results");
                }
                debug!(query, hits = results.len(), "Search completed");
                Ok(results)
            }
            Err(err) if err.is_circuit_open() => {
                warn!(query, error = %err, "Search rejected by open circuit");
                Err(err)
            }
            Err(err) => {
                error!(query, error = %err, "Search failed");
                Err(GatewayError::SearchFailed {
                    query: query.to_string(),
                    source: Box::new(err),
                })
            }
        }
    }

    /// Search entity nodes; results are not cached
    pub async fn node_search(&self, query: &str, max_results: Option<usize>) -> Result<Vec<NodeHit>> {
        let connection = self.ready_connection()?;
        let max_results = max_results.unwrap_or(self.config.default_max_results);

        let backend = &self.backend;
        let breaker = &self.breaker;
        let connection = &*connection;
        let outcome = self
            .search_retry
            .execute("node_search", move || {
                breaker.call(move || backend.node_search(connection, query, max_results))
            })
            .await;

        match outcome {
            Ok(nodes) => Ok(nodes),
            Err(err) if err.is_circuit_open() => Err(err),
            Err(err) => {
                error!(query, error = %err, "Node search failed");
                Err(GatewayError::SearchFailed {
                    query: query.to_string(),
                    source: Box::new(err),
                })
            }
        }
    }

    /// Add a free-text episode (`source_description = "user_input"`)
    pub async fn add_text_episode(&self, name: &str, content: &str) -> Result<()> {
        self.add_episode(Episode::text(name, content)).await
    }

    /// Add a structured episode (`source_description = "structured_data"`)
    pub async fn add_json_episode(&self, name: &str, data: &serde_json::Value) -> Result<()> {
        self.add_episode(Episode::json(name, data)?).await
    }

    /// Submit an episode through the breaker
    ///
    /// Writes run once unless the episode carries a dedup key, in which
    /// case the write retry preset applies.
    pub async fn add_episode(&self, episode: Episode) -> Result<()> {
        let connection = self.ready_connection()?;

        let policy = if episode.is_idempotent() {
            &self.write_retry
        } else {
            &self.single_attempt
        };

        let backend = &self.backend;
        let breaker = &self.breaker;
        let connection = &*connection;
        let episode_ref = &episode;
        let outcome = policy
            .execute("add_episode", move || {
                breaker.call(move || backend.write_episode(connection, episode_ref))
            })
            .await;

        match outcome {
            Ok(()) => {
                info!(name = %episode.name, source = episode.source.as_str(), "Episode added");
                Ok(())
            }
            Err(err) if err.is_circuit_open() => Err(err),
            Err(err) => {
                error!(name = %episode.name, error = %err, "Failed to add episode");
                Err(GatewayError::WriteFailed {
                    name: episode.name,
                    source: Box::new(err),
                })
            }
        }
    }

    /// Report gateway health; never fails
    ///
    /// The probe bypasses the circuit breaker so health checks do not skew
    /// its failure accounting.
    pub async fn get_health_status(&self) -> HealthReport {
        let circuit_state = self.breaker.state();

        let connection = match self.ready_connection() {
            Ok(connection) => connection,
            Err(err) => {
                return HealthReport::new(HealthState::NotInitialized, false, circuit_state)
                    .with_error(err.to_string());
            }
        };

        let timeout = self.config.health_check_timeout;
        match tokio::time::timeout(timeout, self.backend.probe(&*connection)).await {
            Ok(Ok(())) => HealthReport::new(HealthState::Healthy, true, circuit_state),
            Ok(Err(err)) => {
                warn!(error = %err, "Health probe failed");
                HealthReport::new(HealthState::Unhealthy, true, circuit_state)
                    .with_error(err.to_string())
            }
            Err(_) => {
                let err = GatewayError::Timeout {
                    timeout,
                    context: "health probe".to_string(),
                };
                warn!(error = %err, "Health probe timed out");
                HealthReport::new(HealthState::Unhealthy, true, circuit_state)
                    .with_error(err.to_string())
            }
        }
    }

    /// Cache statistics; no side effects
    pub async fn get_cache_stats(&self) -> CacheStats {
        self.cache.stats().await
    }

    /// Drop every cached search result
    pub async fn clear_cache(&self) {
        self.cache.clear().await;
        info!("Search cache cleared");
    }

    fn ready_connection(&self) -> Result<ConnectionLease<'_, B::Connection>> {
        let slot = self.slot.read();
        match (&slot.state, &slot.connection) {
            (GatewayState::Ready, Some(connection)) => Ok(ConnectionLease {
                connection: Arc::clone(connection),
                _released: ReleaseSignal(&self.released),
            }),
            _ => Err(GatewayError::NotInitialized),
        }
    }
}
