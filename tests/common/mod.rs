//! Scripted in-memory backend shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use kg_gateway::{
    CacheConfig, CircuitBreakerConfig, Episode, GatewayConfig, GatewayError, GatewayService,
    GraphBackend, NodeHit, Result, ResultSet, SearchHit, SearchRequest,
};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Number of upcoming calls that should fail; `ALWAYS` never runs out
pub const ALWAYS: u32 = u32::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeMode {
    Ok,
    Fail,
    Hang,
}

#[derive(Debug)]
pub struct MockConnection {
    pub id: u32,
}

/// Backend whose failures are scripted per operation
pub struct MockBackend {
    connect_calls: AtomicU32,
    disconnect_calls: AtomicU32,
    search_calls: AtomicU32,
    node_search_calls: AtomicU32,
    write_calls: AtomicU32,
    probe_calls: AtomicU32,
    connect_failures: AtomicU32,
    search_failures: AtomicU32,
    write_failures: AtomicU32,
    connect_delay: Duration,
    probe_mode: Mutex<ProbeMode>,
    results: ResultSet,
    nodes: Vec<NodeHit>,
    written: Mutex<Vec<Episode>>,
    requests: Mutex<Vec<SearchRequest>>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            connect_calls: AtomicU32::new(0),
            disconnect_calls: AtomicU32::new(0),
            search_calls: AtomicU32::new(0),
            node_search_calls: AtomicU32::new(0),
            write_calls: AtomicU32::new(0),
            probe_calls: AtomicU32::new(0),
            connect_failures: AtomicU32::new(0),
            search_failures: AtomicU32::new(0),
            write_failures: AtomicU32::new(0),
            connect_delay: Duration::ZERO,
            probe_mode: Mutex::new(ProbeMode::Ok),
            results: vec![
                SearchHit::new("Alice knows Bob"),
                SearchHit::new("Bob works at Acme"),
            ],
            nodes: vec![NodeHit {
                uuid: "node-alice".to_string(),
                name: "Alice".to_string(),
                summary: Some("A person".to_string()),
            }],
            written: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_connect_delay(mut self, delay: Duration) -> Self {
        self.connect_delay = delay;
        self
    }

    pub fn with_results(mut self, results: ResultSet) -> Self {
        self.results = results;
        self
    }

    pub fn failing_connects(self, n: u32) -> Self {
        self.set_connect_failures(n);
        self
    }

    pub fn failing_searches(self, n: u32) -> Self {
        self.set_search_failures(n);
        self
    }

    pub fn set_connect_failures(&self, n: u32) {
        self.connect_failures.store(n, Ordering::SeqCst);
    }

    pub fn set_search_failures(&self, n: u32) {
        self.search_failures.store(n, Ordering::SeqCst);
    }

    pub fn set_write_failures(&self, n: u32) {
        self.write_failures.store(n, Ordering::SeqCst);
    }

    pub fn set_probe(&self, mode: ProbeMode) {
        *self.probe_mode.lock().unwrap() = mode;
    }

    pub fn connect_calls(&self) -> u32 {
        self.connect_calls.load(Ordering::SeqCst)
    }

    pub fn disconnect_calls(&self) -> u32 {
        self.disconnect_calls.load(Ordering::SeqCst)
    }

    pub fn search_calls(&self) -> u32 {
        self.search_calls.load(Ordering::SeqCst)
    }

    pub fn node_search_calls(&self) -> u32 {
        self.node_search_calls.load(Ordering::SeqCst)
    }

    pub fn write_calls(&self) -> u32 {
        self.write_calls.load(Ordering::SeqCst)
    }

    pub fn probe_calls(&self) -> u32 {
        self.probe_calls.load(Ordering::SeqCst)
    }

    pub fn written(&self) -> Vec<Episode> {
        self.written.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> Option<SearchRequest> {
        self.requests.lock().unwrap().last().cloned()
    }

    fn take_failure(counter: &AtomicU32) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| match n {
                0 => None,
                ALWAYS => Some(ALWAYS),
                n => Some(n - 1),
            })
            .is_ok()
    }
}

#[async_trait]
impl GraphBackend for MockBackend {
    type Connection = MockConnection;

    async fn connect(&self) -> Result<MockConnection> {
        let id = self.connect_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if !self.connect_delay.is_zero() {
            tokio::time::sleep(self.connect_delay).await;
        }
        if Self::take_failure(&self.connect_failures) {
            return Err(GatewayError::Connection("connection refused".to_string()));
        }
        Ok(MockConnection { id })
    }

    async fn disconnect(&self, _connection: MockConnection) -> Result<()> {
        self.disconnect_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn write_episode(&self, _connection: &MockConnection, episode: &Episode) -> Result<()> {
        self.write_calls.fetch_add(1, Ordering::SeqCst);
        if Self::take_failure(&self.write_failures) {
            return Err(GatewayError::Remote("write rejected".to_string()));
        }
        self.written.lock().unwrap().push(episode.clone());
        Ok(())
    }

    async fn search(&self, _connection: &MockConnection, request: &SearchRequest) -> Result<ResultSet> {
        let n = self.search_calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.requests.lock().unwrap().push(request.clone());
        if Self::take_failure(&self.search_failures) {
            return Err(GatewayError::Remote(format!("search failure #{}", n)));
        }
        Ok(self
            .results
            .iter()
            .take(request.max_results)
            .cloned()
            .collect())
    }

    async fn node_search(
        &self,
        _connection: &MockConnection,
        _query: &str,
        max_results: usize,
    ) -> Result<Vec<NodeHit>> {
        self.node_search_calls.fetch_add(1, Ordering::SeqCst);
        if Self::take_failure(&self.search_failures) {
            return Err(GatewayError::Remote("node search failed".to_string()));
        }
        Ok(self.nodes.iter().take(max_results).cloned().collect())
    }

    async fn probe(&self, _connection: &MockConnection) -> Result<()> {
        self.probe_calls.fetch_add(1, Ordering::SeqCst);
        let mode = *self.probe_mode.lock().unwrap();
        match mode {
            ProbeMode::Ok => Ok(()),
            ProbeMode::Fail => Err(GatewayError::Remote("probe failed".to_string())),
            ProbeMode::Hang => std::future::pending().await,
        }
    }
}

/// Gateway config with a small cache and a breaker that trips after
/// `failure_threshold` failures
pub fn test_config(failure_threshold: u32) -> GatewayConfig {
    GatewayConfig {
        cache: CacheConfig::builder()
            .ttl(Duration::from_secs(60))
            .max_entries(16)
            .build(),
        circuit_breaker: CircuitBreakerConfig::new(failure_threshold, Duration::from_secs(30)),
        ..GatewayConfig::default()
    }
}

pub fn gateway(backend: MockBackend, failure_threshold: u32) -> GatewayService<MockBackend> {
    GatewayService::new(backend, test_config(failure_threshold)).unwrap()
}

pub async fn ready_gateway(backend: MockBackend, failure_threshold: u32) -> GatewayService<MockBackend> {
    let gateway = gateway(backend, failure_threshold);
    gateway.initialize().await.unwrap();
    gateway
}
