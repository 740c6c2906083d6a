//! Error types for gateway operations
//!
//! This module defines the error taxonomy for the kg-gateway library,
//! separating local precondition failures, circuit-breaker rejections and
//! genuine backend failures so callers can react to each differently.

use std::time::Duration;
use thiserror::Error;

/// Main error type for gateway operations
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Connection error - the backend could not be reached or initialized
    #[error("Connection error: {0}")]
    Connection(String),

    /// Remote error - the backend rejected or failed an operation
    #[error("Remote error: {0}")]
    Remote(String),

    /// The gateway has not been initialized (or has been closed)
    #[error("Gateway not initialized. Call initialize() first.")]
    NotInitialized,

    /// The circuit breaker is open and the call was rejected without reaching the backend
    #[error("Circuit open after {failure_count} failures; retry in {retry_after:?}")]
    CircuitOpen {
        failure_count: u32,
        retry_after: Duration,
    },

    /// Cache error - never propagated out of a search, degraded to a miss
    #[error("Cache error: {0}")]
    Cache(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/Deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Operation timeout
    #[error("Operation timed out after {timeout:?}: {context}")]
    Timeout { timeout: Duration, context: String },

    /// A search failed after the retry policy was exhausted
    #[error("Search failed for query '{query}': {source}")]
    SearchFailed {
        query: String,
        #[source]
        source: Box<GatewayError>,
    },

    /// An episode write failed
    #[error("Failed to write episode '{name}': {source}")]
    WriteFailed {
        name: String,
        #[source]
        source: Box<GatewayError>,
    },

    /// Neo4rs driver error (wrapper)
    #[error("Neo4rs driver error: {0}")]
    Driver(#[from] neo4rs::Error),
}

/// Result type alias for gateway operations
pub type Result<T> = std::result::Result<T, GatewayError>;

impl GatewayError {
    /// Whether a retry policy may re-attempt after this error.
    ///
    /// Local preconditions, configuration problems and breaker rejections
    /// fail the same way on every attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            GatewayError::Connection(_)
            | GatewayError::Remote(_)
            | GatewayError::Timeout { .. }
            | GatewayError::Driver(_) => true,
            GatewayError::SearchFailed { source, .. } | GatewayError::WriteFailed { source, .. } => {
                source.is_retryable()
            }
            GatewayError::NotInitialized
            | GatewayError::CircuitOpen { .. }
            | GatewayError::Cache(_)
            | GatewayError::Config(_)
            | GatewayError::Serialization(_) => false,
        }
    }

    /// Whether this error counts as a backend failure for the circuit breaker.
    ///
    /// Serialization and configuration problems are local bugs and do not
    /// say anything about backend health.
    pub fn trips_breaker(&self) -> bool {
        match self {
            GatewayError::Connection(_)
            | GatewayError::Remote(_)
            | GatewayError::Timeout { .. }
            | GatewayError::Driver(_) => true,
            GatewayError::SearchFailed { source, .. } | GatewayError::WriteFailed { source, .. } => {
                source.trips_breaker()
            }
            _ => false,
        }
    }

    /// Whether the call was fast-failed by an open circuit
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, GatewayError::CircuitOpen { .. })
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(e: serde_json::Error) -> Self {
        GatewayError::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = GatewayError::Connection("Failed to connect".to_string());
        assert_eq!(error.to_string(), "Connection error: Failed to connect");

        let timeout_error = GatewayError::Timeout {
            timeout: Duration::from_secs(5),
            context: "health probe".to_string(),
        };
        assert!(timeout_error.to_string().contains("timed out after 5s"));

        let open = GatewayError::CircuitOpen {
            failure_count: 5,
            retry_after: Duration::from_secs(30),
        };
        assert!(open.to_string().contains("after 5 failures"));

        assert!(GatewayError::NotInitialized
            .to_string()
            .contains("not initialized"));
    }

    #[test]
    fn test_search_failed_preserves_cause() {
        use std::error::Error as _;

        let error = GatewayError::SearchFailed {
            query: "alice".to_string(),
            source: Box::new(GatewayError::Remote("boom".to_string())),
        };

        assert!(error.to_string().contains("alice"));
        let cause = error.source().expect("cause should be preserved");
        assert_eq!(cause.to_string(), "Remote error: boom");
    }

    #[test]
    fn test_classification() {
        assert!(GatewayError::Remote("x".into()).is_retryable());
        assert!(GatewayError::Remote("x".into()).trips_breaker());
        assert!(!GatewayError::NotInitialized.is_retryable());
        assert!(!GatewayError::NotInitialized.trips_breaker());
        assert!(!GatewayError::Serialization("bad".into()).trips_breaker());

        let open = GatewayError::CircuitOpen {
            failure_count: 1,
            retry_after: Duration::ZERO,
        };
        assert!(open.is_circuit_open());
        assert!(!open.is_retryable());
    }

    #[test]
    fn test_serde_conversion() {
        let err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let error: GatewayError = err.into();
        assert!(matches!(error, GatewayError::Serialization(_)));
    }
}
