//! Environment-driven configuration
//!
//! Every setting has a default, so an empty environment yields a working
//! local setup. Values are read from the process environment;
//! [`GatewaySettings::load`] additionally picks up a `.env` file first.

use crate::backend::Neo4jConfig;
use crate::cache::CacheConfig;
use crate::error::{GatewayError, Result};
use crate::gateway::{GatewayConfig, MAX_RESULTS_LIMIT};
use crate::resilience::CircuitBreakerConfig;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::Level;

pub const ENV_NEO4J_URI: &str = "NEO4J_URI";
pub const ENV_NEO4J_USER: &str = "NEO4J_USER";
pub const ENV_NEO4J_PASSWORD: &str = "NEO4J_PASSWORD";
pub const ENV_NEO4J_DATABASE: &str = "NEO4J_DATABASE";
pub const ENV_CACHE_TTL_SECONDS: &str = "CACHE_TTL_SECONDS";
pub const ENV_CACHE_MAX_SIZE: &str = "CACHE_MAX_SIZE";
pub const ENV_CB_FAILURE_THRESHOLD: &str = "CIRCUIT_BREAKER_FAILURE_THRESHOLD";
pub const ENV_CB_RECOVERY_TIMEOUT_SECONDS: &str = "CIRCUIT_BREAKER_RECOVERY_TIMEOUT_SECONDS";
pub const ENV_DEFAULT_MAX_RESULTS: &str = "DEFAULT_MAX_RESULTS";
pub const ENV_HEALTH_CHECK_TIMEOUT_SECONDS: &str = "HEALTH_CHECK_TIMEOUT_SECONDS";
pub const ENV_LOG_LEVEL: &str = "LOG_LEVEL";

/// All recognised variables
pub const ENV_VARS: &[&str] = &[
    ENV_NEO4J_URI,
    ENV_NEO4J_USER,
    ENV_NEO4J_PASSWORD,
    ENV_NEO4J_DATABASE,
    ENV_CACHE_TTL_SECONDS,
    ENV_CACHE_MAX_SIZE,
    ENV_CB_FAILURE_THRESHOLD,
    ENV_CB_RECOVERY_TIMEOUT_SECONDS,
    ENV_DEFAULT_MAX_RESULTS,
    ENV_HEALTH_CHECK_TIMEOUT_SECONDS,
    ENV_LOG_LEVEL,
];

/// Gateway configuration as read from the environment
#[derive(Clone, PartialEq)]
pub struct GatewaySettings {
    pub neo4j_uri: String,
    pub neo4j_user: String,
    pub neo4j_password: String,
    pub neo4j_database: String,
    pub cache_ttl_seconds: u64,
    pub cache_max_size: usize,
    pub circuit_breaker_failure_threshold: u32,
    pub circuit_breaker_recovery_timeout_seconds: u64,
    pub default_max_results: usize,
    pub health_check_timeout_seconds: u64,
    pub log_level: Level,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            neo4j_uri: "bolt://localhost:7687".to_string(),
            neo4j_user: "neo4j".to_string(),
            neo4j_password: "password".to_string(),
            neo4j_database: "neo4j".to_string(),
            cache_ttl_seconds: 300,
            cache_max_size: 1000,
            circuit_breaker_failure_threshold: 5,
            circuit_breaker_recovery_timeout_seconds: 60,
            default_max_results: 5,
            health_check_timeout_seconds: 5,
            log_level: Level::INFO,
        }
    }
}

impl fmt::Debug for GatewaySettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewaySettings")
            .field("neo4j_uri", &self.neo4j_uri)
            .field("neo4j_user", &self.neo4j_user)
            .field("neo4j_password", &"<redacted>")
            .field("neo4j_database", &self.neo4j_database)
            .field("cache_ttl_seconds", &self.cache_ttl_seconds)
            .field("cache_max_size", &self.cache_max_size)
            .field(
                "circuit_breaker_failure_threshold",
                &self.circuit_breaker_failure_threshold,
            )
            .field(
                "circuit_breaker_recovery_timeout_seconds",
                &self.circuit_breaker_recovery_timeout_seconds,
            )
            .field("default_max_results", &self.default_max_results)
            .field("health_check_timeout_seconds", &self.health_check_timeout_seconds)
            .field("log_level", &self.log_level)
            .finish()
    }
}

impl GatewaySettings {
    /// Load `.env` (if present) and then read the environment
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_env()
    }

    /// Read settings from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let string = |key: &str, default: String| lookup(key).unwrap_or(default);

        let settings = Self {
            neo4j_uri: string(ENV_NEO4J_URI, defaults.neo4j_uri),
            neo4j_user: string(ENV_NEO4J_USER, defaults.neo4j_user),
            neo4j_password: string(ENV_NEO4J_PASSWORD, defaults.neo4j_password),
            neo4j_database: string(ENV_NEO4J_DATABASE, defaults.neo4j_database),
            cache_ttl_seconds: parse_var(&lookup, ENV_CACHE_TTL_SECONDS, defaults.cache_ttl_seconds)?,
            cache_max_size: parse_var(&lookup, ENV_CACHE_MAX_SIZE, defaults.cache_max_size)?,
            circuit_breaker_failure_threshold: parse_var(
                &lookup,
                ENV_CB_FAILURE_THRESHOLD,
                defaults.circuit_breaker_failure_threshold,
            )?,
            circuit_breaker_recovery_timeout_seconds: parse_var(
                &lookup,
                ENV_CB_RECOVERY_TIMEOUT_SECONDS,
                defaults.circuit_breaker_recovery_timeout_seconds,
            )?,
            default_max_results: parse_var(
                &lookup,
                ENV_DEFAULT_MAX_RESULTS,
                defaults.default_max_results,
            )?,
            health_check_timeout_seconds: parse_var(
                &lookup,
                ENV_HEALTH_CHECK_TIMEOUT_SECONDS,
                defaults.health_check_timeout_seconds,
            )?,
            log_level: parse_log_level(lookup(ENV_LOG_LEVEL), defaults.log_level)?,
        };

        settings.validate()?;
        Ok(settings)
    }

    /// Check every value against its accepted range
    pub fn validate(&self) -> Result<()> {
        if self.neo4j_uri.trim().is_empty() {
            return Err(GatewayError::Config(format!("{} must not be empty", ENV_NEO4J_URI)));
        }
        if self.default_max_results == 0 || self.default_max_results > MAX_RESULTS_LIMIT {
            return Err(GatewayError::Config(format!(
                "{} must be between 1 and {}, got {}",
                ENV_DEFAULT_MAX_RESULTS, MAX_RESULTS_LIMIT, self.default_max_results
            )));
        }
        if self.health_check_timeout_seconds == 0 {
            return Err(GatewayError::Config(format!(
                "{} must be at least 1",
                ENV_HEALTH_CHECK_TIMEOUT_SECONDS
            )));
        }
        self.cache_config().validate()?;
        self.circuit_breaker_config().validate()?;
        Ok(())
    }

    pub fn neo4j_config(&self) -> Neo4jConfig {
        Neo4jConfig {
            uri: self.neo4j_uri.clone(),
            user: self.neo4j_user.clone(),
            password: self.neo4j_password.clone(),
            database: self.neo4j_database.clone(),
            ..Neo4jConfig::default()
        }
    }

    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig::builder()
            .ttl(Duration::from_secs(self.cache_ttl_seconds))
            .max_entries(self.cache_max_size)
            .build()
    }

    pub fn circuit_breaker_config(&self) -> CircuitBreakerConfig {
        CircuitBreakerConfig::new(
            self.circuit_breaker_failure_threshold,
            Duration::from_secs(self.circuit_breaker_recovery_timeout_seconds),
        )
    }

    /// Gateway tunables; retry presets keep their defaults
    pub fn gateway_config(&self) -> GatewayConfig {
        GatewayConfig {
            default_max_results: self.default_max_results,
            health_check_timeout: Duration::from_secs(self.health_check_timeout_seconds),
            cache: self.cache_config(),
            circuit_breaker: self.circuit_breaker_config(),
            ..GatewayConfig::default()
        }
    }
}

fn parse_var<T, F>(lookup: &F, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| GatewayError::Config(format!("Invalid {}='{}': {}", key, raw, e))),
        None => Ok(default),
    }
}

fn parse_log_level(raw: Option<String>, default: Level) -> Result<Level> {
    let Some(raw) = raw else {
        return Ok(default);
    };

    match raw.trim().to_ascii_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" | "warning" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => Err(GatewayError::Config(format!(
            "Invalid {}='{}': expected trace, debug, info, warn or error",
            ENV_LOG_LEVEL, raw
        ))),
    }
}
