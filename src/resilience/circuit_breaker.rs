//! Circuit breaker for fast-failing against a degraded backend
//!
//! # State Transitions
//! ```text
//! Closed    → Open:      failure_count >= failure_threshold
//! Open      → Half-Open: recovery_timeout elapsed since the last failure
//! Half-Open → Closed:    the trial call succeeds (failure_count reset to 0)
//! Half-Open → Open:      the trial call fails
//! ```
//!
//! Only the pre-call check and the post-call bookkeeping take the state
//! lock; the wrapped operation itself runs unlocked.

use crate::error::{GatewayError, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Decides whether an error counts as a backend failure
pub type FailurePredicate = Arc<dyn Fn(&GatewayError) -> bool + Send + Sync>;

/// Configuration for a circuit breaker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures that trip the circuit
    pub failure_threshold: u32,
    /// How long the circuit stays open before a trial call is allowed
    pub recovery_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(60),
        }
    }
}

impl CircuitBreakerConfig {
    /// Create a configuration with explicit values
    pub fn new(failure_threshold: u32, recovery_timeout: Duration) -> Self {
        Self {
            failure_threshold,
            recovery_timeout,
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.failure_threshold == 0 {
            return Err(GatewayError::Config(
                "circuit breaker failure_threshold must be at least 1".to_string(),
            ));
        }
        if self.recovery_timeout.is_zero() {
            return Err(GatewayError::Config(
                "circuit breaker recovery_timeout must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// State of a circuit breaker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Calls flow normally
    Closed,
    /// Calls are rejected without reaching the backend
    Open,
    /// One trial call is probing whether the backend recovered
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Open => "open",
            Self::HalfOpen => "half_open",
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time view of a breaker, for health reporting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitSnapshot {
    pub state: CircuitState,
    pub failure_count: u32,
    pub failure_threshold: u32,
    /// Time left before an open circuit admits a trial call
    pub retry_after: Option<Duration>,
}

struct BreakerState {
    state: CircuitState,
    failure_count: u32,
    last_failure_time: Option<Instant>,
    trial_in_flight: bool,
    /// Bumped whenever the circuit opens or is reset; outcomes of calls
    /// admitted under an older generation are ignored
    generation: u64,
}

/// Tri-state gate in front of a remote dependency
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    is_failure: FailurePredicate,
    state: Mutex<BreakerState>,
}

impl CircuitBreaker {
    /// Create a breaker that counts every error as a failure
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            name: name.into(),
            config,
            is_failure: Arc::new(|_| true),
            state: Mutex::new(BreakerState {
                state: CircuitState::Closed,
                failure_count: 0,
                last_failure_time: None,
                trial_in_flight: false,
                generation: 0,
            }),
        }
    }

    /// Only errors matching `predicate` count toward tripping the circuit.
    ///
    /// Other errors are passed through to the caller and recorded as a
    /// response from the backend, i.e. like a success. This includes the
    /// half-open trial: an excluded error on the trial call closes the
    /// circuit.
    pub fn with_failure_predicate<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&GatewayError) -> bool + Send + Sync + 'static,
    {
        self.is_failure = Arc::new(predicate);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Current state (an open circuit past its recovery timeout still reads
    /// as open until a call moves it to half-open)
    pub fn state(&self) -> CircuitState {
        self.state.lock().state
    }

    pub fn failure_count(&self) -> u32 {
        self.state.lock().failure_count
    }

    pub fn snapshot(&self) -> CircuitSnapshot {
        let inner = self.state.lock();
        let retry_after = match inner.state {
            CircuitState::Open => Some(self.remaining_open(&inner, Instant::now())),
            _ => None,
        };
        CircuitSnapshot {
            state: inner.state,
            failure_count: inner.failure_count,
            failure_threshold: self.config.failure_threshold,
            retry_after,
        }
    }

    /// Force the circuit closed and forget all failures
    pub fn reset(&self) {
        let mut inner = self.state.lock();
        inner.state = CircuitState::Closed;
        inner.failure_count = 0;
        inner.last_failure_time = None;
        inner.trial_in_flight = false;
        inner.generation += 1;
        info!(breaker = %self.name, "Circuit breaker reset");
    }

    /// Run `operation` through the breaker
    ///
    /// Returns [`GatewayError::CircuitOpen`] without invoking `operation`
    /// when the circuit is open, or when another trial call already holds
    /// the half-open slot.
    pub async fn call<F, Fut, T>(&self, operation: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let permit = self.acquire()?;
        let outcome = operation().await;

        match &outcome {
            Err(err) if (self.is_failure)(err) => permit.record_failure(err),
            _ => permit.record_success(),
        }
        outcome
    }

    fn acquire(&self) -> Result<CallPermit<'_>> {
        let mut inner = self.state.lock();
        let now = Instant::now();

        match inner.state {
            CircuitState::Closed => Ok(CallPermit::new(self, false, inner.generation)),
            CircuitState::Open => {
                let remaining = self.remaining_open(&inner, now);
                if remaining.is_zero() {
                    info!(breaker = %self.name, "Circuit half-open, allowing trial call");
                    inner.state = CircuitState::HalfOpen;
                    inner.trial_in_flight = true;
                    Ok(CallPermit::new(self, true, inner.generation))
                } else {
                    debug!(breaker = %self.name, ?remaining, "Circuit open, rejecting call");
                    Err(GatewayError::CircuitOpen {
                        failure_count: inner.failure_count,
                        retry_after: remaining,
                    })
                }
            }
            CircuitState::HalfOpen => {
                if inner.trial_in_flight {
                    debug!(breaker = %self.name, "Trial call in flight, rejecting call");
                    Err(GatewayError::CircuitOpen {
                        failure_count: inner.failure_count,
                        retry_after: Duration::ZERO,
                    })
                } else {
                    inner.trial_in_flight = true;
                    Ok(CallPermit::new(self, true, inner.generation))
                }
            }
        }
    }

    fn remaining_open(&self, inner: &BreakerState, now: Instant) -> Duration {
        match inner.last_failure_time {
            Some(at) => self
                .config
                .recovery_timeout
                .saturating_sub(now.saturating_duration_since(at)),
            None => Duration::ZERO,
        }
    }
}

/// Admission ticket for one call; settles the outcome exactly once.
///
/// Dropping an unsettled trial permit (the caller abandoned the call)
/// frees the half-open slot without recording anything. Outcomes from a
/// permit issued before the circuit last opened or was reset are dropped.
struct CallPermit<'a> {
    breaker: &'a CircuitBreaker,
    trial: bool,
    generation: u64,
    settled: bool,
}

impl<'a> CallPermit<'a> {
    fn new(breaker: &'a CircuitBreaker, trial: bool, generation: u64) -> Self {
        Self {
            breaker,
            trial,
            generation,
            settled: false,
        }
    }

    fn record_success(mut self) {
        self.settled = true;
        let mut inner = self.breaker.state.lock();

        if inner.generation != self.generation {
            debug!(breaker = %self.breaker.name, "Ignoring stale success");
        } else if self.trial {
            info!(breaker = %self.breaker.name, "Trial call succeeded, closing circuit");
            inner.state = CircuitState::Closed;
            inner.failure_count = 0;
            inner.last_failure_time = None;
            inner.trial_in_flight = false;
        } else if inner.state == CircuitState::Closed {
            inner.failure_count = 0;
        }
    }

    fn record_failure(mut self, err: &GatewayError) {
        self.settled = true;
        let mut inner = self.breaker.state.lock();
        let name = &self.breaker.name;

        if inner.generation != self.generation {
            debug!(breaker = %name, error = %err, "Ignoring stale failure");
        } else if self.trial {
            inner.failure_count += 1;
            inner.last_failure_time = Some(Instant::now());
            inner.state = CircuitState::Open;
            inner.trial_in_flight = false;
            inner.generation += 1;
            warn!(breaker = %name, error = %err, "Trial call failed, circuit re-opened");
        } else if inner.state == CircuitState::Closed {
            inner.failure_count += 1;
            debug!(
                breaker = %name,
                failures = inner.failure_count,
                threshold = self.breaker.config.failure_threshold,
                error = %err,
                "Recorded failure"
            );
            if inner.failure_count >= self.breaker.config.failure_threshold {
                inner.last_failure_time = Some(Instant::now());
                inner.state = CircuitState::Open;
                inner.generation += 1;
                warn!(
                    breaker = %name,
                    failures = inner.failure_count,
                    recovery_timeout = ?self.breaker.config.recovery_timeout,
                    "Circuit opened"
                );
            }
        }
    }
}

impl Drop for CallPermit<'_> {
    fn drop(&mut self) {
        if self.trial && !self.settled {
            let mut inner = self.breaker.state.lock();
            if inner.generation == self.generation {
                inner.trial_in_flight = false;
                debug!(breaker = %self.breaker.name, "Trial call abandoned");
            }
        }
    }
}
