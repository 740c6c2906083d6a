//! Resilience primitives wrapped around every remote call
//!
//! The gateway composes them as `retry(breaker(operation))`: the retry loop
//! is outermost and each individual attempt passes through the breaker, so
//! breaker state reflects per-attempt outcomes.

pub mod circuit_breaker;
pub mod retry;

pub use circuit_breaker::{
    CircuitBreaker, CircuitBreakerConfig, CircuitSnapshot, CircuitState, FailurePredicate,
};
pub use retry::{RetryConfig, RetryPolicy};
