//! Resilience patterns for clauseguard-runtime.
//!
//! - Circuit breaker per model variant
//! - Token budget management

mod budget;
mod circuit_breaker;

pub use budget::{Allowance, BudgetTracker, LlmUsage, Stage};
pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
