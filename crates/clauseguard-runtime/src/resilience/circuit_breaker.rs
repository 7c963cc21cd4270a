//! Per-model circuit breaker.
//!
//! A model variant that keeps failing is skipped until its recovery
//! timeout passes, so a dead variant does not cost one request timeout per
//! clause.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::config::duration_str;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before a variant is skipped
    pub failure_threshold: u32,

    /// How long a variant is skipped, e.g. "30s"
    #[serde(with = "duration_str")]
    pub recovery_timeout: Duration,

    /// Successful trial calls needed before the variant is trusted again
    pub success_threshold: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            recovery_timeout: Duration::from_secs(30),
            success_threshold: 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed { failures: u32 },

    Open { opened_at: Instant },

    /// Probing whether the model recovered
    HalfOpen { successes: u32 },
}

impl Default for CircuitState {
    fn default() -> Self {
        CircuitState::Closed { failures: 0 }
    }
}

impl CircuitState {
    fn after_success(self, config: &CircuitBreakerConfig) -> Self {
        match self {
            CircuitState::HalfOpen { successes } if successes + 1 < config.success_threshold => {
                CircuitState::HalfOpen {
                    successes: successes + 1,
                }
            }
            CircuitState::Open { .. } => self,
            _ => CircuitState::default(),
        }
    }

    fn after_failure(self, config: &CircuitBreakerConfig, now: Instant) -> Self {
        match self {
            CircuitState::Closed { failures } if failures + 1 < config.failure_threshold => {
                CircuitState::Closed {
                    failures: failures + 1,
                }
            }
            CircuitState::Open { .. } => self,
            _ => CircuitState::Open { opened_at: now },
        }
    }
}

/// Tracks a [`CircuitState`] per model name.
pub struct CircuitBreaker {
    circuits: Mutex<HashMap<String, CircuitState>>,
    config: CircuitBreakerConfig,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            circuits: Mutex::new(HashMap::new()),
            config,
        }
    }

    /// Whether calls to `model` should be skipped right now.
    ///
    /// An open circuit whose recovery timeout has elapsed moves to half-open
    /// and lets the call through.
    pub fn is_open(&self, model: &str) -> bool {
        let mut circuits = self.circuits.lock();
        let Some(state) = circuits.get_mut(model) else {
            return false;
        };

        match *state {
            CircuitState::Open { opened_at } if opened_at.elapsed() < self.config.recovery_timeout => true,
            CircuitState::Open { .. } => {
                *state = CircuitState::HalfOpen { successes: 0 };
                tracing::info!(model, "Probing model after recovery timeout");
                false
            }
            _ => false,
        }
    }

    pub fn record_success(&self, model: &str) {
        let mut circuits = self.circuits.lock();
        let Some(state) = circuits.get_mut(model) else {
            return;
        };

        let next = state.after_success(&self.config);
        if matches!(*state, CircuitState::HalfOpen { .. }) && matches!(next, CircuitState::Closed { .. }) {
            tracing::info!(model, "Model recovered, circuit closed");
        }
        *state = next;
    }

    pub fn record_failure(&self, model: &str) {
        let mut circuits = self.circuits.lock();
        let state = circuits.entry(model.to_string()).or_default();

        let next = state.after_failure(&self.config, Instant::now());
        match (*state, next) {
            (CircuitState::HalfOpen { .. }, CircuitState::Open { .. }) => {
                tracing::warn!(model, "Recovery trial failed, skipping model again");
            }
            (CircuitState::Closed { failures }, CircuitState::Open { .. }) => {
                tracing::warn!(model, failures = failures + 1, "Skipping model after repeated failures");
            }
            _ => {}
        }
        *state = next;
    }

    pub fn state(&self, model: &str) -> CircuitState {
        self.circuits.lock().get(model).copied().unwrap_or_default()
    }

    pub fn reset(&self) {
        self.circuits.lock().clear();
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRIMARY: &str = "gemini-2.5-flash";
    const BACKUP: &str = "gemini-1.5-flash";

    fn breaker(failures: u32, recovery: Duration, trials: u32) -> CircuitBreaker {
        CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: failures,
            recovery_timeout: recovery,
            success_threshold: trials,
        })
    }

    #[test]
    fn test_unknown_model_is_callable() {
        let cb = CircuitBreaker::default();
        cb.record_success(PRIMARY);
        assert!(!cb.is_open(PRIMARY));
        assert_eq!(cb.state(PRIMARY), CircuitState::Closed { failures: 0 });
    }

    #[test]
    fn test_third_failure_skips_model() {
        let cb = CircuitBreaker::default();
        cb.record_failure(PRIMARY);
        cb.record_failure(PRIMARY);
        assert_eq!(cb.state(PRIMARY), CircuitState::Closed { failures: 2 });
        assert!(!cb.is_open(PRIMARY));

        cb.record_failure(PRIMARY);
        assert!(cb.is_open(PRIMARY));
        assert!(!cb.is_open(BACKUP));
    }

    #[test]
    fn test_failures_must_be_consecutive() {
        let cb = breaker(2, Duration::from_secs(30), 1);
        for _ in 0..3 {
            cb.record_failure(PRIMARY);
            cb.record_success(PRIMARY);
        }
        assert!(!cb.is_open(PRIMARY));
    }

    #[test]
    fn test_trial_successes_close_circuit() {
        let cb = breaker(1, Duration::ZERO, 2);
        cb.record_failure(PRIMARY);

        // Recovery timeout of zero: the next check lets a trial call through.
        assert!(!cb.is_open(PRIMARY));
        assert_eq!(cb.state(PRIMARY), CircuitState::HalfOpen { successes: 0 });

        cb.record_success(PRIMARY);
        assert_eq!(cb.state(PRIMARY), CircuitState::HalfOpen { successes: 1 });
        cb.record_success(PRIMARY);
        assert_eq!(cb.state(PRIMARY), CircuitState::Closed { failures: 0 });
    }

    #[test]
    fn test_failed_trial_reopens() {
        let cb = breaker(1, Duration::ZERO, 3);
        cb.record_failure(PRIMARY);
        assert!(!cb.is_open(PRIMARY));

        cb.record_failure(PRIMARY);
        assert!(matches!(cb.state(PRIMARY), CircuitState::Open { .. }));
    }

    #[test]
    fn test_open_circuit_waits_for_timeout() {
        let cb = breaker(1, Duration::from_secs(3600), 1);
        cb.record_failure(BACKUP);
        cb.record_success(BACKUP);
        assert!(cb.is_open(BACKUP));

        cb.reset();
        assert!(!cb.is_open(BACKUP));
    }
}
