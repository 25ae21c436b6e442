//! Circuit breaker guarding the upstream IaaS block API: a single breaker,
//! since the Provisioner has exactly one upstream rather than one per
//! recipient domain. Three-state model: `Closed` → `Open` on a failure
//! burst → `HalfOpen` after a timeout to probe recovery.

use std::{
    sync::Mutex,
    time::{Duration, Instant},
};

use serde::{Deserialize, Serialize};

fn default_failure_threshold() -> u32 {
    5
}
fn default_failure_window_secs() -> u64 {
    60
}
fn default_timeout_secs() -> u64 {
    300
}
fn default_success_threshold() -> u32 {
    1
}

/// Configuration for the upstream circuit breaker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    #[serde(default = "default_failure_window_secs")]
    pub failure_window_secs: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_success_threshold")]
    pub success_threshold: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            failure_window_secs: default_failure_window_secs(),
            timeout_secs: default_timeout_secs(),
            success_threshold: default_success_threshold(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug)]
struct State {
    state: CircuitState,
    failure_count: u32,
    first_failure_at: Option<Instant>,
    opened_at: Option<Instant>,
    consecutive_successes: u32,
}

impl State {
    const fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            failure_count: 0,
            first_failure_at: None,
            opened_at: None,
            consecutive_successes: 0,
        }
    }
}

/// A single upstream-wide circuit breaker.
#[derive(Debug)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    state: Mutex<State>,
}

impl CircuitBreaker {
    #[must_use]
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            state: Mutex::new(State::new()),
        }
    }

    fn failure_window_expired(&self, state: &State) -> bool {
        state.first_failure_at.is_none_or(|first| {
            Instant::now().duration_since(first) > Duration::from_secs(self.config.failure_window_secs)
        })
    }

    fn timeout_expired(&self, state: &State) -> bool {
        state.opened_at.is_some_and(|opened| {
            Instant::now().duration_since(opened) >= Duration::from_secs(self.config.timeout_secs)
        })
    }

    /// Whether an upstream call should be attempted at all. Transitions
    /// `Open` to `HalfOpen` once the timeout has elapsed, allowing exactly
    /// one probing call through.
    #[must_use]
    pub fn should_allow(&self) -> bool {
        let mut state = self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        match state.state {
            CircuitState::Open => {
                if self.timeout_expired(&state) {
                    state.state = CircuitState::HalfOpen;
                    state.consecutive_successes = 0;
                    tracing::info!("upstream circuit breaker entering half-open state");
                    true
                } else {
                    false
                }
            }
            CircuitState::Closed | CircuitState::HalfOpen => true,
        }
    }

    pub fn record_success(&self) {
        let mut state = self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        match state.state {
            CircuitState::Closed => {
                state.failure_count = 0;
                state.first_failure_at = None;
            }
            CircuitState::HalfOpen => {
                state.consecutive_successes += 1;
                if state.consecutive_successes >= self.config.success_threshold {
                    state.state = CircuitState::Closed;
                    state.failure_count = 0;
                    state.first_failure_at = None;
                    state.opened_at = None;
                    state.consecutive_successes = 0;
                    tracing::info!("upstream circuit breaker closed, normal operation resumed");
                }
            }
            CircuitState::Open => {}
        }
    }

    pub fn record_failure(&self) {
        let mut state = self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        match state.state {
            CircuitState::Closed => {
                if self.failure_window_expired(&state) {
                    state.failure_count = 0;
                    state.first_failure_at = None;
                }
                if state.first_failure_at.is_none() {
                    state.first_failure_at = Some(Instant::now());
                }
                state.failure_count += 1;
                if state.failure_count >= self.config.failure_threshold {
                    state.state = CircuitState::Open;
                    state.opened_at = Some(Instant::now());
                    tracing::warn!(
                        failure_count = state.failure_count,
                        threshold = self.config.failure_threshold,
                        "upstream circuit breaker opened, rejecting further calls"
                    );
                }
            }
            CircuitState::HalfOpen => {
                state.state = CircuitState::Open;
                state.opened_at = Some(Instant::now());
                state.consecutive_successes = 0;
                tracing::warn!("upstream circuit breaker probe failed, reopening");
            }
            CircuitState::Open => {}
        }
    }

    #[must_use]
    pub fn state(&self) -> CircuitState {
        self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner).state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker(failure_threshold: u32, timeout_secs: u64) -> CircuitBreaker {
        CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold,
            failure_window_secs: 60,
            timeout_secs,
            success_threshold: 1,
        })
    }

    #[test]
    fn opens_after_failure_threshold() {
        let breaker = breaker(3, 300);
        assert!(breaker.should_allow());
        breaker.record_failure();
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Closed);
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Open);
        assert!(!breaker.should_allow());
    }

    #[test]
    fn half_open_success_closes_circuit() {
        let breaker = breaker(2, 0);
        breaker.record_failure();
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Open);
        assert!(breaker.should_allow());
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
        breaker.record_success();
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[test]
    fn half_open_failure_reopens_circuit() {
        let breaker = breaker(2, 0);
        breaker.record_failure();
        breaker.record_failure();
        assert!(breaker.should_allow());
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Open);
    }
}
