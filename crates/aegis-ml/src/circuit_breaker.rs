//! Per-model circuit breaker.
//!
//! Closed/open/half-open state machine with atomic counters. A loaded
//! model's circuit lives and dies with the process — no distributed
//! backend, no disk persistence, no state-change broadcast.

use aegis_config::InferenceConfig;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;

/// Circuit breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Requests flow normally.
    Closed,
    /// Requests are rejected outright.
    Open,
    /// A limited number of probe requests are allowed through.
    HalfOpen,
}

/// Tracks consecutive failures/successes for a single model's predictor
/// and short-circuits calls once `failure_threshold` is reached.
pub struct CircuitBreaker {
    enabled: bool,
    failure_threshold: u32,
    success_threshold: u32,
    recovery_timeout: Duration,
    state: RwLock<CircuitState>,
    consecutive_failures: AtomicU32,
    consecutive_successes: AtomicU32,
    opened_at: RwLock<Option<Instant>>,
}

impl CircuitBreaker {
    /// Build a breaker from the inference engine's configured thresholds.
    pub fn new(config: &InferenceConfig) -> Self {
        Self {
            enabled: config.circuit_breaker_enabled,
            failure_threshold: config.circuit_failure_threshold,
            success_threshold: config.circuit_success_threshold,
            recovery_timeout: Duration::from_millis(config.circuit_recovery_timeout_ms),
            state: RwLock::new(CircuitState::Closed),
            consecutive_failures: AtomicU32::new(0),
            consecutive_successes: AtomicU32::new(0),
            opened_at: RwLock::new(None),
        }
    }

    /// Whether a call should be let through right now. Transitions
    /// `Open -> HalfOpen` when the recovery timeout has elapsed.
    pub async fn allow_request(&self) -> bool {
        if !self.enabled {
            return true;
        }
        match *self.state.read().await {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let opened_at = *self.opened_at.read().await;
                if opened_at.is_some_and(|at| at.elapsed() >= self.recovery_timeout) {
                    self.transition_to_half_open().await;
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Record a successful call.
    pub async fn record_success(&self) {
        if !self.enabled {
            return;
        }
        self.consecutive_failures.store(0, Ordering::SeqCst);
        let successes = self.consecutive_successes.fetch_add(1, Ordering::SeqCst) + 1;
        if *self.state.read().await == CircuitState::HalfOpen && successes >= self.success_threshold {
            self.transition_to_closed().await;
        }
    }

    /// Record a failed call.
    pub async fn record_failure(&self) {
        if !self.enabled {
            return;
        }
        self.consecutive_successes.store(0, Ordering::SeqCst);
        let failures = self.consecutive_failures.fetch_add(1, Ordering::SeqCst) + 1;
        let state = *self.state.read().await;
        if state == CircuitState::HalfOpen {
            self.transition_to_open().await;
        } else if state == CircuitState::Closed && failures >= self.failure_threshold {
            self.transition_to_open().await;
        }
    }

    /// Current state, for health reporting.
    pub async fn state(&self) -> CircuitState {
        *self.state.read().await
    }

    async fn transition_to_open(&self) {
        let mut state = self.state.write().await;
        if *state != CircuitState::Open {
            *state = CircuitState::Open;
            *self.opened_at.write().await = Some(Instant::now());
            debug!("circuit breaker transitioned to open");
        }
    }

    async fn transition_to_half_open(&self) {
        let mut state = self.state.write().await;
        if *state != CircuitState::HalfOpen {
            *state = CircuitState::HalfOpen;
            self.consecutive_successes.store(0, Ordering::SeqCst);
            debug!("circuit breaker transitioned to half-open");
        }
    }

    async fn transition_to_closed(&self) {
        let mut state = self.state.write().await;
        *state = CircuitState::Closed;
        self.consecutive_failures.store(0, Ordering::SeqCst);
        self.consecutive_successes.store(0, Ordering::SeqCst);
        debug!("circuit breaker transitioned to closed");
    }
}
