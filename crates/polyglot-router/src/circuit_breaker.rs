//! Circuit breaker pattern for provider failure detection.
//!
//! One [`CircuitBreaker`] guards one provider. All state lives behind a
//! single mutex so every transition is atomic: a reader never observes a
//! half-applied change, and the half-open trial budget cannot be overdrawn.
//!
//! A trial [`Permit`] that is dropped without reporting an outcome, for
//! example because the caller cancelled the request, gives its slot back.

use crate::error::RouterError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Circuit breaker state for a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    /// Normal operation; calls pass through.
    Closed,
    /// Calls are rejected until the recovery timeout elapses.
    Open,
    /// A limited number of trial calls are let through.
    HalfOpen,
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Closed => "CLOSED",
            Self::Open => "OPEN",
            Self::HalfOpen => "HALF_OPEN",
        };
        f.write_str(s)
    }
}

/// Thresholds for a single breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakerConfig {
    /// Consecutive transient failures that open a closed breaker.
    pub failure_threshold: u32,
    /// Time spent OPEN before a trial call is admitted.
    pub recovery_timeout: Duration,
    /// Consecutive trial successes that close a half-open breaker.
    pub success_threshold: u32,
    /// Concurrent trial calls admitted while HALF_OPEN.
    pub half_open_max_calls: u32,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(60),
            success_threshold: 2,
            half_open_max_calls: 1,
        }
    }
}

/// Proof that a call was admitted. Hand it back through one of the
/// `record_*` methods once the call finishes. Dropping a trial permit
/// instead releases its slot without counting an outcome.
#[derive(Debug)]
#[must_use = "an admitted call must report its outcome"]
pub struct Permit {
    trial: bool,
    generation: u64,
    /// Set for trials only.
    slot: Option<Arc<Mutex<BreakerInner>>>,
}

impl Permit {
    /// Whether this call is a half-open trial.
    pub fn is_trial(&self) -> bool {
        self.trial
    }

    /// Hands the slot over to an explicit `record_*` call.
    fn disarm(mut self) -> (bool, u64) {
        self.slot = None;
        (self.trial, self.generation)
    }
}

impl Drop for Permit {
    fn drop(&mut self) {
        if let Some(slot) = self.slot.take() {
            let mut inner = lock(&slot);
            if inner.release_trial(self.trial, self.generation) {
                debug!(provider = %inner.provider, "Trial call abandoned, slot released");
            }
        }
    }
}

fn lock(inner: &Mutex<BreakerInner>) -> MutexGuard<'_, BreakerInner> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Point-in-time view of a breaker, for monitoring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakerSnapshot {
    /// Guarded provider.
    pub provider: String,
    /// Current state.
    pub state: CircuitState,
    /// Consecutive failures while CLOSED.
    pub consecutive_failures: u32,
    /// Consecutive trial successes while HALF_OPEN.
    pub consecutive_successes: u32,
    /// Trial calls currently in flight.
    pub half_open_in_flight: u32,
    /// Lifetime count of recorded failures.
    pub total_failures: u64,
    /// Lifetime count of recorded successes.
    pub total_successes: u64,
    /// Lifetime count of rejected calls.
    pub rejected_calls: u64,
    /// When the breaker last changed state.
    pub last_transition: DateTime<Utc>,
}

#[derive(Debug)]
struct BreakerInner {
    provider: String,
    state: CircuitState,
    consecutive_failures: u32,
    consecutive_successes: u32,
    half_open_in_flight: u32,
    opened_at: Option<Instant>,
    last_transition: DateTime<Utc>,
    /// Bumped on entering HALF_OPEN so stale permits cannot release slots.
    generation: u64,
    total_failures: u64,
    total_successes: u64,
    rejected_calls: u64,
}

impl BreakerInner {
    fn transition(&mut self, to: CircuitState) {
        let provider = self.provider.as_str();
        let from = self.state;
        self.state = to;
        self.last_transition = Utc::now();
        self.consecutive_failures = 0;
        self.consecutive_successes = 0;
        self.half_open_in_flight = 0;
        match to {
            CircuitState::Open => {
                self.opened_at = Some(Instant::now());
                warn!(provider, from = %from, "Circuit breaker -> OPEN");
            }
            CircuitState::HalfOpen => {
                self.generation += 1;
                info!(provider, from = %from, "Circuit breaker -> HALF_OPEN (trial calls allowed)");
            }
            CircuitState::Closed => {
                self.opened_at = None;
                info!(provider, from = %from, "Circuit breaker -> CLOSED (recovery successful)");
            }
        }
    }

    fn recovery_elapsed(&self, recovery_timeout: Duration) -> bool {
        self.opened_at.is_none_or(|at| at.elapsed() >= recovery_timeout)
    }

    /// Releases a trial slot if the permit holds one for the current half-open phase.
    fn release_trial(&mut self, trial: bool, generation: u64) -> bool {
        let current = trial && self.state == CircuitState::HalfOpen && generation == self.generation;
        if current {
            self.half_open_in_flight = self.half_open_in_flight.saturating_sub(1);
        }
        current
    }
}

/// Circuit breaker guarding a single provider.
#[derive(Debug)]
pub struct CircuitBreaker {
    provider: String,
    config: BreakerConfig,
    inner: Arc<Mutex<BreakerInner>>,
}

impl CircuitBreaker {
    /// Creates a CLOSED breaker for `provider`.
    pub fn new(provider: impl Into<String>, config: BreakerConfig) -> Self {
        let provider = provider.into();
        Self {
            inner: Arc::new(Mutex::new(BreakerInner {
                provider: provider.clone(),
                state: CircuitState::Closed,
                consecutive_failures: 0,
                consecutive_successes: 0,
                half_open_in_flight: 0,
                opened_at: None,
                last_transition: Utc::now(),
                generation: 0,
                total_failures: 0,
                total_successes: 0,
                rejected_calls: 0,
            })),
            provider,
            config,
        }
    }

    fn lock(&self) -> MutexGuard<'_, BreakerInner> {
        lock(&self.inner)
    }

    /// Provider this breaker guards.
    pub fn provider(&self) -> &str {
        &self.provider
    }

    /// The configured thresholds.
    pub fn config(&self) -> BreakerConfig {
        self.config
    }

    /// Asks to make a call.
    ///
    /// An OPEN breaker whose recovery timeout has elapsed moves to HALF_OPEN
    /// here and admits this call as a trial.
    ///
    /// # Errors
    /// Returns [`RouterError::CircuitOpen`] if the call must not reach the provider.
    pub fn try_acquire(&self) -> Result<Permit, RouterError> {
        let mut inner = self.lock();

        if inner.state == CircuitState::Open && inner.recovery_elapsed(self.config.recovery_timeout) {
            inner.transition(CircuitState::HalfOpen);
        }

        match inner.state {
            CircuitState::Closed => Ok(Permit { trial: false, generation: inner.generation, slot: None }),
            CircuitState::HalfOpen if inner.half_open_in_flight < self.config.half_open_max_calls => {
                inner.half_open_in_flight += 1;
                debug!(
                    provider = %self.provider,
                    in_flight = inner.half_open_in_flight,
                    "Circuit breaker admitted trial call"
                );
                Ok(Permit { trial: true, generation: inner.generation, slot: Some(Arc::clone(&self.inner)) })
            }
            CircuitState::HalfOpen | CircuitState::Open => {
                inner.rejected_calls += 1;
                Err(RouterError::CircuitOpen { provider: self.provider.clone() })
            }
        }
    }

    /// Whether a call would currently be admitted. Does not change state.
    pub fn would_admit(&self) -> bool {
        let inner = self.lock();
        match inner.state {
            CircuitState::Closed => true,
            CircuitState::Open => inner.recovery_elapsed(self.config.recovery_timeout),
            CircuitState::HalfOpen => inner.half_open_in_flight < self.config.half_open_max_calls,
        }
    }

    /// Records a successful call.
    pub fn record_success(&self, permit: Permit) {
        let (trial, generation) = permit.disarm();
        let mut inner = self.lock();
        inner.total_successes += 1;
        let was_trial = inner.release_trial(trial, generation);

        match inner.state {
            CircuitState::Closed => inner.consecutive_failures = 0,
            CircuitState::HalfOpen if was_trial => {
                inner.consecutive_successes += 1;
                debug!(
                    provider = %self.provider,
                    successes = inner.consecutive_successes,
                    needed = self.config.success_threshold,
                    "Circuit breaker trial succeeded"
                );
                if inner.consecutive_successes >= self.config.success_threshold {
                    inner.transition(CircuitState::Closed);
                }
            }
            // Late answers from calls admitted before the breaker opened.
            CircuitState::HalfOpen | CircuitState::Open => {}
        }
    }

    /// Records a transient failure or deadline expiry.
    pub fn record_failure(&self, permit: Permit) {
        let (trial, generation) = permit.disarm();
        let mut inner = self.lock();
        inner.total_failures += 1;
        inner.release_trial(trial, generation);

        match inner.state {
            CircuitState::Closed => {
                inner.consecutive_failures += 1;
                debug!(
                    provider = %self.provider,
                    failures = inner.consecutive_failures,
                    threshold = self.config.failure_threshold,
                    "Circuit breaker recorded failure"
                );
                if inner.consecutive_failures >= self.config.failure_threshold {
                    inner.transition(CircuitState::Open);
                }
            }
            CircuitState::HalfOpen => inner.transition(CircuitState::Open),
            CircuitState::Open => {}
        }
    }

    /// Records an outcome that says nothing about provider health, such as a
    /// permanent error. Only releases the trial slot.
    pub fn record_neutral(&self, permit: Permit) {
        let (trial, generation) = permit.disarm();
        self.lock().release_trial(trial, generation);
    }

    /// Current state. An elapsed OPEN breaker still reports OPEN until the
    /// next call attempt.
    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    /// Whether the breaker is OPEN.
    pub fn is_open(&self) -> bool {
        self.state() == CircuitState::Open
    }

    /// Point-in-time view for monitoring.
    pub fn snapshot(&self) -> BreakerSnapshot {
        let inner = self.lock();
        BreakerSnapshot {
            provider: self.provider.clone(),
            state: inner.state,
            consecutive_failures: inner.consecutive_failures,
            consecutive_successes: inner.consecutive_successes,
            half_open_in_flight: inner.half_open_in_flight,
            total_failures: inner.total_failures,
            total_successes: inner.total_successes,
            rejected_calls: inner.rejected_calls,
            last_transition: inner.last_transition,
        }
    }
}
