//! Shared test utilities for router integration tests.
//!
//! [`Scripted`] is an in-process provider whose behaviour each test sets up
//! front and can flip while the test runs. Every call is counted.

#![allow(dead_code)]

use async_trait::async_trait;
use polyglot_abstraction::{FailureReason, Provider, ProviderError, TranslationResult};
use polyglot_router::BreakerConfig;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

/// A provider driven by test code.
pub struct Scripted {
    name: String,
    languages: Vec<&'static str>,
    up: AtomicBool,
    failure: FailureReason,
    fail_first: AtomicUsize,
    delay: Duration,
    health_delay: Duration,
    cost: f64,
    calls: AtomicUsize,
}

impl Scripted {
    /// A provider that answers every call.
    pub fn up(name: &str) -> Self {
        Self {
            name: name.to_string(),
            languages: vec!["en", "es", "fr", "de"],
            up: AtomicBool::new(true),
            failure: FailureReason::Network,
            fail_first: AtomicUsize::new(0),
            delay: Duration::ZERO,
            health_delay: Duration::ZERO,
            cost: 0.0001,
            calls: AtomicUsize::new(0),
        }
    }

    /// A provider that fails every call with a network error.
    pub fn down(name: &str) -> Self {
        let provider = Self::up(name);
        provider.set_up(false);
        provider
    }

    /// Changes the error returned while down.
    pub fn failing_with(mut self, reason: FailureReason) -> Self {
        self.failure = reason;
        self
    }

    /// Fails the next `n` calls transiently, then behaves normally.
    pub fn failing_first(self, n: usize) -> Self {
        self.fail_first.store(n, Ordering::SeqCst);
        self
    }

    /// Waits `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Waits `delay` before answering a health probe.
    pub fn with_health_delay(mut self, delay: Duration) -> Self {
        self.health_delay = delay;
        self
    }

    /// Restricts the supported languages.
    pub fn with_languages(mut self, languages: &[&'static str]) -> Self {
        self.languages = languages.to_vec();
        self
    }

    /// Sets the flat cost per call.
    pub fn with_cost(mut self, cost: f64) -> Self {
        self.cost = cost;
        self
    }

    /// Brings the provider up or down.
    pub fn set_up(&self, up: bool) {
        self.up.store(up, Ordering::SeqCst);
    }

    /// Calls that reached `translate`.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Provider for Scripted {
    fn name(&self) -> &str {
        &self.name
    }

    async fn translate(
        &self,
        text: &str,
        _source_lang: &str,
        target_lang: &str,
    ) -> Result<TranslationResult, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail_first.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1)).is_ok() {
            return Err(ProviderError::new(&self.name, FailureReason::ServiceUnavailable, "warming up"));
        }
        if !self.up.load(Ordering::SeqCst) {
            return Err(ProviderError::new(&self.name, self.failure, "scripted outage"));
        }
        Ok(TranslationResult::new(
            format!("{text} ({target_lang} via {})", self.name),
            &self.name,
            0.9,
            self.cost,
            self.delay,
        ))
    }

    fn estimate_cost(&self, _text: &str, _source_lang: &str, _target_lang: &str) -> f64 {
        self.cost
    }

    fn supported_languages(&self) -> BTreeSet<String> {
        self.languages.iter().map(|l| (*l).to_string()).collect()
    }

    async fn health_check(&self) -> bool {
        if !self.health_delay.is_zero() {
            tokio::time::sleep(self.health_delay).await;
        }
        self.up.load(Ordering::SeqCst)
    }
}

/// Breaker thresholds with a recovery timeout short enough for tests.
pub fn fast_breaker(failure_threshold: u32, recovery_timeout: Duration) -> BreakerConfig {
    BreakerConfig { failure_threshold, recovery_timeout, ..BreakerConfig::default() }
}
