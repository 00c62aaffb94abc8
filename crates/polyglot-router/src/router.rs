//! Request routing across translation providers.
//!
//! The [`Router`] owns one [`CircuitBreaker`] per provider, the shared
//! [`TranslationCache`], the [`PerformanceMonitor`], and the health registry.
//! Build it once at startup and share it behind an `Arc`; every method takes
//! `&self`.

use crate::cache::{CacheError, CacheKey, CacheStats, TranslationCache};
use crate::circuit_breaker::{BreakerConfig, BreakerSnapshot, CircuitBreaker, CircuitState, Permit};
use crate::config::RouterConfig;
use crate::error::{FailureRecord, RouterError};
use crate::health::{HealthRegistry, ProviderHealth};
use crate::monitor::{MonitorSnapshot, OP_CACHE_LOOKUP, OP_FALLBACK, OP_TRANSLATE, PerformanceMonitor};
use crate::ordering::Candidate;
use crate::quality::{QualityReport, QualityValidator};
use futures::future::join_all;
use polyglot_abstraction::{
    FALLBACK_PROVIDER_NAME, FailureReason, Provider, ProviderError, TranslationRequest,
    TranslationResult,
};
use polyglot_providers::{
    FactoryError, HEALTH_CHECK_TIMEOUT, MockProvider, ProviderConfig, ProviderFactory,
};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// A registered provider and its breaker.
struct ProviderSlot {
    provider: Arc<dyn Provider>,
    priority: u32,
    cost_weight: f64,
    breaker: CircuitBreaker,
}

impl ProviderSlot {
    fn name(&self) -> &str {
        self.provider.name()
    }
}

/// Everything the router exposes for monitoring.
#[derive(Debug, Clone, Serialize)]
pub struct RouterStats {
    /// Cache counters.
    pub cache: CacheStats,
    /// One snapshot per provider breaker, in registration order.
    pub breakers: Vec<BreakerSnapshot>,
    /// Operation latencies, degraded outcomes, and spend.
    pub monitor: MonitorSnapshot,
    /// Probe results and error rates, sorted by provider.
    pub health: Vec<ProviderHealth>,
}

/// A registered provider as listed by [`Router::providers`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderInfo {
    /// Provider identifier.
    pub name: String,
    /// Lower is tried first.
    pub priority: u32,
    /// Multiplier applied to the provider's cost estimate.
    pub cost_weight: f64,
    /// Number of supported language tags. Zero means "any".
    pub supported_languages: usize,
    /// Breaker state.
    pub state: CircuitState,
}

/// How a single provider's turn in the fallback chain ended.
enum Attempt {
    Success(TranslationResult),
    Failed,
    DeadlineExceeded,
}

/// Routes translation requests to the best available provider.
pub struct Router {
    config: RouterConfig,
    breaker_config: BreakerConfig,
    providers: Vec<ProviderSlot>,
    fallback: Arc<dyn Provider>,
    cache: TranslationCache,
    monitor: PerformanceMonitor,
    health: HealthRegistry,
    validator: QualityValidator,
    health_check_timeout: Duration,
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("providers", &self.providers.iter().map(ProviderSlot::name).collect::<Vec<_>>())
            .field("fallback", &self.fallback.name())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Router {
    /// Creates a router with no providers and the mock fallback.
    #[must_use]
    pub fn new(config: RouterConfig) -> Self {
        let cache = TranslationCache::new(config.cache.capacity);
        let health = HealthRegistry::new(config.health_window());
        let validator = QualityValidator::new(config.quality.clone());
        Self {
            breaker_config: config.breaker.to_breaker_config(),
            config,
            providers: Vec::new(),
            fallback: Arc::new(MockProvider::fallback()),
            cache,
            monitor: PerformanceMonitor::default(),
            health,
            validator,
            health_check_timeout: HEALTH_CHECK_TIMEOUT,
        }
    }

    /// Builds a router from provider entries, skipping disabled ones.
    ///
    /// # Errors
    /// Returns [`FactoryError`] for the first entry that cannot be built.
    pub fn from_configs(
        config: RouterConfig,
        providers: &[ProviderConfig],
    ) -> Result<Self, FactoryError> {
        let mut router = Self::new(config);
        for entry in providers {
            if !entry.enabled {
                debug!(provider = %entry.name, "Skipping disabled provider");
                continue;
            }
            let provider = ProviderFactory::create(entry)?;
            router = router.with_provider(provider, entry.priority, entry.cost_weight);
        }
        Ok(router)
    }

    /// Registers a provider with its own breaker.
    ///
    /// Names must be non-empty, unique, and not the reserved fallback name;
    /// offending providers are ignored with a warning.
    #[must_use]
    pub fn with_provider(mut self, provider: Arc<dyn Provider>, priority: u32, cost_weight: f64) -> Self {
        let name = provider.name().to_string();
        if name.is_empty() {
            warn!("Provider has no name, ignoring");
            return self;
        }
        if name == FALLBACK_PROVIDER_NAME {
            warn!(provider = %name, "Provider name is reserved for the fallback, ignoring");
            return self;
        }
        if self.providers.iter().any(|slot| slot.name() == name) {
            warn!(provider = %name, "Provider already registered, ignoring duplicate");
            return self;
        }

        let cost_weight = if cost_weight.is_finite() && cost_weight >= 0.0 { cost_weight } else { 1.0 };
        let breaker = CircuitBreaker::new(name.clone(), self.breaker_config);
        self.health.register(&name);
        info!(provider = %name, priority, cost_weight, "Registered provider");
        self.providers.push(ProviderSlot { provider, priority, cost_weight, breaker });
        self
    }

    /// Replaces the degraded-mode fallback. Its answers are reported under
    /// the reserved fallback name whatever the provider calls itself.
    #[must_use]
    pub fn with_fallback(mut self, fallback: Arc<dyn Provider>) -> Self {
        self.fallback = fallback;
        self
    }

    /// Replaces the breaker thresholds for every provider, registered or not.
    /// Existing breakers start over CLOSED.
    #[must_use]
    pub fn with_breaker_config(mut self, breaker_config: BreakerConfig) -> Self {
        self.breaker_config = breaker_config;
        for slot in &mut self.providers {
            slot.breaker = CircuitBreaker::new(slot.provider.name().to_string(), breaker_config);
        }
        self
    }

    /// Overrides the bound on each health probe.
    #[must_use]
    pub fn with_health_check_timeout(mut self, timeout: Duration) -> Self {
        self.health_check_timeout = timeout;
        self
    }

    /// Router configuration.
    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Translates `request`.
    ///
    /// Answers from the cache when possible, otherwise tries providers one at
    /// a time in policy order. When all of them fail the degraded fallback
    /// answers, unless strict mode applies.
    ///
    /// # Errors
    /// - [`RouterError::Timeout`] if the overall deadline expires.
    /// - [`RouterError::AllProvidersFailed`] if every candidate failed and the
    ///   fallback is disabled or strict mode applies.
    pub async fn translate(&self, request: &TranslationRequest) -> Result<TranslationResult, RouterError> {
        let started = Instant::now();
        let budget = request.deadline().unwrap_or_else(|| self.config.timeouts.per_request());
        let key = CacheKey::for_request(request);

        if self.config.cache.enabled {
            let lookup = Instant::now();
            let hit = self.cache.get(&key);
            self.monitor.record_operation(OP_CACHE_LOOKUP, None, lookup.elapsed(), hit.is_some());
            if let Some(result) = hit {
                debug!(key = %key, provider = %result.provider, "Served from cache");
                return Ok(result);
            }
        }

        let mut failures = Vec::new();
        for index in self.candidates(request, &mut failures) {
            let slot = &self.providers[index];
            match self.attempt(slot, request, started, budget, &mut failures).await {
                Attempt::Success(result) => {
                    if self.config.cache.enabled && !result.is_degraded() {
                        let ttl = self.config.cache.ttl_for(result.confidence);
                        self.cache.put(key, result.clone(), ttl);
                    }
                    return Ok(result);
                }
                Attempt::Failed => {}
                Attempt::DeadlineExceeded => {
                    let elapsed = started.elapsed();
                    warn!(elapsed_ms = elapsed.as_millis() as u64, "Request deadline exceeded");
                    return Err(RouterError::Timeout { elapsed });
                }
            }
        }

        self.degrade(request, failures).await
    }

    /// Providers to try for `request`, in attempt order.
    ///
    /// Providers that cannot handle the language pair are recorded as a
    /// permanent failure. Providers whose breaker would reject the call are
    /// recorded and skipped.
    fn candidates(&self, request: &TranslationRequest, failures: &mut Vec<FailureRecord>) -> Vec<usize> {
        let (source, target) = (request.source_lang(), request.target_lang());
        let mut candidates = Vec::with_capacity(self.providers.len());

        for (index, slot) in self.providers.iter().enumerate() {
            if !slot.provider.supports_pair(source, target) {
                debug!(provider = %slot.name(), source, target, "Language pair not supported");
                failures.push(FailureRecord::from(&ProviderError::permanent(
                    slot.name(),
                    FailureReason::UnsupportedLanguagePair,
                    format!("{source} -> {target} not supported"),
                )));
                continue;
            }
            if !slot.breaker.would_admit() {
                debug!(provider = %slot.name(), "Circuit open, skipping provider");
                failures.push(FailureRecord::circuit_open(slot.name()));
                continue;
            }
            candidates.push(Candidate {
                index,
                name: slot.name().to_string(),
                priority: slot.priority,
                weighted_cost: slot.provider.estimate_cost(request.text(), source, target)
                    * slot.cost_weight,
                error_rate: self.health.error_rate(slot.name()),
                healthy: self.health.is_healthy(slot.name()),
            });
        }

        self.config.ordering.sort(&mut candidates);
        candidates.into_iter().map(|c| c.index).collect()
    }

    /// One provider's turn, including retries.
    async fn attempt(
        &self,
        slot: &ProviderSlot,
        request: &TranslationRequest,
        started: Instant,
        budget: Duration,
        failures: &mut Vec<FailureRecord>,
    ) -> Attempt {
        let name = slot.name();
        let mut retry = 0;

        loop {
            let remaining = budget.saturating_sub(started.elapsed());
            if remaining.is_zero() {
                return Attempt::DeadlineExceeded;
            }

            // Another request may have tripped the breaker since ordering.
            let Ok(permit) = slot.breaker.try_acquire() else {
                failures.push(FailureRecord::circuit_open(name));
                return Attempt::Failed;
            };

            let limit = self.config.timeouts.per_call().min(remaining);
            let call_started = Instant::now();
            let outcome = tokio::time::timeout(
                limit,
                slot.provider.translate(request.text(), request.source_lang(), request.target_lang()),
            )
            .await
            .unwrap_or_else(|_| Err(ProviderError::timeout(name, limit)));
            let elapsed = call_started.elapsed();

            let err = match outcome {
                Ok(mut result) => {
                    // The registered name is authoritative for metrics, breakers, and the cache.
                    if result.provider != name {
                        debug!(provider = %name, reported = %result.provider, "Provider mislabelled its result");
                        result.provider = name.to_string();
                    }
                    self.on_success(slot, permit, &result, elapsed);
                    return Attempt::Success(result);
                }
                Err(err) => err,
            };

            self.monitor.record_operation(OP_TRANSLATE, Some(name), elapsed, false);
            failures.push(FailureRecord::from(&err));

            if !err.is_transient() {
                slot.breaker.record_neutral(permit);
                debug!(provider = %name, reason = %err.reason, error = %err.message, "Permanent provider failure");
                return Attempt::Failed;
            }

            slot.breaker.record_failure(permit);
            self.health.record_outcome(name, false);
            warn!(provider = %name, reason = %err.reason, error = %err.message, "Transient provider failure");

            if started.elapsed() >= budget {
                return Attempt::DeadlineExceeded;
            }
            if !self.config.retry.allows_retry(retry) {
                return Attempt::Failed;
            }
            let delay = self.config.retry.delay_for_attempt(retry);
            if started.elapsed() + delay >= budget || !slot.breaker.would_admit() {
                return Attempt::Failed;
            }
            retry += 1;
            debug!(provider = %name, retry, delay_ms = delay.as_millis() as u64, "Retrying provider");
            tokio::time::sleep(delay).await;
        }
    }

    fn on_success(&self, slot: &ProviderSlot, permit: Permit, result: &TranslationResult, elapsed: Duration) {
        let name = slot.name();
        slot.breaker.record_success(permit);
        self.health.record_outcome(name, true);
        self.monitor.record_operation(OP_TRANSLATE, Some(name), elapsed, true);
        self.monitor.record_cost(name, result.cost);
        debug!(
            provider = %name,
            latency_ms = elapsed.as_millis() as u64,
            confidence = result.confidence,
            "Provider succeeded"
        );
    }

    /// Last resort once every candidate has failed.
    async fn degrade(
        &self,
        request: &TranslationRequest,
        mut failures: Vec<FailureRecord>,
    ) -> Result<TranslationResult, RouterError> {
        if request.is_strict() || self.config.strict_mode || !self.config.fallback_enabled {
            warn!(failures = failures.len(), "All providers failed");
            return Err(RouterError::AllProvidersFailed { failures });
        }

        warn!(
            failures = failures.len(),
            fallback = %self.fallback.name(),
            "All providers failed, answering in degraded mode"
        );

        let limit = self.config.timeouts.per_call();
        let started = Instant::now();
        let outcome = tokio::time::timeout(
            limit,
            self.fallback.translate(request.text(), request.source_lang(), request.target_lang()),
        )
        .await
        .unwrap_or_else(|_| Err(ProviderError::timeout(self.fallback.name(), limit)));
        let elapsed = started.elapsed();

        match outcome {
            Ok(mut result) => {
                result.provider = FALLBACK_PROVIDER_NAME.to_string();
                self.monitor.record_degraded();
                self.monitor.record_operation(OP_FALLBACK, Some(self.fallback.name()), elapsed, true);
                Ok(result)
            }
            Err(err) => {
                self.monitor.record_operation(OP_FALLBACK, Some(self.fallback.name()), elapsed, false);
                failures.push(FailureRecord::from(&err));
                Err(RouterError::AllProvidersFailed { failures })
            }
        }
    }

    /// Probes every provider concurrently, each bounded in time, and records
    /// the results. A probe that times out counts as unhealthy.
    pub async fn check_health(&self) -> Vec<ProviderHealth> {
        let limit = self.health_check_timeout;
        let probes = self.providers.iter().map(|slot| async move {
            let healthy = tokio::time::timeout(limit, slot.provider.health_check())
                .await
                .unwrap_or(false);
            (slot.name(), healthy)
        });

        for (name, healthy) in join_all(probes).await {
            if !healthy {
                warn!(provider = %name, "Health check failed");
            }
            self.health.record_check(name, healthy);
        }
        self.health.all()
    }

    /// Loads a saved cache snapshot. Failures are logged and leave the cache
    /// as it was. Returns the number of entries loaded.
    pub fn warm_cache(&self, path: &Path) -> usize {
        match self.cache.load_from(path) {
            Ok(loaded) => loaded,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "Could not warm cache, starting cold");
                0
            }
        }
    }

    /// Saves the live cache entries to `path`.
    ///
    /// # Errors
    /// Returns [`CacheError`] if the snapshot cannot be written.
    pub fn save_cache(&self, path: &Path) -> Result<usize, CacheError> {
        self.cache.save_to(path)
    }

    /// The shared translation cache.
    pub fn cache(&self) -> &TranslationCache {
        &self.cache
    }

    /// The shared performance monitor.
    pub fn monitor(&self) -> &PerformanceMonitor {
        &self.monitor
    }

    /// Scores a translation with the configured validator.
    pub fn validate_quality(&self, original: &str, intermediate: &str, final_text: &str) -> QualityReport {
        self.validator.validate(original, intermediate, final_text)
    }

    /// Breaker state for `provider`, if registered.
    pub fn breaker_state(&self, provider: &str) -> Option<CircuitState> {
        self.slot(provider).map(|slot| slot.breaker.state())
    }

    /// Full breaker view for `provider`, if registered.
    pub fn breaker_snapshot(&self, provider: &str) -> Option<BreakerSnapshot> {
        self.slot(provider).map(|slot| slot.breaker.snapshot())
    }

    /// Registered providers in registration order.
    pub fn providers(&self) -> Vec<ProviderInfo> {
        self.providers
            .iter()
            .map(|slot| ProviderInfo {
                name: slot.name().to_string(),
                priority: slot.priority,
                cost_weight: slot.cost_weight,
                supported_languages: slot.provider.supported_languages().len(),
                state: slot.breaker.state(),
            })
            .collect()
    }

    /// Everything worth exporting to a monitoring collector.
    pub fn stats(&self) -> RouterStats {
        RouterStats {
            cache: self.cache.stats(),
            breakers: self.providers.iter().map(|slot| slot.breaker.snapshot()).collect(),
            monitor: self.monitor.snapshot(),
            health: self.health.all(),
        }
    }

    /// [`Router::stats`] as a JSON document.
    ///
    /// # Errors
    /// Returns an error if serialisation fails.
    pub fn stats_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.stats())
    }

    fn slot(&self, provider: &str) -> Option<&ProviderSlot> {
        self.providers.iter().find(|slot| slot.name() == provider)
    }
}
