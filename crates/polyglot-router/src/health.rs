//! Provider health tracking.
//!
//! Health has two inputs: explicit probes (`Router::check_health`) and the
//! outcome of every real call. Call outcomes feed a sliding-window error
//! rate used to order candidates. Outcomes are counted in a fixed number of
//! time buckets per window, so memory and read cost do not grow with traffic.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};
use tracing::debug;

/// Default sliding window for the error rate.
pub const DEFAULT_HEALTH_WINDOW: Duration = Duration::from_secs(300);

/// Buckets per window.
const BUCKETS_PER_WINDOW: u32 = 60;

/// Health view of one provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderHealth {
    /// Provider identifier.
    pub provider: String,
    /// Result of the last probe. `true` until a probe says otherwise.
    pub healthy: bool,
    /// When the last probe ran.
    pub last_checked: Option<DateTime<Utc>>,
    /// Failed fraction of calls in the window.
    pub error_rate: f64,
}

/// Call outcomes counted over one slice of the window.
#[derive(Debug, Clone, Copy)]
struct Bucket {
    started: Instant,
    successes: u64,
    failures: u64,
}

#[derive(Debug)]
struct HealthRecord {
    healthy: bool,
    last_checked: Option<DateTime<Utc>>,
    /// Oldest first. At most `BUCKETS_PER_WINDOW + 1` live buckets.
    buckets: VecDeque<Bucket>,
}

impl HealthRecord {
    fn new() -> Self {
        Self { healthy: true, last_checked: None, buckets: VecDeque::new() }
    }

    fn record(&mut self, success: bool, window: Duration) {
        let width = (window / BUCKETS_PER_WINDOW).max(Duration::from_millis(1));
        let now = Instant::now();
        if !self.buckets.back().is_some_and(|b| now.duration_since(b.started) < width) {
            self.buckets.push_back(Bucket { started: now, successes: 0, failures: 0 });
            self.cleanup(window);
        }
        let Some(bucket) = self.buckets.back_mut() else {
            return;
        };
        if success {
            bucket.successes += 1;
        } else {
            bucket.failures += 1;
        }
    }

    fn cleanup(&mut self, window: Duration) {
        while self.buckets.front().is_some_and(|b| b.started.elapsed() > window) {
            self.buckets.pop_front();
        }
    }

    fn error_rate(&self, window: Duration) -> f64 {
        let (successes, failures) = self
            .buckets
            .iter()
            .filter(|b| b.started.elapsed() <= window)
            .fold((0, 0), |(s, f), b| (s + b.successes, f + b.failures));
        let total = successes + failures;
        if total == 0 {
            0.0
        } else {
            failures as f64 / total as f64
        }
    }

    fn report(&self, provider: &str, window: Duration) -> ProviderHealth {
        ProviderHealth {
            provider: provider.to_string(),
            healthy: self.healthy,
            last_checked: self.last_checked,
            error_rate: self.error_rate(window),
        }
    }
}

/// Per-provider health, shared by all in-flight requests.
#[derive(Debug)]
pub struct HealthRegistry {
    window: Duration,
    records: RwLock<HashMap<String, HealthRecord>>,
}

impl Default for HealthRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_HEALTH_WINDOW)
    }
}

impl HealthRegistry {
    /// Creates a registry with the given error-rate window.
    pub fn new(window: Duration) -> Self {
        Self { window, records: RwLock::new(HashMap::new()) }
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, HealthRecord>> {
        self.records.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, HealthRecord>> {
        self.records.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers `provider` so it appears in reports before any traffic.
    pub fn register(&self, provider: &str) {
        self.write().entry(provider.to_string()).or_insert_with(HealthRecord::new);
    }

    /// Records the outcome of a real call.
    pub fn record_outcome(&self, provider: &str, success: bool) {
        let mut records = self.write();
        let record = records.entry(provider.to_string()).or_insert_with(HealthRecord::new);
        record.record(success, self.window);
    }

    /// Records the result of a probe.
    pub fn record_check(&self, provider: &str, healthy: bool) {
        let mut records = self.write();
        let record = records.entry(provider.to_string()).or_insert_with(HealthRecord::new);
        if record.healthy != healthy {
            debug!(provider, healthy, "Provider health changed");
        }
        record.healthy = healthy;
        record.last_checked = Some(Utc::now());
    }

    /// Current error rate for `provider`, 0 when unknown.
    pub fn error_rate(&self, provider: &str) -> f64 {
        self.read().get(provider).map_or(0.0, |r| r.error_rate(self.window))
    }

    /// Whether the last probe found `provider` healthy. Unknown counts as healthy.
    pub fn is_healthy(&self, provider: &str) -> bool {
        self.read().get(provider).is_none_or(|r| r.healthy)
    }

    /// Health of one provider.
    pub fn get(&self, provider: &str) -> Option<ProviderHealth> {
        self.read().get(provider).map(|r| r.report(provider, self.window))
    }

    /// Health of every known provider, sorted by name.
    pub fn all(&self) -> Vec<ProviderHealth> {
        let mut report: Vec<ProviderHealth> =
            self.read().iter().map(|(name, r)| r.report(name, self.window)).collect();
        report.sort_by(|a, b| a.provider.cmp(&b.provider));
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_unknown_provider_is_healthy_with_zero_error_rate() {
        let registry = HealthRegistry::default();
        assert!(registry.is_healthy("deepl"));
        assert_eq!(registry.error_rate("deepl"), 0.0);
        assert!(registry.get("deepl").is_none());
    }

    #[test]
    fn test_error_rate_from_outcomes() {
        let registry = HealthRegistry::default();
        registry.record_outcome("deepl", true);
        registry.record_outcome("deepl", false);
        registry.record_outcome("deepl", false);
        registry.record_outcome("deepl", true);
        assert!((registry.error_rate("deepl") - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_outcomes_leave_the_window() {
        let registry = HealthRegistry::new(Duration::from_millis(20));
        registry.record_outcome("deepl", false);
        thread::sleep(Duration::from_millis(40));
        assert_eq!(registry.error_rate("deepl"), 0.0);
    }

    #[test]
    fn test_heavy_traffic_keeps_bucket_count_bounded() {
        let registry = HealthRegistry::new(Duration::from_millis(30));
        let started = Instant::now();
        while started.elapsed() < Duration::from_millis(100) {
            registry.record_outcome("deepl", true);
        }
        registry.record_outcome("deepl", false);

        let buckets = registry.read().get("deepl").unwrap().buckets.len();
        assert!(buckets <= BUCKETS_PER_WINDOW as usize + 1, "{buckets} buckets");
        let rate = registry.error_rate("deepl");
        assert!(rate > 0.0 && rate < 0.5);
    }

    #[test]
    fn test_probe_results() {
        let registry = HealthRegistry::default();
        registry.register("google");
        registry.record_check("deepl", false);

        assert!(!registry.is_healthy("deepl"));
        let deepl = registry.get("deepl").unwrap();
        assert!(deepl.last_checked.is_some());

        let all = registry.all();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].provider, "deepl");
        assert!(all[1].healthy);
        assert!(all[1].last_checked.is_none());
    }
}
