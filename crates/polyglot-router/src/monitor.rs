//! Performance monitoring for routing operations.
//!
//! Every provider call, cache lookup, and degraded fallback is recorded as a
//! [`MetricSample`]. Totals are kept for the process lifetime; latency
//! percentiles come from a bounded window of the most recent samples per
//! (operation, provider) series.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Operation name for a provider call.
pub const OP_TRANSLATE: &str = "translate";
/// Operation name for a cache lookup; success means hit.
pub const OP_CACHE_LOOKUP: &str = "cache_lookup";
/// Operation name for the degraded fallback path.
pub const OP_FALLBACK: &str = "fallback";

/// Default number of latency samples kept per series.
pub const DEFAULT_WINDOW: usize = 1024;

/// A single timed operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    /// Operation name, e.g. [`OP_TRANSLATE`].
    pub operation: String,
    /// Provider involved, if any.
    pub provider: Option<String>,
    /// How long it took.
    pub duration: Duration,
    /// Whether it succeeded.
    pub success: bool,
    /// When it finished.
    pub timestamp: DateTime<Utc>,
}

impl MetricSample {
    /// Creates a sample stamped now.
    pub fn new(
        operation: impl Into<String>,
        provider: Option<&str>,
        duration: Duration,
        success: bool,
    ) -> Self {
        Self {
            operation: operation.into(),
            provider: provider.map(str::to_string),
            duration,
            success,
            timestamp: Utc::now(),
        }
    }
}

/// Latency percentiles in milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Percentiles {
    /// 50th percentile (median).
    pub p50: f64,
    /// 95th percentile.
    pub p95: f64,
    /// 99th percentile.
    pub p99: f64,
}

/// Aggregated statistics for one (operation, provider) series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationStats {
    /// Operation name.
    pub operation: String,
    /// Provider, if the series is per provider.
    pub provider: Option<String>,
    /// Samples recorded.
    pub count: u64,
    /// Successful samples.
    pub successes: u64,
    /// Failed samples.
    pub failures: u64,
    /// `successes / count`, 0 when empty.
    pub success_rate: f64,
    /// Mean latency over all samples, in milliseconds.
    pub mean_ms: f64,
    /// Percentiles over the recent window.
    pub latency_ms: Percentiles,
    /// Most recent sample time.
    pub last_recorded: Option<DateTime<Utc>>,
}

/// Point-in-time view of the monitor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorSnapshot {
    /// One entry per series, ordered by operation then provider.
    pub operations: Vec<OperationStats>,
    /// Requests answered by the degraded fallback.
    pub degraded_outcomes: u64,
    /// Estimated spend per provider in USD.
    pub cost_by_provider: BTreeMap<String, f64>,
    /// Estimated spend across providers in USD.
    pub total_cost: f64,
    /// When the snapshot was taken.
    pub taken_at: DateTime<Utc>,
}

impl MonitorSnapshot {
    /// Stats for one series, if any samples were recorded.
    pub fn operation(&self, operation: &str, provider: Option<&str>) -> Option<&OperationStats> {
        self.operations
            .iter()
            .find(|s| s.operation == operation && s.provider.as_deref() == provider)
    }
}

type SeriesKey = (String, Option<String>);

#[derive(Debug, Default, Clone)]
struct Series {
    count: u64,
    successes: u64,
    total_ms: f64,
    recent_ms: VecDeque<f64>,
    last_recorded: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
struct MonitorState {
    series: BTreeMap<SeriesKey, Series>,
    degraded_outcomes: u64,
    cost_by_provider: BTreeMap<String, f64>,
}

/// Thread-safe collector of operation timings.
///
/// Writers hold the lock only to append a sample. A snapshot copies the
/// bounded windows under the lock and sorts them after releasing it.
#[derive(Debug)]
pub struct PerformanceMonitor {
    window: usize,
    state: Mutex<MonitorState>,
}

impl Default for PerformanceMonitor {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

impl PerformanceMonitor {
    /// Creates a monitor keeping `window` recent samples per series.
    pub fn new(window: usize) -> Self {
        Self { window: window.max(1), state: Mutex::new(MonitorState::default()) }
    }

    fn lock(&self) -> MutexGuard<'_, MonitorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records one operation.
    pub fn record_operation(
        &self,
        operation: &str,
        provider: Option<&str>,
        duration: Duration,
        success: bool,
    ) {
        self.record(MetricSample::new(operation, provider, duration, success));
    }

    /// Records a prepared sample.
    pub fn record(&self, sample: MetricSample) {
        let ms = sample.duration.as_secs_f64() * 1000.0;
        let mut state = self.lock();
        let series = state.series.entry((sample.operation, sample.provider)).or_default();
        series.count += 1;
        if sample.success {
            series.successes += 1;
        }
        series.total_ms += ms;
        if series.recent_ms.len() == self.window {
            series.recent_ms.pop_front();
        }
        series.recent_ms.push_back(ms);
        series.last_recorded = Some(sample.timestamp);
    }

    /// Counts a request answered by the degraded fallback.
    pub fn record_degraded(&self) {
        self.lock().degraded_outcomes += 1;
    }

    /// Adds to a provider's estimated spend.
    pub fn record_cost(&self, provider: &str, cost: f64) {
        if !cost.is_finite() || cost <= 0.0 {
            return;
        }
        let mut state = self.lock();
        *state.cost_by_provider.entry(provider.to_string()).or_insert(0.0) += cost;
    }

    /// Aggregated statistics.
    pub fn snapshot(&self) -> MonitorSnapshot {
        let (series, degraded_outcomes, cost_by_provider) = {
            let state = self.lock();
            (state.series.clone(), state.degraded_outcomes, state.cost_by_provider.clone())
        };

        let operations = series
            .into_iter()
            .map(|((operation, provider), s)| {
                let mut recent: Vec<f64> = s.recent_ms.into_iter().collect();
                recent.sort_by(f64::total_cmp);
                OperationStats {
                    operation,
                    provider,
                    count: s.count,
                    successes: s.successes,
                    failures: s.count - s.successes,
                    success_rate: if s.count == 0 { 0.0 } else { s.successes as f64 / s.count as f64 },
                    mean_ms: if s.count == 0 { 0.0 } else { s.total_ms / s.count as f64 },
                    latency_ms: Percentiles {
                        p50: percentile(&recent, 0.50),
                        p95: percentile(&recent, 0.95),
                        p99: percentile(&recent, 0.99),
                    },
                    last_recorded: s.last_recorded,
                }
            })
            .collect();

        let total_cost = cost_by_provider.values().sum();
        MonitorSnapshot {
            operations,
            degraded_outcomes,
            cost_by_provider,
            total_cost,
            taken_at: Utc::now(),
        }
    }

    /// The snapshot as a JSON document.
    ///
    /// # Errors
    /// Returns an error if serialisation fails.
    pub fn snapshot_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.snapshot())
    }

    /// Drops every sample and counter.
    pub fn reset(&self) {
        *self.lock() = MonitorState::default();
    }
}

/// Calculates a percentile value from a sorted slice.
fn percentile(sorted_values: &[f64], percentile: f64) -> f64 {
    if sorted_values.is_empty() {
        return 0.0;
    }
    let index = ((sorted_values.len() - 1) as f64 * percentile).ceil() as usize;
    sorted_values[index.min(sorted_values.len() - 1)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_percentile_calculation() {
        let values: Vec<f64> = (1..=100).map(f64::from).collect();
        assert_eq!(percentile(&values, 0.50), 51.0);
        assert_eq!(percentile(&values, 0.95), 96.0);
        assert_eq!(percentile(&values, 0.99), 100.0);
        assert_eq!(percentile(&[], 0.5), 0.0);
        assert_eq!(percentile(&[7.0], 0.99), 7.0);
    }

    #[test]
    fn test_counts_and_success_rate() {
        let monitor = PerformanceMonitor::default();
        monitor.record_operation(OP_TRANSLATE, Some("deepl"), Duration::from_millis(10), true);
        monitor.record_operation(OP_TRANSLATE, Some("deepl"), Duration::from_millis(30), false);
        monitor.record_operation(OP_TRANSLATE, Some("google"), Duration::from_millis(20), true);

        let snapshot = monitor.snapshot();
        let deepl = snapshot.operation(OP_TRANSLATE, Some("deepl")).unwrap();
        assert_eq!(deepl.count, 2);
        assert_eq!(deepl.successes, 1);
        assert_eq!(deepl.failures, 1);
        assert!((deepl.success_rate - 0.5).abs() < f64::EPSILON);
        assert!((deepl.mean_ms - 20.0).abs() < 1e-9);
        assert!(snapshot.operation(OP_TRANSLATE, Some("google")).is_some());
        assert!(snapshot.operation(OP_TRANSLATE, None).is_none());
    }

    #[test]
    fn test_window_bounds_percentiles_not_totals() {
        let monitor = PerformanceMonitor::new(2);
        monitor.record_operation("op", None, Duration::from_millis(100), true);
        monitor.record_operation("op", None, Duration::from_millis(1), true);
        monitor.record_operation("op", None, Duration::from_millis(1), true);

        let snapshot = monitor.snapshot();
        let stats = snapshot.operation("op", None).unwrap();
        assert_eq!(stats.count, 3);
        assert!((stats.latency_ms.p99 - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_degraded_and_cost() {
        let monitor = PerformanceMonitor::default();
        monitor.record_degraded();
        monitor.record_cost("deepl", 0.02);
        monitor.record_cost("deepl", 0.01);
        monitor.record_cost("mock_fallback", 0.0);

        let snapshot = monitor.snapshot();
        assert_eq!(snapshot.degraded_outcomes, 1);
        assert!((snapshot.cost_by_provider["deepl"] - 0.03).abs() < 1e-12);
        assert!(!snapshot.cost_by_provider.contains_key("mock_fallback"));
        assert!((snapshot.total_cost - 0.03).abs() < 1e-12);
    }

    #[test]
    fn test_snapshot_json_and_reset() {
        let monitor = PerformanceMonitor::default();
        monitor.record_operation(OP_CACHE_LOOKUP, None, Duration::from_micros(50), true);

        let json: serde_json::Value = serde_json::from_str(&monitor.snapshot_json().unwrap()).unwrap();
        assert_eq!(json["operations"][0]["operation"], "cache_lookup");
        assert!(json["operations"][0]["latency_ms"]["p95"].is_number());

        monitor.reset();
        assert!(monitor.snapshot().operations.is_empty());
    }

    #[test]
    fn test_concurrent_writers() {
        let monitor = Arc::new(PerformanceMonitor::default());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let monitor = Arc::clone(&monitor);
                thread::spawn(move || {
                    for _ in 0..100 {
                        monitor.record_operation(OP_TRANSLATE, Some("p"), Duration::from_millis(1), true);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(monitor.snapshot().operation(OP_TRANSLATE, Some("p")).unwrap().count, 800);
    }
}
