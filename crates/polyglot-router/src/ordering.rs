//! Candidate ordering for the fallback chain.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// How candidates are ordered for a request. Ties always end on the name so
/// the order is reproducible.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderingPolicy {
    /// Declared priority, then weighted cost, then error rate.
    #[default]
    Priority,
    /// Weighted cost, then priority, then error rate.
    Cost,
    /// Healthy first, then error rate, then priority, then weighted cost.
    Health,
}

/// What the ordering looks at for one provider.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// Position in the router's provider list.
    pub index: usize,
    /// Provider name.
    pub name: String,
    /// Lower is tried first.
    pub priority: u32,
    /// Estimated cost times the provider's cost weight.
    pub weighted_cost: f64,
    /// Recent failure ratio.
    pub error_rate: f64,
    /// Last probe result.
    pub healthy: bool,
}

impl OrderingPolicy {
    /// Sorts `candidates` in attempt order.
    pub fn sort(self, candidates: &mut [Candidate]) {
        candidates.sort_by(|a, b| self.compare(a, b));
    }

    fn compare(self, a: &Candidate, b: &Candidate) -> Ordering {
        let priority = || a.priority.cmp(&b.priority);
        let cost = || a.weighted_cost.total_cmp(&b.weighted_cost);
        let errors = || a.error_rate.total_cmp(&b.error_rate);
        let name = || a.name.cmp(&b.name);

        match self {
            Self::Priority => priority().then_with(cost).then_with(errors).then_with(name),
            Self::Cost => cost().then_with(priority).then_with(errors).then_with(name),
            Self::Health => b
                .healthy
                .cmp(&a.healthy)
                .then_with(errors)
                .then_with(priority)
                .then_with(cost)
                .then_with(name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(name: &str, priority: u32, cost: f64, error_rate: f64, healthy: bool) -> Candidate {
        Candidate {
            index: 0,
            name: name.to_string(),
            priority,
            weighted_cost: cost,
            error_rate,
            healthy,
        }
    }

    fn names(candidates: &[Candidate]) -> Vec<&str> {
        candidates.iter().map(|c| c.name.as_str()).collect()
    }

    fn sample() -> Vec<Candidate> {
        vec![
            candidate("google", 2, 0.001, 0.0, true),
            candidate("flash", 2, 0.0001, 0.5, false),
            candidate("deepl", 1, 0.002, 0.1, true),
        ]
    }

    #[test]
    fn test_priority_policy() {
        let mut c = sample();
        OrderingPolicy::Priority.sort(&mut c);
        assert_eq!(names(&c), ["deepl", "flash", "google"]);
    }

    #[test]
    fn test_cost_policy() {
        let mut c = sample();
        OrderingPolicy::Cost.sort(&mut c);
        assert_eq!(names(&c), ["flash", "google", "deepl"]);
    }

    #[test]
    fn test_health_policy() {
        let mut c = sample();
        OrderingPolicy::Health.sort(&mut c);
        assert_eq!(names(&c), ["google", "deepl", "flash"]);
    }

    #[test]
    fn test_identical_candidates_ordered_by_name() {
        let mut c = vec![
            candidate("zeta", 1, 0.0, 0.0, true),
            candidate("alpha", 1, 0.0, 0.0, true),
            candidate("mid", 1, 0.0, 0.0, true),
        ];
        OrderingPolicy::Priority.sort(&mut c);
        assert_eq!(names(&c), ["alpha", "mid", "zeta"]);
    }

    #[test]
    fn test_policy_names() {
        assert_eq!(serde_json::to_value(OrderingPolicy::Health).unwrap(), "health");
        let parsed: OrderingPolicy = serde_json::from_str("\"cost\"").unwrap();
        assert_eq!(parsed, OrderingPolicy::Cost);
    }
}
