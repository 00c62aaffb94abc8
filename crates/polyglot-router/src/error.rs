//! Router error types.

use polyglot_abstraction::{ErrorKind, FailureReason, ProviderError, RequestError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// One failed attempt recorded while walking the fallback chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRecord {
    /// Provider that failed or was skipped.
    pub provider: String,
    /// Transient or permanent.
    pub kind: ErrorKind,
    /// Why it failed.
    pub reason: FailureReason,
    /// Upstream detail.
    pub message: String,
}

impl From<&ProviderError> for FailureRecord {
    fn from(err: &ProviderError) -> Self {
        Self {
            provider: err.provider.clone(),
            kind: err.kind,
            reason: err.reason,
            message: err.message.clone(),
        }
    }
}

impl FailureRecord {
    /// A candidate skipped without a call because its breaker was OPEN.
    pub fn circuit_open(provider: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            kind: ErrorKind::Transient,
            reason: FailureReason::ServiceUnavailable,
            message: "circuit open, call skipped".to_string(),
        }
    }
}

impl fmt::Display for FailureRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}, {}): {}", self.provider, self.kind, self.reason, self.message)
    }
}

/// Errors the router can return.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RouterError {
    /// A candidate's breaker rejected the call.
    ///
    /// Used internally to skip the candidate; never returned by `Router::translate`.
    #[error("circuit open for provider '{provider}'")]
    CircuitOpen {
        /// Provider whose breaker is open.
        provider: String,
    },

    /// Every candidate failed and the fallback was unavailable or disallowed.
    #[error("all providers failed: {}", format_failures(.failures))]
    AllProvidersFailed {
        /// Per-provider failures in attempt order.
        failures: Vec<FailureRecord>,
    },

    /// The overall request deadline expired.
    #[error("request deadline exceeded after {}ms", .elapsed.as_millis())]
    Timeout {
        /// Time spent before giving up.
        elapsed: Duration,
    },

    /// The request itself is invalid.
    #[error("invalid request: {0}")]
    InvalidRequest(#[from] RequestError),
}

fn format_failures(failures: &[FailureRecord]) -> String {
    if failures.is_empty() {
        return "no candidates available".to_string();
    }
    failures.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_failed_lists_providers() {
        let err = RouterError::AllProvidersFailed {
            failures: vec![
                FailureRecord::from(&ProviderError::new("a", FailureReason::Timeout, "slow")),
                FailureRecord::from(&ProviderError::new("b", FailureReason::Authentication, "key")),
            ],
        };
        let rendered = err.to_string();
        assert!(rendered.contains("a (transient, timeout): slow"));
        assert!(rendered.contains("b (permanent, authentication failed): key"));
    }

    #[test]
    fn test_all_failed_without_candidates() {
        let err = RouterError::AllProvidersFailed { failures: vec![] };
        assert_eq!(err.to_string(), "all providers failed: no candidates available");
    }

    #[test]
    fn test_request_error_converts() {
        let err: RouterError = RequestError::EmptyText.into();
        assert_eq!(err, RouterError::InvalidRequest(RequestError::EmptyText));
    }

    #[test]
    fn test_circuit_open_record() {
        let record = FailureRecord::circuit_open("deepl");
        assert_eq!(record.kind, ErrorKind::Transient);
        assert!(record.to_string().starts_with("deepl (transient, service unavailable)"));
    }
}
