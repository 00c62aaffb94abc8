//! Configuration for the translation cache.

use crate::config::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the translation cache.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheConfig {
    /// Whether results are cached at all.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Maximum number of entries (default: 1000).
    #[serde(default = "default_capacity")]
    pub capacity: usize,

    /// TTL for ordinary results in seconds (default: 3600 = 1 hour).
    #[serde(default = "default_ttl_secs")]
    pub default_ttl_secs: u64,

    /// TTL for low-confidence results in seconds (default: 300 = 5 minutes).
    #[serde(default = "default_low_confidence_ttl_secs")]
    pub low_confidence_ttl_secs: u64,

    /// Results below this confidence get the short TTL (default: 0.5).
    #[serde(default = "default_low_confidence_threshold")]
    pub low_confidence_threshold: f64,
}

fn default_enabled() -> bool {
    true
}

fn default_capacity() -> usize {
    1000
}

fn default_ttl_secs() -> u64 {
    3600 // 1 hour
}

fn default_low_confidence_ttl_secs() -> u64 {
    300 // 5 minutes
}

fn default_low_confidence_threshold() -> f64 {
    0.5
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            capacity: default_capacity(),
            default_ttl_secs: default_ttl_secs(),
            low_confidence_ttl_secs: default_low_confidence_ttl_secs(),
            low_confidence_threshold: default_low_confidence_threshold(),
        }
    }
}

impl CacheConfig {
    /// Validate the cache configuration.
    ///
    /// # Errors
    /// Returns `ConfigError::Validation` if any value is out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::Validation("cache.capacity must be greater than 0".into()));
        }
        if self.default_ttl_secs == 0 {
            return Err(ConfigError::Validation(
                "cache.default_ttl_secs must be greater than 0".into(),
            ));
        }
        if self.low_confidence_ttl_secs > self.default_ttl_secs {
            return Err(ConfigError::Validation(format!(
                "cache.low_confidence_ttl_secs ({}) must not exceed default_ttl_secs ({})",
                self.low_confidence_ttl_secs, self.default_ttl_secs
            )));
        }
        if !(0.0..=1.0).contains(&self.low_confidence_threshold) {
            return Err(ConfigError::Validation(format!(
                "cache.low_confidence_threshold must be within [0, 1], got {}",
                self.low_confidence_threshold
            )));
        }
        Ok(())
    }

    /// TTL for ordinary results.
    #[must_use]
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_secs)
    }

    /// TTL for a result with the given confidence.
    #[must_use]
    pub fn ttl_for(&self, confidence: f64) -> Duration {
        if confidence < self.low_confidence_threshold {
            Duration::from_secs(self.low_confidence_ttl_secs)
        } else {
            self.default_ttl()
        }
    }
}
