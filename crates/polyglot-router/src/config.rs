//! TOML configuration for the router.

use crate::backoff::RetryPolicy;
use crate::cache::CacheConfig;
use crate::circuit_breaker::BreakerConfig;
use crate::ordering::OrderingPolicy;
use crate::quality::QualityConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O error reading the file.
    #[error("Failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error.
    #[error("Failed to parse TOML configuration: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error.
    #[error("Invalid configuration: {0}")]
    Validation(String),
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

fn default_failure_threshold() -> u32 {
    5
}

fn default_recovery_timeout_secs() -> u64 {
    60
}

fn default_success_threshold() -> u32 {
    2
}

fn default_half_open_max_calls() -> u32 {
    1
}

/// Circuit breaker thresholds, shared by every provider's breaker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakerSettings {
    /// Consecutive transient failures before opening.
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    /// Seconds spent OPEN before a trial call.
    #[serde(default = "default_recovery_timeout_secs")]
    pub recovery_timeout_secs: u64,
    /// Consecutive trial successes before closing.
    #[serde(default = "default_success_threshold")]
    pub success_threshold: u32,
    /// Concurrent trial calls while HALF_OPEN.
    #[serde(default = "default_half_open_max_calls")]
    pub half_open_max_calls: u32,
}

impl Default for BreakerSettings {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            recovery_timeout_secs: default_recovery_timeout_secs(),
            success_threshold: default_success_threshold(),
            half_open_max_calls: default_half_open_max_calls(),
        }
    }
}

impl BreakerSettings {
    /// Converts to the breaker's runtime form.
    #[must_use]
    pub fn to_breaker_config(&self) -> BreakerConfig {
        BreakerConfig {
            failure_threshold: self.failure_threshold,
            recovery_timeout: Duration::from_secs(self.recovery_timeout_secs),
            success_threshold: self.success_threshold,
            half_open_max_calls: self.half_open_max_calls,
        }
    }
}

fn default_per_call_ms() -> u64 {
    10_000
}

fn default_per_request_ms() -> u64 {
    30_000
}

/// Time limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutSettings {
    /// Limit on a single provider call.
    #[serde(default = "default_per_call_ms")]
    pub per_call_ms: u64,
    /// Limit on a whole request when the caller sets none.
    #[serde(default = "default_per_request_ms")]
    pub per_request_ms: u64,
}

impl Default for TimeoutSettings {
    fn default() -> Self {
        Self { per_call_ms: default_per_call_ms(), per_request_ms: default_per_request_ms() }
    }
}

impl TimeoutSettings {
    /// Per-call limit.
    #[must_use]
    pub fn per_call(&self) -> Duration {
        Duration::from_millis(self.per_call_ms)
    }

    /// Default per-request limit.
    #[must_use]
    pub fn per_request(&self) -> Duration {
        Duration::from_millis(self.per_request_ms)
    }
}

fn default_fallback_enabled() -> bool {
    true
}

fn default_health_window_secs() -> u64 {
    300 // 5 minutes
}

/// Router configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Breaker thresholds.
    #[serde(default)]
    pub breaker: BreakerSettings,
    /// Cache settings.
    #[serde(default)]
    pub cache: CacheConfig,
    /// Time limits.
    #[serde(default)]
    pub timeouts: TimeoutSettings,
    /// Retries on the same provider.
    #[serde(default)]
    pub retry: RetryPolicy,
    /// Candidate ordering.
    #[serde(default)]
    pub ordering: OrderingPolicy,
    /// Quality validation.
    #[serde(default)]
    pub quality: QualityConfig,
    /// Fail instead of degrading, for every request.
    #[serde(default)]
    pub strict_mode: bool,
    /// Whether the degraded fallback may answer at all.
    #[serde(default = "default_fallback_enabled")]
    pub fallback_enabled: bool,
    /// Window for provider error rates.
    #[serde(default = "default_health_window_secs")]
    pub health_window_secs: u64,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            breaker: BreakerSettings::default(),
            cache: CacheConfig::default(),
            timeouts: TimeoutSettings::default(),
            retry: RetryPolicy::default(),
            ordering: OrderingPolicy::default(),
            quality: QualityConfig::default(),
            strict_mode: false,
            fallback_enabled: default_fallback_enabled(),
            health_window_secs: default_health_window_secs(),
        }
    }
}

impl RouterConfig {
    /// Loads router configuration from a TOML file and validates it.
    ///
    /// # Errors
    /// Returns error if the file cannot be read, parsed, or validated.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parses and validates TOML text.
    ///
    /// # Errors
    /// Returns error if the text cannot be parsed or validated.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validates router configuration.
    ///
    /// # Errors
    /// Returns `ConfigError::Validation` describing the first invalid value.
    pub fn validate(&self) -> Result<()> {
        if self.breaker.failure_threshold == 0 {
            return Err(ConfigError::Validation(
                "breaker.failure_threshold must be greater than 0".into(),
            ));
        }
        if self.breaker.success_threshold == 0 {
            return Err(ConfigError::Validation(
                "breaker.success_threshold must be greater than 0".into(),
            ));
        }
        if self.breaker.half_open_max_calls == 0 {
            return Err(ConfigError::Validation(
                "breaker.half_open_max_calls must be greater than 0".into(),
            ));
        }
        if self.timeouts.per_call_ms == 0 {
            return Err(ConfigError::Validation(
                "timeouts.per_call_ms must be greater than 0".into(),
            ));
        }
        if self.timeouts.per_request_ms == 0 {
            return Err(ConfigError::Validation(
                "timeouts.per_request_ms must be greater than 0".into(),
            ));
        }
        if self.health_window_secs == 0 {
            return Err(ConfigError::Validation(
                "health_window_secs must be greater than 0".into(),
            ));
        }
        if !(self.retry.multiplier.is_finite() && self.retry.multiplier > 0.0) {
            return Err(ConfigError::Validation("retry.multiplier must be positive".into()));
        }
        self.cache.validate()?;
        self.quality.validate()?;
        Ok(())
    }

    /// Error-rate window.
    #[must_use]
    pub fn health_window(&self) -> Duration {
        Duration::from_secs(self.health_window_secs)
    }
}
