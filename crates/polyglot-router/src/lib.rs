//! Resilient translation routing for Polyglot.
//!
//! The [`Router`] picks among registered providers for every request. It
//! guards each provider with a [`CircuitBreaker`], answers repeated requests
//! from a [`TranslationCache`], records timings in a [`PerformanceMonitor`],
//! and falls back to a low-confidence local provider when every real
//! provider fails (unless strict mode asks for an error instead).
//!
//! ```no_run
//! use polyglot_abstraction::TranslationRequest;
//! use polyglot_providers::MockProvider;
//! use polyglot_router::{Router, RouterConfig};
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let router = Router::new(RouterConfig::default())
//!     .with_provider(Arc::new(MockProvider::named("local")), 1, 1.0);
//! let request = TranslationRequest::new("hola", "es", "en")?;
//! let result = router.translate(&request).await?;
//! println!("{} ({})", result.text, result.provider);
//! # Ok(())
//! # }
//! ```

pub mod backoff;
pub mod cache;
pub mod circuit_breaker;
pub mod config;
pub mod error;
pub mod health;
pub mod monitor;
pub mod ordering;
pub mod quality;
pub mod router;

pub use backoff::RetryPolicy;
pub use cache::{CacheConfig, CacheError, CacheKey, CacheStats, TranslationCache};
pub use circuit_breaker::{BreakerConfig, BreakerSnapshot, CircuitBreaker, CircuitState, Permit};
pub use config::{BreakerSettings, ConfigError, RouterConfig, TimeoutSettings};
pub use error::{FailureRecord, RouterError};
pub use health::{HealthRegistry, ProviderHealth};
pub use monitor::{
    MetricSample, MonitorSnapshot, OP_CACHE_LOOKUP, OP_FALLBACK, OP_TRANSLATE, OperationStats, Percentiles,
    PerformanceMonitor,
};
pub use ordering::OrderingPolicy;
pub use quality::{
    QualityConfig, QualityDimension, QualityIssue, QualityReport, QualityScores, QualityValidator,
    QualityWeights,
};
pub use router::{ProviderInfo, Router, RouterStats};
