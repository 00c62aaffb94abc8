//! Translation provider implementations for Polyglot.
//!
//! This crate provides concrete implementations of the `Provider` trait.
//!
//! # Supported Providers
//!
//! - **DeepL**: DeepL REST API (API key required)
//! - **Google**: Google Cloud Translation v2 (API key required)
//! - **Flash**: Gemini Flash prompted for translation (API key required)
//! - **Mock**: Local echo provider, also used as the degraded-mode fallback

pub mod deepl;
pub mod factory;
pub mod flash;
pub mod google;
pub mod http;

use async_trait::async_trait;
use polyglot_abstraction::{
    FALLBACK_PROVIDER_NAME, Provider, ProviderError, TranslationResult,
};
use std::collections::BTreeSet;
use std::time::Duration;
use tracing::debug;

pub use deepl::DeepLProvider;
pub use factory::{FactoryError, ProviderConfig, ProviderFactory, ProviderType};
pub use flash::FlashProvider;
pub use google::GoogleProvider;
pub use http::HEALTH_CHECK_TIMEOUT;

/// Confidence reported by the fallback so consumers can spot degraded output.
pub const FALLBACK_CONFIDENCE: f64 = 0.1;

/// A local provider that never fails and never touches the network.
///
/// The output is the source text tagged with the target language, e.g.
/// `"[en] hola"`. [`MockProvider::fallback`] is the instance the router
/// uses as its last resort.
#[derive(Debug, Clone)]
pub struct MockProvider {
    name: String,
    confidence: f64,
}

impl MockProvider {
    /// The reserved degraded-mode fallback.
    #[must_use]
    pub fn fallback() -> Self {
        Self { name: FALLBACK_PROVIDER_NAME.to_string(), confidence: FALLBACK_CONFIDENCE }
    }

    /// A mock under a custom name, for local setups and tests.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into(), confidence: 0.5 }
    }

    /// Overrides the reported confidence.
    #[must_use]
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::fallback()
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn translate(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> Result<TranslationResult, ProviderError> {
        debug!(provider = %self.name, source_lang, target_lang, "MockProvider translating");
        Ok(TranslationResult::new(
            format!("[{target_lang}] {text}"),
            &self.name,
            self.confidence,
            0.0,
            Duration::ZERO,
        ))
    }

    fn estimate_cost(&self, _text: &str, _source_lang: &str, _target_lang: &str) -> f64 {
        0.0
    }

    /// Empty: the mock accepts every pair, see [`Provider::supports_pair`].
    fn supported_languages(&self) -> BTreeSet<String> {
        BTreeSet::new()
    }

    async fn health_check(&self) -> bool {
        true
    }

    fn supports_pair(&self, _source_lang: &str, _target_lang: &str) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fallback_always_succeeds_with_low_confidence() {
        let mock = MockProvider::fallback();
        let result = mock.translate("hola", "es", "en").await.unwrap();
        assert_eq!(result.text, "[en] hola");
        assert_eq!(result.provider, FALLBACK_PROVIDER_NAME);
        assert!((result.confidence - FALLBACK_CONFIDENCE).abs() < f64::EPSILON);
        assert_eq!(result.cost, 0.0);
        assert!(result.is_degraded());
    }

    #[tokio::test]
    async fn test_named_mock_is_not_degraded() {
        let mock = MockProvider::named("local").with_confidence(0.8);
        let result = mock.translate("hola", "es", "xx").await.unwrap();
        assert_eq!(result.provider, "local");
        assert!(!result.is_degraded());
        assert!(mock.supports_pair("es", "xx"));
        assert!(mock.health_check().await);
    }
}
