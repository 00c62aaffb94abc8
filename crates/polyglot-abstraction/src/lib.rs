//! Translation provider abstraction layer for Polyglot.
//!
//! This crate defines the contract every translation service implements
//! ([`Provider`]) together with the request/result types that flow through
//! the router. It performs no I/O of its own.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Maximum source text length, in Unicode scalar values.
pub const MAX_TEXT_CHARS: usize = 5000;

/// Reserved identifier of the always-available fallback provider.
pub const FALLBACK_PROVIDER_NAME: &str = "mock_fallback";

/// Whether retrying the same call elsewhere or later could succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Network failures, timeouts, rate limits, upstream 5xx.
    Transient,
    /// Bad language pair, authentication failure, malformed request.
    Permanent,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Transient => write!(f, "transient"),
            ErrorKind::Permanent => write!(f, "permanent"),
        }
    }
}

/// Concrete cause of a provider failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// Connection refused, reset, DNS failure.
    Network,
    /// The call did not finish before its deadline.
    Timeout,
    /// HTTP 429 or an equivalent throttling signal.
    RateLimited,
    /// Upstream 5xx or maintenance.
    ServiceUnavailable,
    /// The provider answered with a body we could not decode.
    InvalidResponse,
    /// The provider cannot translate between the requested languages.
    UnsupportedLanguagePair,
    /// Missing or rejected credentials.
    Authentication,
    /// Account quota exhausted (not a transient rate limit).
    QuotaExceeded,
    /// The provider rejected the request itself.
    InvalidRequest,
}

impl FailureReason {
    /// The classification a failure of this reason carries by default.
    #[must_use]
    pub const fn default_kind(self) -> ErrorKind {
        match self {
            FailureReason::Network
            | FailureReason::Timeout
            | FailureReason::RateLimited
            | FailureReason::ServiceUnavailable
            | FailureReason::InvalidResponse => ErrorKind::Transient,
            FailureReason::UnsupportedLanguagePair
            | FailureReason::Authentication
            | FailureReason::QuotaExceeded
            | FailureReason::InvalidRequest => ErrorKind::Permanent,
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureReason::Network => "network error",
            FailureReason::Timeout => "timeout",
            FailureReason::RateLimited => "rate limited",
            FailureReason::ServiceUnavailable => "service unavailable",
            FailureReason::InvalidResponse => "invalid response",
            FailureReason::UnsupportedLanguagePair => "unsupported language pair",
            FailureReason::Authentication => "authentication failed",
            FailureReason::QuotaExceeded => "quota exceeded",
            FailureReason::InvalidRequest => "invalid request",
        };
        f.write_str(s)
    }
}

/// An error returned by a [`Provider`].
///
/// The transient/permanent classification is an explicit field so the router
/// never has to guess from the message or the reason.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("provider '{provider}' {kind} failure ({reason}): {message}")]
pub struct ProviderError {
    /// Identifier of the provider that failed.
    pub provider: String,
    /// Transient or permanent.
    pub kind: ErrorKind,
    /// What went wrong.
    pub reason: FailureReason,
    /// Human-readable detail, usually from the upstream service.
    pub message: String,
}

impl ProviderError {
    /// Creates an error classified by the reason's default kind.
    pub fn new(
        provider: impl Into<String>,
        reason: FailureReason,
        message: impl Into<String>,
    ) -> Self {
        Self {
            provider: provider.into(),
            kind: reason.default_kind(),
            reason,
            message: message.into(),
        }
    }

    /// Creates a transient error.
    pub fn transient(
        provider: impl Into<String>,
        reason: FailureReason,
        message: impl Into<String>,
    ) -> Self {
        Self { kind: ErrorKind::Transient, ..Self::new(provider, reason, message) }
    }

    /// Creates a permanent error.
    pub fn permanent(
        provider: impl Into<String>,
        reason: FailureReason,
        message: impl Into<String>,
    ) -> Self {
        Self { kind: ErrorKind::Permanent, ..Self::new(provider, reason, message) }
    }

    /// A deadline expired while waiting for the provider.
    pub fn timeout(provider: impl Into<String>, after: Duration) -> Self {
        Self::new(
            provider,
            FailureReason::Timeout,
            format!("no response within {}ms", after.as_millis()),
        )
    }

    /// Returns `true` if this failure should count against the provider's breaker.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        self.kind == ErrorKind::Transient
    }
}

/// Reasons a [`TranslationRequest`] cannot be constructed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    /// Source text is empty or only whitespace.
    #[error("source text is empty")]
    EmptyText,

    /// Source text exceeds [`MAX_TEXT_CHARS`].
    #[error("source text is {len} characters, maximum is {max}")]
    TextTooLong {
        /// Actual length in characters.
        len: usize,
        /// Allowed maximum.
        max: usize,
    },

    /// A language tag is empty.
    #[error("{0} language tag is empty")]
    EmptyLanguage(&'static str),

    /// Source and target languages are the same.
    #[error("source and target language are both '{0}'")]
    SameLanguage(String),
}

/// Normalises a language tag: trimmed, lowercased, `_` replaced by `-`.
///
/// `"ES"` becomes `"es"`, `"pt_BR"` becomes `"pt-br"`.
#[must_use]
pub fn normalize_language_tag(tag: &str) -> String {
    tag.trim().to_lowercase().replace('_', "-")
}

/// Primary language subtag of a normalised tag (`"pt-br"` → `"pt"`).
#[must_use]
pub fn primary_subtag(tag: &str) -> &str {
    tag.split('-').next().unwrap_or(tag)
}

/// A request to translate a piece of text.
///
/// Immutable once constructed; all invariants are checked in [`TranslationRequest::new`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationRequest {
    text: String,
    source_lang: String,
    target_lang: String,
    deadline: Option<Duration>,
    strict: bool,
}

impl TranslationRequest {
    /// Builds a validated request.
    ///
    /// # Errors
    /// Returns a [`RequestError`] if the text is empty or too long, a tag is
    /// empty, or both tags normalise to the same language.
    pub fn new(
        text: impl Into<String>,
        source_lang: &str,
        target_lang: &str,
    ) -> Result<Self, RequestError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(RequestError::EmptyText);
        }
        let len = text.chars().count();
        if len > MAX_TEXT_CHARS {
            return Err(RequestError::TextTooLong { len, max: MAX_TEXT_CHARS });
        }

        let source_lang = normalize_language_tag(source_lang);
        let target_lang = normalize_language_tag(target_lang);
        if source_lang.is_empty() {
            return Err(RequestError::EmptyLanguage("source"));
        }
        if target_lang.is_empty() {
            return Err(RequestError::EmptyLanguage("target"));
        }
        if source_lang == target_lang {
            return Err(RequestError::SameLanguage(source_lang));
        }

        Ok(Self { text, source_lang, target_lang, deadline: None, strict: false })
    }

    /// Bounds the whole routing operation (all candidates) by `deadline`.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Requests a hard error instead of the degraded fallback when every provider fails.
    #[must_use]
    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    /// The source text, exactly as supplied.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Normalised source language tag.
    pub fn source_lang(&self) -> &str {
        &self.source_lang
    }

    /// Normalised target language tag.
    pub fn target_lang(&self) -> &str {
        &self.target_lang
    }

    /// Optional overall deadline.
    pub fn deadline(&self) -> Option<Duration> {
        self.deadline
    }

    /// Whether strict mode was requested.
    pub fn is_strict(&self) -> bool {
        self.strict
    }
}

/// A completed translation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationResult {
    /// The translated text.
    pub text: String,
    /// Identifier of the provider that produced the text. Never empty.
    pub provider: String,
    /// Provider confidence in `[0, 1]`.
    pub confidence: f64,
    /// Estimated monetary cost in USD, `>= 0`.
    pub cost: f64,
    /// Time the provider took to answer.
    pub latency: Duration,
    /// When the translation was produced.
    pub timestamp: DateTime<Utc>,
}

impl TranslationResult {
    /// Creates a result stamped with the current time.
    ///
    /// Confidence is clamped to `[0, 1]` and negative or non-finite costs
    /// become zero.
    pub fn new(
        text: impl Into<String>,
        provider: impl Into<String>,
        confidence: f64,
        cost: f64,
        latency: Duration,
    ) -> Self {
        let confidence = if confidence.is_finite() { confidence.clamp(0.0, 1.0) } else { 0.0 };
        let cost = if cost.is_finite() && cost > 0.0 { cost } else { 0.0 };
        Self {
            text: text.into(),
            provider: provider.into(),
            confidence,
            cost,
            latency,
            timestamp: Utc::now(),
        }
    }

    /// Returns `true` if the reserved fallback provider produced this result.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.provider == FALLBACK_PROVIDER_NAME
    }
}

/// The capability set every translation service implements.
///
/// Implementations must be `Send + Sync`; a single instance is shared by all
/// in-flight requests. Providers must not retry internally: retries, deadlines
/// and fallback are the router's job. A call is cancelled by dropping its
/// future, which the router does when the deadline passes.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Stable identifier (e.g. `"deepl"`), used for breakers, metrics, and results.
    fn name(&self) -> &str;

    /// Translates `text` from `source_lang` to `target_lang`.
    ///
    /// # Errors
    /// Returns a [`ProviderError`] classified as transient or permanent.
    async fn translate(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> Result<TranslationResult, ProviderError>;

    /// Estimated cost in USD. Pure; performs no I/O.
    fn estimate_cost(&self, text: &str, source_lang: &str, target_lang: &str) -> f64;

    /// Language tags this provider accepts, normalised.
    fn supported_languages(&self) -> BTreeSet<String>;

    /// Lightweight liveness probe. Callers bound it in time.
    async fn health_check(&self) -> bool;

    /// Whether both tags (or their primary subtags) are supported.
    fn supports_pair(&self, source_lang: &str, target_lang: &str) -> bool {
        let languages = self.supported_languages();
        let accepts =
            |tag: &str| languages.contains(tag) || languages.contains(primary_subtag(tag));
        accepts(source_lang) && accepts(target_lang)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedLanguages;

    #[async_trait]
    impl Provider for FixedLanguages {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn translate(
            &self,
            text: &str,
            _source_lang: &str,
            _target_lang: &str,
        ) -> Result<TranslationResult, ProviderError> {
            Ok(TranslationResult::new(text, "fixed", 1.0, 0.0, Duration::ZERO))
        }

        fn estimate_cost(&self, _text: &str, _source_lang: &str, _target_lang: &str) -> f64 {
            0.0
        }

        fn supported_languages(&self) -> BTreeSet<String> {
            ["en", "es", "pt"].into_iter().map(String::from).collect()
        }

        async fn health_check(&self) -> bool {
            true
        }
    }

    #[test]
    fn test_request_normalizes_language_tags() {
        let request = TranslationRequest::new("hola", " ES ", "pt_BR").unwrap();
        assert_eq!(request.source_lang(), "es");
        assert_eq!(request.target_lang(), "pt-br");
        assert_eq!(request.text(), "hola");
        assert!(request.deadline().is_none());
        assert!(!request.is_strict());
    }

    #[test]
    fn test_request_rejects_empty_text() {
        assert_eq!(TranslationRequest::new("   ", "es", "en"), Err(RequestError::EmptyText));
    }

    #[test]
    fn test_request_rejects_long_text() {
        let text = "a".repeat(MAX_TEXT_CHARS + 1);
        assert!(matches!(
            TranslationRequest::new(text, "es", "en"),
            Err(RequestError::TextTooLong { len, max }) if len == MAX_TEXT_CHARS + 1 && max == MAX_TEXT_CHARS
        ));

        // Multi-byte characters count once each.
        let text = "ñ".repeat(MAX_TEXT_CHARS);
        assert!(TranslationRequest::new(text, "es", "en").is_ok());
    }

    #[test]
    fn test_request_rejects_bad_languages() {
        assert_eq!(
            TranslationRequest::new("hola", "", "en"),
            Err(RequestError::EmptyLanguage("source"))
        );
        assert_eq!(
            TranslationRequest::new("hola", "es", " "),
            Err(RequestError::EmptyLanguage("target"))
        );
        assert_eq!(
            TranslationRequest::new("hola", "EN", "en"),
            Err(RequestError::SameLanguage("en".to_string()))
        );
    }

    #[test]
    fn test_request_builders() {
        let request = TranslationRequest::new("hola", "es", "en")
            .unwrap()
            .with_deadline(Duration::from_secs(2))
            .strict();
        assert_eq!(request.deadline(), Some(Duration::from_secs(2)));
        assert!(request.is_strict());
    }

    #[test]
    fn test_error_classification() {
        assert!(ProviderError::new("a", FailureReason::RateLimited, "slow down").is_transient());
        assert!(ProviderError::timeout("a", Duration::from_millis(5)).is_transient());
        assert!(
            !ProviderError::new("a", FailureReason::UnsupportedLanguagePair, "xx").is_transient()
        );
        assert!(!ProviderError::permanent("a", FailureReason::Network, "forced").is_transient());
        assert!(ProviderError::transient("a", FailureReason::InvalidRequest, "odd").is_transient());
    }

    #[test]
    fn test_error_display_mentions_provider_and_kind() {
        let err = ProviderError::new("deepl", FailureReason::Authentication, "bad key");
        let rendered = err.to_string();
        assert!(rendered.contains("deepl"));
        assert!(rendered.contains("permanent"));
        assert!(rendered.contains("bad key"));
    }

    #[test]
    fn test_error_serializes_kind_as_field() {
        let err = ProviderError::new("google", FailureReason::ServiceUnavailable, "503");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["kind"], "transient");
        assert_eq!(json["reason"], "service_unavailable");
    }

    #[test]
    fn test_result_clamps_confidence_and_cost() {
        let result = TranslationResult::new("hi", "p", 1.7, -3.0, Duration::ZERO);
        assert_eq!(result.confidence, 1.0);
        assert_eq!(result.cost, 0.0);

        let result = TranslationResult::new("hi", "p", f64::NAN, f64::INFINITY, Duration::ZERO);
        assert_eq!(result.confidence, 0.0);
        assert_eq!(result.cost, 0.0);
    }

    #[test]
    fn test_result_degraded_flag() {
        let result = TranslationResult::new("hi", FALLBACK_PROVIDER_NAME, 0.1, 0.0, Duration::ZERO);
        assert!(result.is_degraded());
        let result = TranslationResult::new("hi", "deepl", 0.9, 0.0, Duration::ZERO);
        assert!(!result.is_degraded());
    }

    #[test]
    fn test_supports_pair_uses_primary_subtag() {
        let provider = FixedLanguages;
        assert!(provider.supports_pair("es", "en"));
        assert!(provider.supports_pair("pt-br", "en"));
        assert!(!provider.supports_pair("de", "en"));
    }

    #[tokio::test]
    async fn test_provider_is_object_safe() {
        let provider: Box<dyn Provider> = Box::new(FixedLanguages);
        let result = provider.translate("hola", "es", "en").await.unwrap();
        assert_eq!(result.provider, "fixed");
        assert!(provider.health_check().await);
    }
}
