//! Google Cloud Translation (v2) provider implementation.

use crate::http::{self, DEFAULT_HTTP_TIMEOUT};
use async_trait::async_trait;
use polyglot_abstraction::{FailureReason, Provider, ProviderError, TranslationResult};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Instant;
use tracing::debug;

/// Default Cloud Translation endpoint.
pub const GOOGLE_DEFAULT_BASE_URL: &str = "https://translation.googleapis.com";

/// USD per character (20 USD per million characters).
const COST_PER_CHAR: f64 = 20.0 / 1_000_000.0;

const CONFIDENCE: f64 = 0.9;

const LANGUAGES: &[&str] = &[
    "af", "ar", "bg", "bn", "ca", "cs", "cy", "da", "de", "el", "en", "es", "et", "fa", "fi",
    "fr", "ga", "gl", "he", "hi", "hr", "hu", "id", "is", "it", "ja", "ko", "lt", "lv", "mk",
    "ms", "mt", "nl", "no", "pl", "pt", "ro", "ru", "sk", "sl", "sq", "sr", "sv", "sw", "th",
    "tl", "tr", "uk", "ur", "vi", "zh",
];

/// Google Cloud Translation provider.
#[derive(Debug, Clone)]
pub struct GoogleProvider {
    name: String,
    api_key: String,
    base_url: String,
    client: Client,
}

impl GoogleProvider {
    /// Creates a provider authenticating with an API key.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            name: "google".to_string(),
            api_key: api_key.into(),
            base_url: GOOGLE_DEFAULT_BASE_URL.to_string(),
            client: http::build_client(DEFAULT_HTTP_TIMEOUT),
        }
    }

    /// Points the provider at a different endpoint.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Overrides the identifier reported in results and breakers.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

#[async_trait]
impl Provider for GoogleProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn translate(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> Result<TranslationResult, ProviderError> {
        debug!(
            provider = %self.name,
            source_lang,
            target_lang,
            text_len = text.len(),
            "Google translating"
        );

        let started = Instant::now();
        let body = GoogleRequest { q: text, source: source_lang, target: target_lang, format: "text" };

        let request = self
            .client
            .post(format!("{}/language/translate/v2", self.base_url))
            .header("x-goog-api-key", &self.api_key)
            .json(&body);

        let raw = http::send_for_body(&self.name, request).await?;
        let parsed: GoogleResponse = http::decode(&self.name, &raw)?;

        let translated = parsed
            .data
            .translations
            .into_iter()
            .next()
            .map(|t| t.translated_text)
            .ok_or_else(|| {
                ProviderError::new(
                    &self.name,
                    FailureReason::InvalidResponse,
                    "response contained no translations",
                )
            })?;

        Ok(TranslationResult::new(
            translated,
            &self.name,
            CONFIDENCE,
            self.estimate_cost(text, source_lang, target_lang),
            started.elapsed(),
        ))
    }

    fn estimate_cost(&self, text: &str, _source_lang: &str, _target_lang: &str) -> f64 {
        text.chars().count() as f64 * COST_PER_CHAR
    }

    fn supported_languages(&self) -> BTreeSet<String> {
        LANGUAGES.iter().map(|l| (*l).to_string()).collect()
    }

    async fn health_check(&self) -> bool {
        let request = self
            .client
            .get(format!("{}/language/translate/v2/languages", self.base_url))
            .header("x-goog-api-key", &self.api_key);
        http::probe(&self.name, request).await
    }
}

#[derive(Debug, Serialize)]
struct GoogleRequest<'a> {
    q: &'a str,
    source: &'a str,
    target: &'a str,
    format: &'a str,
}

#[derive(Debug, Deserialize)]
struct GoogleResponse {
    data: GoogleData,
}

#[derive(Debug, Deserialize)]
struct GoogleData {
    translations: Vec<GoogleTranslation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleTranslation {
    translated_text: String,
}
