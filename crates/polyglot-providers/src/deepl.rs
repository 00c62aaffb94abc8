//! DeepL provider implementation.
//!
//! This module provides an implementation of the `Provider` trait for the
//! DeepL REST API (`/v2/translate`).

use crate::http::{self, DEFAULT_HTTP_TIMEOUT};
use async_trait::async_trait;
use polyglot_abstraction::{
    FailureReason, Provider, ProviderError, TranslationResult, primary_subtag,
};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Instant;
use tracing::debug;

/// Default endpoint for free-tier API keys.
pub const DEEPL_DEFAULT_BASE_URL: &str = "https://api-free.deepl.com";

/// USD per character (20 USD per million characters).
const COST_PER_CHAR: f64 = 20.0 / 1_000_000.0;

const CONFIDENCE: f64 = 0.95;

const LANGUAGES: &[&str] = &[
    "bg", "cs", "da", "de", "el", "en", "es", "et", "fi", "fr", "hu", "id", "it", "ja", "ko",
    "lt", "lv", "nb", "nl", "pl", "pt", "ro", "ru", "sk", "sl", "sv", "tr", "uk", "zh",
];

/// DeepL translation provider.
#[derive(Debug, Clone)]
pub struct DeepLProvider {
    name: String,
    api_key: String,
    base_url: String,
    client: Client,
}

impl DeepLProvider {
    /// Creates a provider authenticating with `api_key`.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            name: "deepl".to_string(),
            api_key: api_key.into(),
            base_url: DEEPL_DEFAULT_BASE_URL.to_string(),
            client: http::build_client(DEFAULT_HTTP_TIMEOUT),
        }
    }

    /// Points the provider at a different endpoint (paid tier, test server).
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

    fn auth_header(&self) -> String {
        format!("DeepL-Auth-Key {}", self.api_key)
    }

    /// DeepL source codes are the bare uppercase primary subtag.
    fn source_code(tag: &str) -> String {
        primary_subtag(tag).to_uppercase()
    }

    /// DeepL rejects bare `EN`/`PT` as targets and wants a regional variant.
    fn target_code(tag: &str) -> String {
        match tag {
            "en" => "EN-US".to_string(),
            "pt" => "PT-PT".to_string(),
            _ => tag.to_uppercase(),
        }
    }
}

#[async_trait]
impl Provider for DeepLProvider {
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
            "DeepL translating"
        );

        let started = Instant::now();
        let body = DeepLRequest {
            text: vec![text.to_string()],
            source_lang: Self::source_code(source_lang),
            target_lang: Self::target_code(target_lang),
        };

        let request = self
            .client
            .post(format!("{}/v2/translate", self.base_url))
            .header("Authorization", self.auth_header())
            .json(&body);

        let raw = http::send_for_body(&self.name, request).await?;
        let parsed: DeepLResponse = http::decode(&self.name, &raw)?;

        let translated = parsed
            .translations
            .into_iter()
            .next()
            .map(|t| t.text)
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
            .get(format!("{}/v2/usage", self.base_url))
            .header("Authorization", self.auth_header());
        http::probe(&self.name, request).await
    }
}

#[derive(Debug, Serialize)]
struct DeepLRequest {
    text: Vec<String>,
    source_lang: String,
    target_lang: String,
}

#[derive(Debug, Deserialize)]
struct DeepLResponse {
    translations: Vec<DeepLTranslation>,
}

#[derive(Debug, Deserialize)]
struct DeepLTranslation {
    text: String,
}
