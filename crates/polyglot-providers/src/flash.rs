//! Gemini Flash provider implementation.
//!
//! Translation is done by prompting a Gemini model through
//! `generateContent`. The prompt asks for the bare translation only, and the
//! first candidate's text is returned trimmed.

use crate::http::{self, DEFAULT_HTTP_TIMEOUT};
use async_trait::async_trait;
use polyglot_abstraction::{FailureReason, Provider, ProviderError, TranslationResult};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Instant;
use tracing::{debug, error};

/// Default Generative Language API endpoint.
pub const FLASH_DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Default model used for translation.
pub const FLASH_DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// USD per million input tokens.
const INPUT_COST_PER_MILLION: f64 = 0.075;
/// USD per million output tokens.
const OUTPUT_COST_PER_MILLION: f64 = 0.30;

const CONFIDENCE: f64 = 0.85;

const LANGUAGES: &[&str] = &[
    "ar", "bn", "bg", "cs", "da", "de", "el", "en", "es", "et", "fa", "fi", "fr", "he", "hi",
    "hr", "hu", "id", "it", "ja", "ko", "lt", "lv", "nl", "no", "pl", "pt", "ro", "ru", "sk",
    "sl", "sr", "sv", "sw", "th", "tr", "uk", "ur", "vi", "zh",
];

/// Gemini Flash translation provider.
#[derive(Debug, Clone)]
pub struct FlashProvider {
    name: String,
    model: String,
    api_key: String,
    base_url: String,
    client: Client,
}

impl FlashProvider {
    /// Creates a provider using [`FLASH_DEFAULT_MODEL`].
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            name: "flash".to_string(),
            model: FLASH_DEFAULT_MODEL.to_string(),
            api_key: api_key.into(),
            base_url: FLASH_DEFAULT_BASE_URL.to_string(),
            client: http::build_client(DEFAULT_HTTP_TIMEOUT),
        }
    }

    /// Uses a different Gemini model.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
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

    /// The configured model identifier.
    pub fn model(&self) -> &str {
        &self.model
    }

    fn prompt(text: &str, source_lang: &str, target_lang: &str) -> String {
        format!(
            "Translate the following text from {source_lang} to {target_lang}. \
             Reply with the translation only, without quotes or commentary.\n\n{text}"
        )
    }
}

#[async_trait]
impl Provider for FlashProvider {
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
            model = %self.model,
            source_lang,
            target_lang,
            text_len = text.len(),
            "Flash translating"
        );

        let started = Instant::now();
        let body = GeminiRequest {
            contents: vec![GeminiContent {
                role: "user".to_string(),
                parts: vec![GeminiPart { text: Self::prompt(text, source_lang, target_lang) }],
            }],
            generation_config: GeminiGenerationConfig { temperature: 0.0 },
        };

        let request = self
            .client
            .post(format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model))
            .header("x-goog-api-key", &self.api_key)
            .json(&body);

        let raw = http::send_for_body(&self.name, request).await?;
        let parsed: GeminiResponse = http::decode(&self.name, &raw)?;

        let translated = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                error!(provider = %self.name, "No candidates in Gemini response");
                ProviderError::new(
                    &self.name,
                    FailureReason::InvalidResponse,
                    "response contained no candidates",
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

    /// Tokens are approximated as a quarter of the character count, billed
    /// once as input and once as output.
    fn estimate_cost(&self, text: &str, _source_lang: &str, _target_lang: &str) -> f64 {
        let tokens = text.chars().count() as f64 / 4.0;
        tokens * (INPUT_COST_PER_MILLION + OUTPUT_COST_PER_MILLION) / 1_000_000.0
    }

    fn supported_languages(&self) -> BTreeSet<String> {
        LANGUAGES.iter().map(|l| (*l).to_string()).collect()
    }

    async fn health_check(&self) -> bool {
        let request = self
            .client
            .get(format!("{}/v1beta/models/{}", self.base_url, self.model))
            .header("x-goog-api-key", &self.api_key);
        http::probe(&self.name, request).await
    }
}

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(rename = "generationConfig")]
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    role: String,
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Serialize)]
struct GeminiGenerationConfig {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: GeminiContent,
}
