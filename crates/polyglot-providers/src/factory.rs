//! Provider factory for creating provider instances from configuration.
//!
//! API keys are resolved from the environment first (the variable named by
//! `api_key_env`, or the provider type's conventional variable) and then from
//! the inline `api_key` field.

use crate::{DeepLProvider, FlashProvider, GoogleProvider, MockProvider};
use polyglot_abstraction::Provider;
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Errors raised while building a provider.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FactoryError {
    /// The provider type string is not recognised.
    #[error("unknown provider type: {0}")]
    UnknownType(String),

    /// No API key was found for a provider that needs one.
    #[error("no API key for provider '{provider}' (set {env_var} or api_key)")]
    MissingApiKey {
        /// Provider name from the configuration.
        provider: String,
        /// Environment variable that was consulted.
        env_var: String,
    },

    /// The configured name collides with the reserved fallback name.
    #[error("provider name '{0}' is reserved")]
    ReservedName(String),
}

/// Provider type enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    /// DeepL REST API.
    DeepL,
    /// Google Cloud Translation v2.
    Google,
    /// Gemini Flash via `generateContent`.
    Flash,
    /// Local echo provider, no network.
    Mock,
}

impl ProviderType {
    /// Environment variable consulted for the API key when none is configured.
    #[must_use]
    pub const fn default_api_key_env(self) -> &'static str {
        match self {
            Self::DeepL => "DEEPL_API_KEY",
            Self::Google => "GOOGLE_TRANSLATE_API_KEY",
            Self::Flash => "GEMINI_API_KEY",
            Self::Mock => "",
        }
    }

    const fn needs_api_key(self) -> bool {
        !matches!(self, Self::Mock)
    }
}

impl FromStr for ProviderType {
    type Err = FactoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "deepl" => Ok(Self::DeepL),
            "google" | "google-translate" => Ok(Self::Google),
            "flash" | "gemini" | "gemini-flash" => Ok(Self::Flash),
            "mock" => Ok(Self::Mock),
            other => Err(FactoryError::UnknownType(other.to_string())),
        }
    }
}

impl fmt::Display for ProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::DeepL => "deepl",
            Self::Google => "google",
            Self::Flash => "flash",
            Self::Mock => "mock",
        };
        f.write_str(s)
    }
}

fn default_priority() -> u32 {
    100
}

fn default_cost_weight() -> f64 {
    1.0
}

fn default_enabled() -> bool {
    true
}

/// Provider configuration, as found under `[[providers]]` in the config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Identifier used in results, breakers and metrics.
    pub name: String,
    /// Which implementation to build.
    #[serde(rename = "type")]
    pub provider_type: ProviderType,
    /// Inline API key. The environment takes precedence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Environment variable holding the API key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
    /// Endpoint override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Model override (Flash only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Lower is tried first.
    #[serde(default = "default_priority")]
    pub priority: u32,
    /// Multiplier applied to the estimated cost when ordering.
    #[serde(default = "default_cost_weight")]
    pub cost_weight: f64,
    /// Disabled providers are skipped at startup.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl ProviderConfig {
    /// Creates a configuration with default priority and weight.
    #[must_use]
    pub fn new(name: impl Into<String>, provider_type: ProviderType) -> Self {
        Self {
            name: name.into(),
            provider_type,
            api_key: None,
            api_key_env: None,
            base_url: None,
            model: None,
            priority: default_priority(),
            cost_weight: default_cost_weight(),
            enabled: default_enabled(),
        }
    }

    /// Sets the inline API key.
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Sets the environment variable the key is read from.
    #[must_use]
    pub fn with_api_key_env(mut self, var: impl Into<String>) -> Self {
        self.api_key_env = Some(var.into());
        self
    }

    /// Sets the endpoint override.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Sets the model override.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets the ordering priority.
    #[must_use]
    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    /// Sets the cost weight.
    #[must_use]
    pub fn with_cost_weight(mut self, cost_weight: f64) -> Self {
        self.cost_weight = cost_weight;
        self
    }

    fn api_key_env_var(&self) -> String {
        self.api_key_env
            .clone()
            .unwrap_or_else(|| self.provider_type.default_api_key_env().to_string())
    }

    #[allow(clippy::disallowed_methods)] // env::var is needed for API key loading
    fn resolve_api_key(&self) -> Result<String, FactoryError> {
        let var = self.api_key_env_var();
        if !var.is_empty() {
            if let Ok(key) = env::var(&var) {
                if !key.trim().is_empty() {
                    return Ok(key);
                }
            }
        }
        self.api_key.clone().filter(|k| !k.trim().is_empty()).ok_or_else(|| {
            FactoryError::MissingApiKey { provider: self.name.clone(), env_var: var }
        })
    }
}

/// Factory for creating provider instances.
pub struct ProviderFactory;

impl ProviderFactory {
    /// Creates a provider instance from the given configuration.
    ///
    /// # Errors
    /// Returns a [`FactoryError`] if the API key is missing or the name is reserved.
    pub fn create(config: &ProviderConfig) -> Result<Arc<dyn Provider>, FactoryError> {
        debug!(
            provider = %config.name,
            provider_type = %config.provider_type,
            "Creating provider instance"
        );

        if config.name == polyglot_abstraction::FALLBACK_PROVIDER_NAME {
            return Err(FactoryError::ReservedName(config.name.clone()));
        }

        let api_key = if config.provider_type.needs_api_key() {
            config.resolve_api_key()?
        } else {
            String::new()
        };

        let provider: Arc<dyn Provider> = match config.provider_type {
            ProviderType::DeepL => {
                let mut p = DeepLProvider::new(api_key).with_name(&config.name);
                if let Some(url) = &config.base_url {
                    p = p.with_base_url(url);
                }
                Arc::new(p)
            }
            ProviderType::Google => {
                let mut p = GoogleProvider::new(api_key).with_name(&config.name);
                if let Some(url) = &config.base_url {
                    p = p.with_base_url(url);
                }
                Arc::new(p)
            }
            ProviderType::Flash => {
                let mut p = FlashProvider::new(api_key).with_name(&config.name);
                if let Some(url) = &config.base_url {
                    p = p.with_base_url(url);
                }
                if let Some(model) = &config.model {
                    p = p.with_model(model);
                }
                Arc::new(p)
            }
            ProviderType::Mock => Arc::new(MockProvider::named(&config.name)),
        };

        Ok(provider)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_type_from_str() {
        assert_eq!("DeepL".parse::<ProviderType>(), Ok(ProviderType::DeepL));
        assert_eq!("gemini".parse::<ProviderType>(), Ok(ProviderType::Flash));
        assert_eq!("google-translate".parse::<ProviderType>(), Ok(ProviderType::Google));
        assert_eq!(
            "babelfish".parse::<ProviderType>(),
            Err(FactoryError::UnknownType("babelfish".to_string()))
        );
    }

    #[test]
    fn test_config_deserializes_with_defaults() {
        let config: ProviderConfig = toml::from_str(
            r#"
            name = "deepl"
            type = "deepl"
            api_key = "abc"
            "#,
        )
        .unwrap();
        assert_eq!(config.provider_type, ProviderType::DeepL);
        assert_eq!(config.priority, 100);
        assert!((config.cost_weight - 1.0).abs() < f64::EPSILON);
        assert!(config.enabled);
    }

    #[test]
    fn test_create_with_inline_key() {
        let config = ProviderConfig::new("primary", ProviderType::DeepL)
            .with_api_key("inline")
            .with_api_key_env("POLYGLOT_TEST_UNSET_DEEPL_KEY");
        let provider = ProviderFactory::create(&config).unwrap();
        assert_eq!(provider.name(), "primary");
    }

    #[test]
    fn test_create_without_key_fails() {
        let config = ProviderConfig::new("google", ProviderType::Google)
            .with_api_key_env("POLYGLOT_TEST_UNSET_GOOGLE_KEY");
        let err = ProviderFactory::create(&config).err().unwrap();
        assert_eq!(
            err,
            FactoryError::MissingApiKey {
                provider: "google".to_string(),
                env_var: "POLYGLOT_TEST_UNSET_GOOGLE_KEY".to_string(),
            }
        );
    }

    #[test]
    fn test_create_mock_needs_no_key() {
        let config = ProviderConfig::new("local", ProviderType::Mock);
        let provider = ProviderFactory::create(&config).unwrap();
        assert_eq!(provider.name(), "local");
    }

    #[test]
    fn test_reserved_name_rejected() {
        let config = ProviderConfig::new("mock_fallback", ProviderType::Mock);
        assert!(matches!(
            ProviderFactory::create(&config),
            Err(FactoryError::ReservedName(_))
        ));
    }
}
