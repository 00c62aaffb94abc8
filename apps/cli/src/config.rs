//! CLI configuration loading and merging.

use anyhow::{Context, Result};
use ::config::{Config, Environment, File, FileFormat};
use polyglot_providers::ProviderConfig;
use polyglot_router::RouterConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "polyglot.toml";

/// Prefix of environment overrides, e.g. `POLYGLOT_ROUTER__STRICT_MODE=true`.
pub const ENV_PREFIX: &str = "POLYGLOT";

/// Everything the CLI needs to build a router.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Router settings.
    #[serde(default)]
    pub router: RouterConfig,
    /// Providers, in declaration order.
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,
    /// Cache snapshot loaded at startup and saved after each translation.
    #[serde(default)]
    pub cache_file: Option<PathBuf>,
}

/// Load and merge CLI configuration.
///
/// Configuration precedence:
/// 1. Environment variables (`POLYGLOT_` prefix, `__` between sections)
/// 2. The file given with `--config`, or `./polyglot.toml` if it exists
/// 3. Defaults
pub fn load(path: Option<&Path>) -> Result<AppConfig> {
    let file = match path {
        Some(path) => File::from(path).format(FileFormat::Toml).required(true),
        None => File::with_name(DEFAULT_CONFIG_FILE).format(FileFormat::Toml).required(false),
    };

    let settings = Config::builder()
        .add_source(file)
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .context("Failed to load configuration")?;

    let app: AppConfig = settings.try_deserialize().context("Invalid configuration")?;
    app.router.validate().context("Invalid router configuration")?;
    Ok(app)
}
