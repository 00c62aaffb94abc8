//! Subcommand implementations.

pub mod health;
pub mod providers;
pub mod translate;
pub mod validate;

use crate::config::AppConfig;
use anyhow::{Context, Result};
use polyglot_router::Router;

/// Builds the router described by `app`, warming the cache when a
/// snapshot file is configured.
pub fn build_router(app: &AppConfig) -> Result<Router> {
    let router = Router::from_configs(app.router.clone(), &app.providers)
        .context("Failed to build providers")?;
    if let Some(path) = &app.cache_file {
        router.warm_cache(path);
    }
    Ok(router)
}
