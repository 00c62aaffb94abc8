//! Providers command implementation.

use super::build_router;
use crate::config::AppConfig;
use anyhow::Result;
use colored::Colorize;

/// List the providers the router would use, in declaration order.
pub fn execute(app: &AppConfig, json_output: bool) -> Result<()> {
    let router = build_router(app)?;
    let providers = router.providers();

    if json_output {
        println!("{}", serde_json::to_string_pretty(&providers)?);
        return Ok(());
    }

    if providers.is_empty() {
        println!("{}", "No providers configured; every request uses the local fallback.".yellow());
        return Ok(());
    }

    println!("{:<20} {:<10} {:<12} {:<10}", "Provider", "Priority", "Cost weight", "Languages");
    println!("{}", "─".repeat(55));
    for provider in &providers {
        let languages = if provider.supported_languages == 0 {
            "any".to_string()
        } else {
            provider.supported_languages.to_string()
        };
        println!(
            "{:<20} {:<10} {:<12} {:<10}",
            provider.name.cyan(),
            provider.priority,
            format!("{:.2}", provider.cost_weight),
            languages
        );
    }
    Ok(())
}
