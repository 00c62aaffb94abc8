//! Health command implementation.

use super::build_router;
use crate::config::AppConfig;
use anyhow::Result;
use colored::Colorize;

/// Probe every provider and print the results.
pub async fn execute(app: &AppConfig, json_output: bool) -> Result<()> {
    let router = build_router(app)?;
    let report = router.check_health().await;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    if report.is_empty() {
        println!("{}", "No providers configured.".yellow());
        return Ok(());
    }

    println!();
    println!("{}", "Provider Health".bold().green());
    println!();
    println!("{:<20} {:<12} {:<10} {:<10}", "Provider", "Status", "Errors", "Breaker");
    println!("{}", "─".repeat(55));

    for health in &report {
        let status = if health.healthy { "✓ healthy".green() } else { "✗ down".red() };
        let breaker = router
            .breaker_state(&health.provider)
            .map_or_else(|| "—".to_string(), |state| state.to_string());
        println!(
            "{:<20} {:<12} {:<10} {:<10}",
            health.provider,
            status,
            format!("{:.0}%", health.error_rate * 100.0),
            breaker
        );
    }
    println!();
    Ok(())
}
