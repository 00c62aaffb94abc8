//! Validate command implementation.

use crate::config::AppConfig;
use anyhow::Result;
use colored::Colorize;
use polyglot_router::QualityValidator;

/// Score a translation and print the report.
pub fn execute(
    app: &AppConfig,
    original: &str,
    intermediate: &str,
    final_text: &str,
    json_output: bool,
) -> Result<()> {
    let validator = QualityValidator::new(app.router.quality.clone());
    let report = validator.validate(original, intermediate, final_text);

    if json_output {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let verdict = if report.passed { "PASS".green().bold() } else { "FAIL".red().bold() };
    println!("Overall: {:.1} {}", report.overall, verdict);
    println!("  translation accuracy:       {:.1}", report.scores.translation_accuracy);
    println!("  sanitization effectiveness: {:.1}", report.scores.sanitization_effectiveness);
    println!("  intent preservation:        {:.1}", report.scores.intent_preservation);

    if !report.issues.is_empty() {
        println!();
        println!("{}", "Issues:".yellow());
        for issue in &report.issues {
            println!("  - [{}] {}", issue.dimension, issue.message);
        }
    }
    Ok(())
}
