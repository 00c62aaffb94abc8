//! Translate command implementation.

use super::build_router;
use crate::config::AppConfig;
use anyhow::{Context, Result};
use colored::Colorize;
use polyglot_abstraction::TranslationRequest;
use tracing::warn;

/// Arguments of `polyglot translate`.
#[derive(clap::Args, Debug)]
pub struct TranslateArgs {
    /// Text to translate
    pub text: String,

    /// Source language tag (e.g. es)
    #[arg(long)]
    pub from: String,

    /// Target language tag (e.g. en)
    #[arg(long)]
    pub to: String,

    /// Fail instead of answering from the local fallback
    #[arg(long)]
    pub strict: bool,

    /// Output the result as JSON
    #[arg(long)]
    pub json: bool,

    /// Print router statistics afterwards
    #[arg(long)]
    pub stats: bool,
}

/// Execute the translate command.
pub async fn execute(app: &AppConfig, args: TranslateArgs) -> Result<()> {
    let router = build_router(app)?;

    let mut request = TranslationRequest::new(args.text, &args.from, &args.to)
        .context("Invalid translation request")?;
    if args.strict {
        request = request.strict();
    }

    let result = router.translate(&request).await.context("Translation failed")?;

    if let Some(path) = &app.cache_file {
        if let Err(err) = router.save_cache(path) {
            warn!(path = %path.display(), error = %err, "Could not save cache");
        }
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{}", result.text);
        println!(
            "{}",
            format!(
                "provider: {}  confidence: {:.2}  latency: {}ms  cost: ${:.6}",
                result.provider,
                result.confidence,
                result.latency.as_millis(),
                result.cost
            )
            .dimmed()
        );
        if result.is_degraded() {
            eprintln!("{}", "warning: every provider failed, result is degraded".yellow());
        }
    }

    if args.stats {
        println!("{}", router.stats_json()?);
    }
    Ok(())
}
