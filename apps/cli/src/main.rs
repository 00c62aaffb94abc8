//! Polyglot CLI - command-line front end for the translation router.
//!
//! This CLI provides a `polyglot` command that loads provider configuration,
//! routes translations, probes provider health, and scores translations.

mod commands;
mod config;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Polyglot - resilient multi-provider translation
#[derive(Parser, Debug)]
#[command(
    name = "polyglot",
    author,
    version,
    about = "Polyglot - resilient multi-provider translation",
    long_about = "Routes translations across DeepL, Google, and Gemini Flash with circuit breakers,\ncaching, and a local fallback for degraded operation."
)]
struct Args {
    /// Log level (trace, debug, info, warn, error). RUST_LOG takes precedence.
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Configuration file (defaults to ./polyglot.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Translate text through the configured providers
    Translate(commands::translate::TranslateArgs),

    /// Probe every configured provider
    Health {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List configured providers
    Providers {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Score a translation for accuracy, sanitization, and intent
    Validate {
        /// Original source text
        original: String,

        /// Raw translation
        intermediate: String,

        /// Final, sanitized text
        #[arg(value_name = "FINAL")]
        final_text: String,

        /// Output the report as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing(log_level: &str) -> anyhow::Result<()> {
    let builder = FmtSubscriber::builder()
        .without_time()
        .with_target(false)
        .with_writer(std::io::stderr);

    if std::env::var_os("RUST_LOG").is_some() {
        let subscriber = builder.with_env_filter(EnvFilter::from_default_env()).finish();
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let level = match log_level {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        };
        let subscriber = builder.with_max_level(level).finish();
        tracing::subscriber::set_global_default(subscriber)?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level)?;

    let app = config::load(args.config.as_deref())?;

    match args.command {
        Command::Translate(translate) => commands::translate::execute(&app, translate).await,
        Command::Health { json } => commands::health::execute(&app, json).await,
        Command::Providers { json } => commands::providers::execute(&app, json),
        Command::Validate { original, intermediate, final_text, json } => {
            commands::validate::execute(&app, &original, &intermediate, &final_text, json)
        }
    }
}
