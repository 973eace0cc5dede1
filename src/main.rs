use std::io::{self, BufRead};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::info;

use gatekeeper::config::Config;
use gatekeeper::engine::{Evaluation, ModerationEngine};
use gatekeeper::output::terminal;
use gatekeeper::pipeline::scan::{self, ScanSummary};

/// Gatekeeper: chat moderation decisions from pattern evidence and an
/// attribute-scoring oracle.
#[derive(Parser)]
#[command(name = "gatekeeper", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show every step of the decision for one message
    Check {
        /// The message text to check
        text: String,

        /// Print the evaluation as JSON
        #[arg(long)]
        json: bool,
    },

    /// Evaluate one message per line from a file (or stdin)
    Scan {
        /// File to read messages from (default: stdin)
        #[arg(long)]
        file: Option<PathBuf>,

        /// Number of messages to evaluate in parallel (default: 8)
        #[arg(long, default_value = "8")]
        concurrency: usize,

        /// Print flagged evaluations and the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate and display the active policy and settings
    Policy,
}

#[derive(Serialize)]
struct ScanOutput<'a> {
    flagged: Vec<&'a Evaluation>,
    summary: ScanSummary,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    // Set up structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("gatekeeper=info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load().context("Failed to load configuration")?;

    match cli.command {
        Commands::Check { text, json } => {
            let engine = build_engine(&config)?;
            let evaluation = engine.inspect(&text).await;

            if json {
                println!("{}", serde_json::to_string_pretty(&evaluation)?);
            } else {
                terminal::display_evaluation(&evaluation, &engine);
            }
        }

        Commands::Scan {
            file,
            concurrency,
            json,
        } => {
            let engine = build_engine(&config)?;
            let messages = read_messages(file.as_ref())?;
            info!(
                messages = messages.len(),
                concurrency, "Scanning messages"
            );

            // Progress bar for file input only
            let progress = match &file {
                Some(_) if !json => {
                    let pb = ProgressBar::new(messages.len() as u64);
                    pb.set_style(
                        ProgressStyle::default_bar()
                            .template("  Evaluating [{bar:30}] {pos}/{len} ({eta})")
                            .context("Invalid progress bar template")?,
                    );
                    Some(pb)
                }
                _ => None,
            };

            let report = scan::run(&engine, messages, concurrency, progress.as_ref()).await;
            if let Some(pb) = &progress {
                pb.finish_and_clear();
            }

            if json {
                let output = ScanOutput {
                    flagged: report.flagged().collect(),
                    summary: report.summary,
                };
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                for evaluation in report.flagged() {
                    terminal::display_flagged(evaluation);
                }
                terminal::display_scan_summary(&report.summary);
            }
        }

        Commands::Policy => {
            let policy = config.load_policy().context("Policy is invalid")?;
            let engine = ModerationEngine::with_scorer(&config, &policy, config.build_scorer())
                .context("Failed to start moderation engine")?;
            terminal::display_policy(&policy, &config, &engine);
        }
    }

    Ok(())
}

fn build_engine(config: &Config) -> Result<ModerationEngine> {
    if !config.has_perspective() {
        info!("PERSPECTIVE_API_KEY not set, running in pattern-only mode");
    }
    ModerationEngine::from_config(config).context("Failed to start moderation engine")
}

/// One message per non-blank line.
fn read_messages(file: Option<&PathBuf>) -> Result<Vec<String>> {
    let lines: Vec<String> = match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?
            .lines()
            .map(str::to_string)
            .collect(),
        None => io::stdin()
            .lock()
            .lines()
            .collect::<io::Result<Vec<_>>>()
            .context("Failed to read messages from stdin")?,
    };
    Ok(lines.into_iter().filter(|l| !l.trim().is_empty()).collect())
}
