//! finality - operator CLI for the governance ledger
//!
//! This CLI lets operators and collaborating tools:
//! - Record issued/executed artifacts, explicit rejections and review completions
//! - Query the ledger by actor, entry type, artifact and time range
//! - Generate distribution reports
//! - Validate the full hash chain and record lifecycles
//! - Check signals against the boundary rule tables
//! - Run the invariant failure drills
//!
//! Exit codes: 0 success, 1 runtime error, 2 validation failure or blocked
//! signal, 3 integrity failure.

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;
mod error;
mod output;

use commands::{audit, query, record, signal, Context};
use config::{FinalityConfig, LoggingConfig};
use error::{CliResult, Status};
use output::OutputFormat;

/// finality CLI application
#[derive(Parser)]
#[command(name = "finality")]
#[command(about = "Governance ledger and settlement-finality operator CLI", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "FINALITY_CONFIG")]
    config: Option<String>,

    /// Ledger file (overrides ledger.path)
    #[arg(short, long, env = "FINALITY_LEDGER_PATH")]
    ledger: Option<String>,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    format: OutputFormat,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand)]
enum Commands {
    /// Record that an artifact was issued or executed
    RecordArtifact(record::ArtifactArgs),

    /// Record an explicit rejection of an artifact
    RecordRejection(record::RejectionArgs),

    /// Record a completed human review, subject to the latency gate
    RecordReview(record::ReviewArgs),

    /// Query ledger entries
    Query(query::QueryArgs),

    /// Summarize the ledger
    Report,

    /// Verify the hash chain and every record lifecycle
    Validate,

    /// Check a signal against the boundary rules
    CheckSignal(signal::SignalArgs),

    /// Run the invariant failure drills
    Drill,

    /// Show the effective configuration
    Config,
}

fn init_tracing(logging: &LoggingConfig, verbose: bool) {
    let level = if verbose {
        "debug".to_string()
    } else {
        logging.level.clone()
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| level.into());

    // Logs go to stderr; stdout carries command output.
    if logging.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .without_time()
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

fn run(cli: Cli) -> CliResult<Status> {
    let mut config =
        FinalityConfig::load(cli.config.as_deref()).context("failed to load configuration")?;
    if let Some(path) = cli.ledger {
        config.ledger.path = path;
    }
    init_tracing(&config.logging, cli.verbose);

    let ctx = Context::new(config, cli.format);
    match cli.command {
        Commands::RecordArtifact(args) => record::record_artifact(args, &ctx),
        Commands::RecordRejection(args) => record::record_rejection(args, &ctx),
        Commands::RecordReview(args) => record::record_review(args, &ctx),
        Commands::Query(args) => query::execute(args, &ctx),
        Commands::Report => audit::report(&ctx),
        Commands::Validate => audit::validate(&ctx),
        Commands::CheckSignal(args) => signal::execute(args, &ctx),
        Commands::Drill => audit::drill(&ctx),
        Commands::Config => audit::show_config(&ctx),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(status) => status.into(),
        Err(err) => {
            output::print_error(&format!("{err:#}"));
            ExitCode::from(error::failure_code(&err))
        }
    }
}
