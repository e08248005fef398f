//! Marginalia - a note keeper that remembers what you forget
//!
//! Main entry point for the Marginalia CLI.

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use marginalia_config::LoadedConfig;
use tracing::warn;

mod commands;

use commands::{add, config, delete, edit, list, show, sources, stats, visits};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// Marginalia - a note keeper that remembers what you forget
#[derive(Parser)]
#[command(name = "marginalia")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    /// Database file (default: from config, then the platform data dir)
    #[arg(long, global = true, env = "MARGINALIA_DB_PATH")]
    pub database: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Add a note
    Add(add::AddArgs),

    /// List notes, newest or most neglected first
    List(list::ListArgs),

    /// Open a note (counts as a visit)
    Show(show::ShowArgs),

    /// Edit a note's text, attribution, or tags
    Edit(edit::EditArgs),

    /// Delete a note and its visit history
    Delete(delete::DeleteArgs),

    /// Show the visit history of a note
    Visits(visits::VisitsArgs),

    /// List or look up source bindings
    Sources(sources::SourcesArgs),

    /// Show database statistics
    Stats(stats::StatsArgs),

    /// Show the resolved configuration
    Config(config::ConfigArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let loaded = marginalia_config::load_config(None).context("Failed to load configuration")?;

    // Console (human-readable, stderr) + rotating JSON file
    let _guard = init_tracing(&loaded, cli.verbose);

    for warning in &loaded.warnings {
        warn!("{}", warning);
    }

    let database = cli
        .database
        .clone()
        .unwrap_or_else(|| loaded.config.storage().effective_database_path());
    let scoring = commands::scoring_params(&loaded.config.scoring())?;

    let ctx = commands::Context {
        json_output: cli.json,
        verbose: cli.verbose,
        database,
        scoring,
        loaded,
    };

    // Dispatch to command handlers
    match cli.command {
        Commands::Add(args) => add::run(args, &ctx).await,
        Commands::List(args) => list::run(args, &ctx).await,
        Commands::Show(args) => show::run(args, &ctx).await,
        Commands::Edit(args) => edit::run(args, &ctx).await,
        Commands::Delete(args) => delete::run(args, &ctx).await,
        Commands::Visits(args) => visits::run(args, &ctx).await,
        Commands::Sources(args) => sources::run(args, &ctx).await,
        Commands::Stats(args) => stats::run(args, &ctx).await,
        Commands::Config(args) => config::run(args, &ctx).await,
    }
}

/// Install the tracing subscriber.
///
/// The returned guard flushes the file writer and must outlive `main`'s work.
fn init_tracing(
    loaded: &LoadedConfig,
    verbose: bool,
) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::prelude::*;

    let filter = if verbose {
        "marginalia=debug,marginalia_domain=debug,marginalia_store=debug,marginalia_config=debug,info"
    } else {
        "marginalia=warn,marginalia_domain=warn,marginalia_store=warn,marginalia_config=warn,warn"
    };

    let logging = loaded.config.logging();
    let (file_layer, guard) = if logging.file {
        let log_dir =
            logging.effective_directory(marginalia_config::xdg_config_dir().as_deref());
        let file_appender = tracing_appender::rolling::daily(&log_dir, "marginalia.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        let layer = tracing_subscriber::fmt::layer()
            .json()
            .with_writer(non_blocking)
            .with_filter(tracing_subscriber::EnvFilter::new(
                "marginalia=trace,marginalia_domain=trace,marginalia_store=trace,marginalia_config=trace,info",
            ));
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .with_filter(tracing_subscriber::EnvFilter::new(filter)),
        )
        .with(file_layer)
        .init();

    guard
}
