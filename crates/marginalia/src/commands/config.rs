//! Config command - show or initialize configuration.

use anyhow::{Result, anyhow};
use clap::Args;
use console::{Style, style};
use marginalia_config::{MarginaliaConfig, ScoringConfig, StorageConfig};
use marginalia_store::ScoringParams;
use serde::Serialize;

use super::{Context, print_json};

/// Arguments for the config command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Only print the user config file path
    #[arg(long, conflicts_with = "init")]
    pub path: bool,

    /// Write a user config file with the current settings
    #[arg(long)]
    pub init: bool,
}

/// Resolved configuration for JSON output.
#[derive(Debug, Serialize)]
struct ConfigOutput<'a> {
    sources: Vec<String>,
    warnings: &'a [String],
    database: String,
    scoring: &'a ScoringParams,
}

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    if args.path {
        return cmd_path();
    }
    if args.init {
        return cmd_init(ctx);
    }
    cmd_show(ctx)
}

fn cmd_path() -> Result<()> {
    let path = marginalia_config::xdg_config_path()
        .ok_or_else(|| anyhow!("Could not determine config directory"))?;
    println!("{}", path.display());
    Ok(())
}

fn cmd_show(ctx: &Context) -> Result<()> {
    let loaded = &ctx.loaded;

    if ctx.json_output {
        return print_json(&ConfigOutput {
            sources: loaded
                .loaded_from()
                .iter()
                .map(|p| p.display().to_string())
                .collect(),
            warnings: &loaded.warnings,
            database: ctx.database.display().to_string(),
            scoring: &ctx.scoring,
        });
    }

    let dim = Style::new().dim();
    println!("{}", style("Marginalia Configuration").bold());
    println!("{}", dim.apply_to("─".repeat(50)));
    println!();

    println!("Config file search order (later overrides earlier):");
    for source in &loaded.sources {
        let status = if source.loaded {
            "✓ loaded"
        } else {
            "· not found"
        };
        println!(
            "  {} {:<8} {}",
            status,
            source.layer,
            source.path.display()
        );
    }
    for warning in &loaded.warnings {
        println!("  {} {}", Style::new().yellow().apply_to("!"), warning);
    }
    println!();

    println!("  {} {}", dim.apply_to("Database:"), ctx.database.display());
    println!();

    let s = &ctx.scoring;
    println!("Scoring:");
    println!("  {} {}", dim.apply_to("initial_score:"), s.initial_score);
    println!(
        "  {} [{}, {}]",
        dim.apply_to("score range:"),
        s.min_score,
        s.max_score
    );
    println!("  {} {}", dim.apply_to("decay_per_day:"), s.decay_per_day);
    println!(
        "  {} [{}, {}]",
        dim.apply_to("recovery points:"),
        s.min_recovery_points,
        s.max_recovery_points
    );
    println!(
        "  {} {} days",
        dim.apply_to("recovery window:"),
        s.recovery_window_days
    );

    Ok(())
}

fn cmd_init(ctx: &Context) -> Result<()> {
    let path = marginalia_config::xdg_config_path()
        .ok_or_else(|| anyhow!("Could not determine config directory"))?;

    if path.exists() {
        println!("Config file already exists: {}", path.display());
        return Ok(());
    }

    let s = &ctx.scoring;
    let config = MarginaliaConfig {
        storage: Some(StorageConfig {
            database: Some(ctx.database.clone()),
        }),
        scoring: Some(ScoringConfig {
            max_score: Some(s.max_score),
            min_score: Some(s.min_score),
            initial_score: Some(s.initial_score),
            max_recovery_points: Some(s.max_recovery_points),
            min_recovery_points: Some(s.min_recovery_points),
            decay_per_day: Some(s.decay_per_day),
            recovery_window_days: Some(s.recovery_window_days),
        }),
        logging: None,
    };
    marginalia_config::save_config(&config, &path)?;

    let green = Style::new().green();
    println!("{} Created config file: {}", green.apply_to("✓"), path.display());
    Ok(())
}
