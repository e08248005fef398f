//! Stats command - database statistics.

use anyhow::Result;
use clap::Args;
use console::{Style, style};
use marginalia_store::StoreStats;
use serde::Serialize;

use super::{Context, print_json};

/// Arguments for the stats command.
#[derive(Args, Debug)]
pub struct StatsArgs {}

/// Stats for JSON output.
#[derive(Debug, Serialize)]
struct StatsOutput {
    database: String,
    #[serde(flatten)]
    stats: StoreStats,
}

/// Run the stats command.
pub async fn run(_args: StatsArgs, ctx: &Context) -> Result<()> {
    let store = ctx.open_store()?;
    let stats = store.stats()?;

    if ctx.json_output {
        return print_json(&StatsOutput {
            database: ctx.database.display().to_string(),
            stats,
        });
    }

    let dim = Style::new().dim();
    println!();
    println!("{}", style("Marginalia Database").bold());
    println!("{}", dim.apply_to("─".repeat(40)));
    println!();
    println!("  {} {}", dim.apply_to("Database:"), ctx.database.display());
    println!("  {} {}", dim.apply_to("Notes:"), stats.note_count);
    println!("  {} {}", dim.apply_to("Visits:"), stats.visit_count);
    println!(
        "  {} {}",
        dim.apply_to("Source bindings:"),
        stats.source_binding_count
    );
    println!("  {} {}", dim.apply_to("Schema version:"), stats.schema_version);
    println!();

    Ok(())
}
