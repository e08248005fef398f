//! Sources command - attribution pairs bound to where they were published.

use anyhow::{Result, bail};
use clap::Args;
use console::{Style, style};

use super::{Context, print_json};

/// Arguments for the sources command.
#[derive(Args, Debug)]
pub struct SourcesArgs {
    /// Bind attribution pairs from notes added since the last refresh
    #[arg(long)]
    pub refresh: bool,

    /// Look up one binding by speaker (requires --title)
    #[arg(long, requires = "title")]
    pub speaker: Option<String>,

    /// Look up one binding by title (requires --speaker)
    #[arg(long, requires = "speaker")]
    pub title: Option<String>,
}

/// Run the sources command.
pub async fn run(args: SourcesArgs, ctx: &Context) -> Result<()> {
    let store = ctx.open_store()?;
    let dim = Style::new().dim();

    if args.refresh {
        let added = store.refresh_source_bindings()?;
        if !ctx.json_output {
            println!("{}", dim.apply_to(format!("{} new binding(s)", added)));
        }
    }

    if let (Some(speaker), Some(title)) = (&args.speaker, &args.title) {
        let Some(binding) = store.find_source_binding(speaker, title)? else {
            bail!("No source binding for {} / {}", speaker, title);
        };
        if ctx.json_output {
            return print_json(&binding);
        }
        println!(
            "{} / {}  {}",
            binding.speaker,
            binding.title,
            binding.source.as_deref().unwrap_or("-")
        );
        return Ok(());
    }

    let bindings = store.list_source_bindings()?;
    if ctx.json_output {
        return print_json(&bindings);
    }

    println!("{}", style("Source Bindings").bold());
    println!("{}", dim.apply_to("─".repeat(50)));
    println!();

    if bindings.is_empty() {
        println!("{}", dim.apply_to("No source bindings"));
    } else {
        for binding in &bindings {
            println!(
                "  {} / {}  {}",
                binding.speaker,
                binding.title,
                dim.apply_to(binding.source.as_deref().unwrap_or("-"))
            );
        }
    }

    Ok(())
}
