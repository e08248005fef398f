//! List command - notes newest first, or most neglected first.

use anyhow::Result;
use clap::{Args, ValueEnum};
use console::{Style, style};

use super::{Context, attribution, print_json, score_style, truncate};

/// Listing order.
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortOrder {
    /// Newest first
    #[default]
    Created,
    /// Lowest current score first
    Neglect,
}

/// Arguments for the list command.
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Listing order
    #[arg(short, long, value_enum, default_value_t = SortOrder::Created)]
    pub sort: SortOrder,

    /// Only notes carrying this tag
    #[arg(short, long)]
    pub tag: Option<String>,

    /// Maximum notes to show
    #[arg(short, long, default_value = "20")]
    pub limit: usize,
}

/// Run the list command.
pub async fn run(args: ListArgs, ctx: &Context) -> Result<()> {
    let service = ctx.notes_service()?;

    let listed = match &args.tag {
        Some(tag) => service.list_notes_tagged(tag)?,
        None => service.list_notes()?,
    };
    let mut notes = match args.sort {
        SortOrder::Neglect => service.rank_by_neglect(listed),
        SortOrder::Created => service.score_notes(listed),
    };

    let total = notes.len();
    notes.truncate(args.limit);

    if ctx.json_output {
        return print_json(&notes);
    }

    let dim = Style::new().dim();
    let heading = match args.sort {
        SortOrder::Created => "Notes",
        SortOrder::Neglect => "Notes (most neglected first)",
    };
    println!("{}", style(heading).bold());
    println!("{}", dim.apply_to("─".repeat(50)));
    println!();

    if notes.is_empty() {
        println!("{}", dim.apply_to("No notes found"));
        return Ok(());
    }

    for scored in &notes {
        let note = &scored.note;
        println!(
            "{} {:>4}  {}",
            dim.apply_to(format!("[{:>4}]", note.id)),
            score_style(scored.current_score),
            truncate(&note.text, 60)
        );
        if let Some(attr) = attribution(note) {
            println!("{}", dim.apply_to(format!("              {}", truncate(&attr, 60))));
        }
    }

    if total > notes.len() {
        println!();
        println!(
            "{}",
            dim.apply_to(format!("... and {} more", total - notes.len()))
        );
    }

    Ok(())
}
