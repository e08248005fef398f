//! Visits command - the visit log of one note.

use anyhow::{Result, bail};
use clap::Args;
use console::{Style, style};
use marginalia_store::NoteId;

use super::{Context, format_time, parse_note_id, print_json};

/// Arguments for the visits command.
#[derive(Args, Debug)]
pub struct VisitsArgs {
    /// Note ID
    #[arg(value_parser = parse_note_id)]
    pub id: NoteId,
}

/// Run the visits command.
pub async fn run(args: VisitsArgs, ctx: &Context) -> Result<()> {
    let service = ctx.notes_service()?;

    if service.get_note(args.id)?.is_none() {
        bail!("Note not found: {}", args.id);
    }
    let visits = service.visits(args.id)?;

    if ctx.json_output {
        return print_json(&visits);
    }

    let dim = Style::new().dim();
    println!("{}", style(format!("Visits to note #{}", args.id)).bold());
    println!("{}", dim.apply_to("─".repeat(50)));
    println!();

    if visits.is_empty() {
        println!("{}", dim.apply_to("Never visited"));
    } else {
        for visit in &visits {
            println!("  {}", format_time(&visit.visited_at));
        }
        println!();
        println!("{}", dim.apply_to(format!("{} visit(s)", visits.len())));
    }

    Ok(())
}
