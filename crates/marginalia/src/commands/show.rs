//! Show command - open a note, recording a visit.

use anyhow::{Result, bail};
use clap::Args;
use marginalia_store::NoteId;

use super::{Context, parse_note_id, print_json, print_note};

/// Arguments for the show command.
#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Note ID
    #[arg(value_parser = parse_note_id)]
    pub id: NoteId,
}

/// Run the show command.
pub async fn run(args: ShowArgs, ctx: &Context) -> Result<()> {
    let service = ctx.notes_service()?;

    let Some(note) = service.open_note(args.id).await? else {
        bail!("Note not found: {}", args.id);
    };

    if ctx.json_output {
        print_json(&note)?;
    } else {
        print_note(&note, note.score);
    }

    Ok(())
}
