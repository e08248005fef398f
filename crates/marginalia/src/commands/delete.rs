//! Delete command - remove a note and its visit history.

use anyhow::{Result, bail};
use clap::Args;
use console::Style;
use marginalia_store::NoteId;
use serde_json::json;

use super::{Context, parse_note_id, print_json};

/// Arguments for the delete command.
#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// Note ID
    #[arg(value_parser = parse_note_id)]
    pub id: NoteId,
}

/// Run the delete command.
pub async fn run(args: DeleteArgs, ctx: &Context) -> Result<()> {
    let service = ctx.notes_service()?;

    if !service.delete_note(args.id)? {
        bail!("Note not found: {}", args.id);
    }

    if ctx.json_output {
        print_json(&json!({ "deleted": args.id }))?;
    } else {
        let green = Style::new().green();
        println!("{} Note #{} deleted", green.apply_to("✓"), args.id);
    }

    Ok(())
}
