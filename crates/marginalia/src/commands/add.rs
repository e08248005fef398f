//! Add command - create a new note.

use anyhow::Result;
use clap::Args;
use console::Style;
use marginalia_store::NoteContent;

use super::{Context, print_json};

/// Arguments for the add command.
#[derive(Args, Debug)]
pub struct AddArgs {
    /// Note text
    pub text: String,

    /// Who said or wrote it
    #[arg(short, long)]
    pub author: Option<String>,

    /// Title of the work
    #[arg(long)]
    pub title: Option<String>,

    /// Page or location within the work
    #[arg(long)]
    pub page: Option<String>,

    /// Publisher or venue
    #[arg(long)]
    pub publisher: Option<String>,

    /// Link to the source
    #[arg(long)]
    pub url: Option<String>,

    /// Tags for the note (repeatable)
    #[arg(short, long = "tag")]
    pub tags: Vec<String>,
}

impl AddArgs {
    fn into_content(self) -> NoteContent {
        NoteContent {
            text: self.text,
            author: self.author,
            title: self.title,
            page: self.page,
            publisher: self.publisher,
            url: self.url,
            tags: self.tags,
        }
    }
}

/// Run the add command.
pub async fn run(args: AddArgs, ctx: &Context) -> Result<()> {
    let service = ctx.notes_service()?;
    let note = service.add_note(args.into_content())?;

    if ctx.json_output {
        print_json(&note)?;
    } else {
        let green = Style::new().green();
        let dim = Style::new().dim();
        println!(
            "{} Note added: {}",
            green.apply_to("✓"),
            dim.apply_to(format!("#{}", note.id))
        );
        if ctx.verbose {
            println!("{}", dim.apply_to(format!("Database: {}", ctx.database.display())));
        }
    }

    Ok(())
}
