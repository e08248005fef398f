//! Edit command - change a note's content without counting a visit.

use anyhow::{Result, bail};
use clap::Args;
use console::Style;
use marginalia_store::{NoteContent, NoteId};

use super::{Context, parse_note_id, print_json};

/// Arguments for the edit command.
///
/// Omitted options keep their current value; an empty string clears the field.
#[derive(Args, Debug)]
pub struct EditArgs {
    /// Note ID
    #[arg(value_parser = parse_note_id)]
    pub id: NoteId,

    /// New note text
    #[arg(long)]
    pub text: Option<String>,

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

    /// Replace all tags (repeatable)
    #[arg(short, long = "tag")]
    pub tags: Vec<String>,

    /// Remove all tags
    #[arg(long, conflicts_with = "tags")]
    pub clear_tags: bool,
}

impl EditArgs {
    /// Overlay the given options on the current content.
    fn apply(self, current: NoteContent) -> NoteContent {
        // Empty values survive here; normalization turns them into None.
        let tags = if self.clear_tags {
            Vec::new()
        } else if self.tags.is_empty() {
            current.tags
        } else {
            self.tags
        };

        NoteContent {
            text: self.text.unwrap_or(current.text),
            author: self.author.or(current.author),
            title: self.title.or(current.title),
            page: self.page.or(current.page),
            publisher: self.publisher.or(current.publisher),
            url: self.url.or(current.url),
            tags,
        }
    }
}

/// Run the edit command.
pub async fn run(args: EditArgs, ctx: &Context) -> Result<()> {
    let service = ctx.notes_service()?;

    let Some(note) = service.get_note(args.id)? else {
        bail!("Note not found: {}", args.id);
    };
    let id = args.id;
    let content = args.apply(note.content());
    let updated = service.edit_note(id, content)?;

    if ctx.json_output {
        print_json(&updated)?;
    } else {
        let green = Style::new().green();
        println!("{} Note #{} updated", green.apply_to("✓"), id);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(id: i64) -> EditArgs {
        EditArgs {
            id: NoteId(id),
            text: None,
            author: None,
            title: None,
            page: None,
            publisher: None,
            url: None,
            tags: Vec::new(),
            clear_tags: false,
        }
    }

    fn current() -> NoteContent {
        NoteContent::new("body")
            .with_author("Epictetus")
            .with_title("Enchiridion")
            .with_tag("stoic")
    }

    #[test]
    fn test_omitted_fields_are_kept() {
        let content = args(1).apply(current());
        assert_eq!(content, current());
    }

    #[test]
    fn test_empty_string_clears_after_normalization() {
        let edit = EditArgs {
            author: Some(String::new()),
            ..args(1)
        };
        let content = edit.apply(current()).normalized().unwrap();
        assert_eq!(content.author, None);
        assert_eq!(content.title.as_deref(), Some("Enchiridion"));
    }

    #[test]
    fn test_tags_replace_or_clear() {
        let edit = EditArgs {
            tags: vec!["a".to_string(), "b".to_string()],
            ..args(1)
        };
        assert_eq!(edit.apply(current()).tags, vec!["a", "b"]);

        let edit = EditArgs {
            clear_tags: true,
            ..args(1)
        };
        assert!(edit.apply(current()).tags.is_empty());
    }
}
