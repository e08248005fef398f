//! CLI command handlers.

pub mod add;
pub mod config;
pub mod delete;
pub mod edit;
pub mod list;
pub mod show;
pub mod sources;
pub mod stats;
pub mod visits;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use chrono::{DateTime, Local, Utc};
use console::Style;
use marginalia_config::{LoadedConfig, ScoringConfig};
use marginalia_domain::{NotesService, SystemClock};
use marginalia_store::{Note, NoteId, NoteStore, ScoringParams};
use serde::Serialize;

/// Shared context for all commands.
#[derive(Debug)]
pub struct Context {
    /// Output as JSON for scripting.
    pub json_output: bool,
    /// Verbose output enabled.
    pub verbose: bool,
    /// Resolved database location.
    pub database: PathBuf,
    /// Score model parameters after config overrides.
    pub scoring: ScoringParams,
    /// The merged configuration and where it came from.
    pub loaded: LoadedConfig,
}

impl Context {
    /// Open (or create) the note database.
    pub fn open_store(&self) -> Result<Arc<NoteStore>> {
        let store = NoteStore::open(&self.database)
            .with_context(|| format!("Failed to open database {}", self.database.display()))?;
        Ok(Arc::new(store))
    }

    /// Open the database and wrap it in a notes service on the system clock.
    pub fn notes_service(&self) -> Result<NotesService> {
        let store = self.open_store()?;
        Ok(NotesService::new(store, Arc::new(SystemClock), self.scoring))
    }
}

/// Apply `[scoring]` overrides on top of the built-in constants.
pub fn scoring_params(config: &ScoringConfig) -> Result<ScoringParams> {
    let defaults = ScoringParams::default();
    let params = ScoringParams {
        max_score: config.max_score.unwrap_or(defaults.max_score),
        min_score: config.min_score.unwrap_or(defaults.min_score),
        initial_score: config.initial_score.unwrap_or(defaults.initial_score),
        max_recovery_points: config
            .max_recovery_points
            .unwrap_or(defaults.max_recovery_points),
        min_recovery_points: config
            .min_recovery_points
            .unwrap_or(defaults.min_recovery_points),
        decay_per_day: config.decay_per_day.unwrap_or(defaults.decay_per_day),
        recovery_window_days: config
            .recovery_window_days
            .unwrap_or(defaults.recovery_window_days),
    };
    params
        .validate()
        .context("Invalid [scoring] configuration")?;
    Ok(params)
}

/// Clap value parser for note IDs.
pub fn parse_note_id(s: &str) -> std::result::Result<NoteId, String> {
    NoteId::parse(s).map_err(|e| e.to_string())
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Render a timestamp in local time.
pub fn format_time(at: &DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

/// One-line summary of a note body.
pub fn truncate(s: &str, max_len: usize) -> String {
    let s = s.replace('\n', " ");
    if s.chars().count() <= max_len {
        s
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}

/// "Author, Title" style attribution line, if the note has any.
pub fn attribution(note: &Note) -> Option<String> {
    let parts: Vec<&str> = [&note.author, &note.title, &note.page, &note.publisher]
        .into_iter()
        .filter_map(|f| f.as_deref())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(", "))
    }
}

/// Print a note in full.
pub fn print_note(note: &Note, current_score: i32) {
    let dim = Style::new().dim();
    let bold = Style::new().bold();

    println!("{}", bold.apply_to(format!("Note #{}", note.id)));
    println!("{}", dim.apply_to("─".repeat(50)));
    println!();
    println!("{}", note.text);
    println!();

    if let Some(attr) = attribution(note) {
        println!("  {} {}", dim.apply_to("Source:"), attr);
    }
    if let Some(url) = &note.url {
        println!("  {} {}", dim.apply_to("URL:"), url);
    }
    if !note.tags.is_empty() {
        println!("  {} {}", dim.apply_to("Tags:"), note.tags.join(", "));
    }
    println!("  {} {}", dim.apply_to("Score:"), score_style(current_score));
    println!("  {} {}", dim.apply_to("Visits:"), note.visit_count);
    println!("  {} {}", dim.apply_to("Created:"), format_time(&note.created_at));
    if let Some(at) = &note.last_visited_at {
        println!("  {} {}", dim.apply_to("Last visited:"), format_time(at));
    }
}

/// Color a score by how forgotten the note is.
pub fn score_style(score: i32) -> console::StyledObject<i32> {
    let style = match score {
        s if s < 50 => Style::new().red(),
        s if s < 90 => Style::new().yellow(),
        _ => Style::new().green(),
    };
    style.apply_to(score)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scoring_params_overlay() {
        let config = ScoringConfig {
            decay_per_day: Some(3),
            recovery_window_days: Some(7),
            ..ScoringConfig::default()
        };
        let params = scoring_params(&config).unwrap();
        assert_eq!(params.decay_per_day, 3);
        assert_eq!(params.recovery_window_days, 7);
        assert_eq!(params.max_score, ScoringParams::default().max_score);
    }

    #[test]
    fn test_scoring_params_rejects_inverted_range() {
        let config = ScoringConfig {
            min_score: Some(200),
            ..ScoringConfig::default()
        };
        assert!(scoring_params(&config).is_err());
    }

    #[test]
    fn test_truncate_counts_chars() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("line one\nline two", 40), "line one line two");
        assert_eq!(truncate("ééééééééééé", 8), "ééééé...");
    }

    #[test]
    fn test_parse_note_id() {
        assert_eq!(parse_note_id(" 12 "), Ok(NoteId(12)));
        assert!(parse_note_id("twelve").is_err());
    }
}
