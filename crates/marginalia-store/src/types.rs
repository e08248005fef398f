//! Note, visit, and source-binding records.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};
use crate::score::ScoreState;

// ─────────────────────────────────────────────────────────────────────────────
// Identifiers
// ─────────────────────────────────────────────────────────────────────────────

/// Store-assigned note identifier. Never reused once assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteId(pub i64);

impl NoteId {
    /// Parse an ID from its decimal string form.
    pub fn parse(s: &str) -> Result<Self> {
        s.trim()
            .parse::<i64>()
            .map(Self)
            .map_err(|e| StoreError::InvalidData(format!("invalid note id '{}': {}", s, e)))
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a row in the visit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VisitId(pub i64);

impl fmt::Display for VisitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Note content
// ─────────────────────────────────────────────────────────────────────────────

/// The user-editable part of a note: body text, attribution, and tags.
///
/// Used both as the draft for a new note and as the replacement payload
/// for an edit. Run it through [`NoteContent::normalized`] before storing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteContent {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl NoteContent {
    /// Create note content with just a body.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// Set the author (or speaker) of the quoted text.
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    /// Set the source title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the page reference.
    pub fn with_page(mut self, page: impl Into<String>) -> Self {
        self.page = Some(page.into());
        self
    }

    /// Set the publisher.
    pub fn with_publisher(mut self, publisher: impl Into<String>) -> Self {
        self.publisher = Some(publisher.into());
        self
    }

    /// Set the source URL.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Append a tag.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Note
// ─────────────────────────────────────────────────────────────────────────────

/// A persisted note with its visit-tracking and scoring fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Set once at insert.
    pub created_at: DateTime<Utc>,
    pub last_visited_at: Option<DateTime<Utc>>,
    pub visit_count: u64,
    /// Forgetting score as of `last_updated`.
    pub score: i32,
    /// Epoch millis at which `score` was last recalculated.
    pub last_updated: i64,
    /// Epoch millis of visits inside the trailing recovery window.
    pub visit_timestamps: Vec<i64>,
}

impl Note {
    /// Snapshot of the scoring fields.
    pub fn score_state(&self) -> ScoreState {
        ScoreState {
            score: self.score,
            last_updated: self.last_updated,
            visit_timestamps: self.visit_timestamps.clone(),
        }
    }

    /// Replace the scoring fields with a recalculated state.
    pub fn with_score_state(mut self, state: ScoreState) -> Self {
        self.score = state.score;
        self.last_updated = state.last_updated;
        self.visit_timestamps = state.visit_timestamps;
        self
    }

    /// The user-editable fields of this note.
    pub fn content(&self) -> NoteContent {
        NoteContent {
            text: self.text.clone(),
            author: self.author.clone(),
            title: self.title.clone(),
            page: self.page.clone(),
            publisher: self.publisher.clone(),
            url: self.url.clone(),
            tags: self.tags.clone(),
        }
    }

    /// Replace the user-editable fields, leaving identity and scoring intact.
    pub fn with_content(mut self, content: NoteContent) -> Self {
        self.text = content.text;
        self.author = content.author;
        self.title = content.title;
        self.page = content.page;
        self.publisher = content.publisher;
        self.url = content.url;
        self.tags = content.tags;
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Visit log and source bindings
// ─────────────────────────────────────────────────────────────────────────────

/// One entry in the append-only visit log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteVisit {
    pub id: VisitId,
    pub note_id: NoteId,
    pub visited_at: DateTime<Utc>,
}

/// A `(speaker, title)` pair mapped to the source it was published in.
///
/// Derived from existing notes when the schema gained the table; nothing
/// in the scoring path reads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceBinding {
    pub id: i64,
    pub speaker: String,
    pub title: String,
    pub source: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Timestamp encoding
// ─────────────────────────────────────────────────────────────────────────────

/// Encode a timestamp for storage (fixed-width RFC 3339, millisecond precision).
pub(crate) fn encode_time(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Decode a stored timestamp.
pub(crate) fn decode_time(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::InvalidData(format!("bad timestamp '{}': {}", s, e)))
}
