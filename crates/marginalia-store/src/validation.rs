//! Validation and normalization for note content.
//!
//! Rules applied before a note is written:
//! - Body text is trimmed and must be non-empty, with no NUL bytes
//! - Each attribution field is trimmed; an empty value becomes absent
//! - Tags are trimmed and empty ones dropped; order and duplicates are kept

use crate::types::NoteContent;

// ─────────────────────────────────────────────────────────────────────────────
// Validation Error
// ─────────────────────────────────────────────────────────────────────────────

/// Specific validation error types for note data.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Note body is empty after trimming.
    #[error("note text is empty")]
    EmptyText,

    /// Note content contains NUL bytes.
    #[error("{field} contains NUL bytes")]
    NulByte {
        /// Name of the offending field.
        field: &'static str,
    },

    /// Scoring parameters do not describe a usable model.
    #[error("invalid scoring parameters: {0}")]
    InvalidScoring(String),
}

// ─────────────────────────────────────────────────────────────────────────────
// Note Content
// ─────────────────────────────────────────────────────────────────────────────

impl NoteContent {
    /// Return a normalized copy of this content, or the first rule it breaks.
    pub fn normalized(&self) -> Result<NoteContent, ValidationError> {
        let text = self.text.trim();
        if text.is_empty() {
            return Err(ValidationError::EmptyText);
        }
        reject_nul("text", text)?;

        let tags = self
            .tags
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .map(|t| reject_nul("tag", t).map(|_| t.to_string()))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(NoteContent {
            text: text.to_string(),
            author: optional_field("author", self.author.as_deref())?,
            title: optional_field("title", self.title.as_deref())?,
            page: optional_field("page", self.page.as_deref())?,
            publisher: optional_field("publisher", self.publisher.as_deref())?,
            url: optional_field("url", self.url.as_deref())?,
            tags,
        })
    }
}

fn optional_field(
    field: &'static str,
    value: Option<&str>,
) -> Result<Option<String>, ValidationError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => {
            reject_nul(field, v)?;
            Ok(Some(v.to_string()))
        }
        _ => Ok(None),
    }
}

fn reject_nul(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.contains('\0') {
        return Err(ValidationError::NulByte { field });
    }
    Ok(())
}
