//! Note CRUD, listing, and tag operations.

use chrono::{DateTime, SubsecRound, Utc};
use rusqlite::{Connection, params};
use tracing::debug;

use crate::error::{Result, StoreError};
use crate::score::ScoreState;
use crate::types::{Note, NoteContent, NoteId, decode_time, encode_time};

use super::NoteStore;

/// Column list matching [`NoteStore::row_to_note`].
const NOTE_COLUMNS: &str = "id, text, author, title, page, publisher, url, tags, created_at, \
     last_visited_at, visit_count, score, last_updated, visit_timestamps";

impl NoteStore {
    /// Insert a new note.
    ///
    /// The store assigns the ID; `created_at` is kept at millisecond precision.
    pub fn insert_note(
        &self,
        content: &NoteContent,
        created_at: DateTime<Utc>,
        score: &ScoreState,
    ) -> Result<Note> {
        let created_at = created_at.trunc_subsecs(3);
        let note = {
            let conn = self.conn.lock();

            let tags_json = serde_json::to_string(&content.tags)?;
            let timestamps_json = serde_json::to_string(&score.visit_timestamps)?;

            conn.execute(
                r#"
                INSERT INTO notes (text, author, title, page, publisher, url, tags, created_at,
                                   last_visited_at, visit_count, score, last_updated, visit_timestamps)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, NULL, 0, ?9, ?10, ?11)
                "#,
                params![
                    content.text,
                    content.author,
                    content.title,
                    content.page,
                    content.publisher,
                    content.url,
                    tags_json,
                    encode_time(&created_at),
                    score.score,
                    score.last_updated,
                    timestamps_json,
                ],
            )?;

            let id = NoteId(conn.last_insert_rowid());
            debug!("Inserted note {}", id);
            self.publish_locked(&conn);

            Note {
                id,
                text: content.text.clone(),
                author: content.author.clone(),
                title: content.title.clone(),
                page: content.page.clone(),
                publisher: content.publisher.clone(),
                url: content.url.clone(),
                tags: content.tags.clone(),
                created_at,
                last_visited_at: None,
                visit_count: 0,
                score: score.score,
                last_updated: score.last_updated,
                visit_timestamps: score.visit_timestamps.clone(),
            }
        };

        Ok(note)
    }

    /// Get a note by ID.
    pub fn get_note(&self, id: NoteId) -> Result<Option<Note>> {
        let conn = self.conn.lock();
        Self::fetch_note(&conn, id)
    }

    /// Update the content fields of a note.
    ///
    /// Identity, creation time, and scoring fields are not touched.
    pub fn update_note(&self, note: &Note) -> Result<()> {
        let conn = self.conn.lock();

        let tags_json = serde_json::to_string(&note.tags)?;

        let rows_affected = conn.execute(
            r#"
            UPDATE notes
            SET text = ?2, author = ?3, title = ?4, page = ?5, publisher = ?6, url = ?7, tags = ?8
            WHERE id = ?1
            "#,
            params![
                note.id.0,
                note.text,
                note.author,
                note.title,
                note.page,
                note.publisher,
                note.url,
                tags_json,
            ],
        )?;

        if rows_affected == 0 {
            return Err(StoreError::NotFound(format!("Note {}", note.id)));
        }
        debug!("Updated note {}", note.id);
        self.publish_locked(&conn);
        Ok(())
    }

    /// Delete a note by ID. Its visit log goes with it.
    pub fn delete_note(&self, id: NoteId) -> Result<bool> {
        let conn = self.conn.lock();
        let rows_affected = conn.execute("DELETE FROM notes WHERE id = ?1", params![id.0])?;

        if rows_affected > 0 {
            debug!("Deleted note {}", id);
            self.publish_locked(&conn);
        }
        Ok(rows_affected > 0)
    }

    /// List all notes, newest first.
    pub fn list_all_notes(&self) -> Result<Vec<Note>> {
        let conn = self.conn.lock();
        Self::query_listing(&conn)
    }

    /// The newest-first listing, read through a connection the caller holds.
    pub(crate) fn query_listing(conn: &Connection) -> Result<Vec<Note>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM notes ORDER BY created_at DESC, id DESC",
            NOTE_COLUMNS
        ))?;

        let mut rows = stmt.query([])?;

        let mut notes = Vec::new();
        while let Some(row) = rows.next()? {
            notes.push(Self::row_to_note(row)?);
        }

        Ok(notes)
    }

    /// Count all notes.
    pub fn count_notes(&self) -> Result<usize> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM notes", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// List notes carrying a specific tag, newest first.
    pub fn list_notes_by_tag(&self, tag: &str) -> Result<Vec<Note>> {
        let conn = self.conn.lock();

        let pattern = format!("%{}%", serde_json::to_string(tag)?);

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM notes WHERE tags LIKE ?1 ORDER BY created_at DESC, id DESC",
            NOTE_COLUMNS
        ))?;

        let mut rows = stmt.query(params![pattern])?;

        // LIKE narrows the scan; exact membership is checked on the decoded tags
        let mut notes = Vec::new();
        while let Some(row) = rows.next()? {
            let note = Self::row_to_note(row)?;
            if note.tags.iter().any(|t| t == tag) {
                notes.push(note);
            }
        }

        Ok(notes)
    }

    /// Load a note through an existing connection or transaction.
    pub(crate) fn fetch_note(conn: &Connection, id: NoteId) -> Result<Option<Note>> {
        let mut stmt = conn.prepare(&format!("SELECT {} FROM notes WHERE id = ?1", NOTE_COLUMNS))?;

        let mut rows = stmt.query(params![id.0])?;

        if let Some(row) = rows.next()? {
            Ok(Some(Self::row_to_note(row)?))
        } else {
            Ok(None)
        }
    }

    /// Convert a database row to a Note struct.
    ///
    /// Expected column order is [`NOTE_COLUMNS`].
    pub(crate) fn row_to_note(row: &rusqlite::Row) -> Result<Note> {
        let id: i64 = row.get(0)?;
        let tags_json: String = row.get(7)?;
        let created_at_str: String = row.get(8)?;
        let last_visited_str: Option<String> = row.get(9)?;
        let visit_count: i64 = row.get(10)?;
        let timestamps_json: String = row.get(13)?;

        Ok(Note {
            id: NoteId(id),
            text: row.get(1)?,
            author: row.get(2)?,
            title: row.get(3)?,
            page: row.get(4)?,
            publisher: row.get(5)?,
            url: row.get(6)?,
            tags: serde_json::from_str(&tags_json)?,
            created_at: decode_time(&created_at_str)?,
            last_visited_at: last_visited_str.as_deref().map(decode_time).transpose()?,
            visit_count: u64::try_from(visit_count).map_err(|_| {
                StoreError::InvalidData(format!("negative visit count {}", visit_count))
            })?,
            score: row.get(11)?,
            last_updated: row.get(12)?,
            visit_timestamps: serde_json::from_str(&timestamps_json)?,
        })
    }
}
