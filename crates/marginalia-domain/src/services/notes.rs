//! Note management service.
//!
//! The entry point front ends use for everything a user does with notes.
//! Opening a note goes through the [`VisitCoordinator`]; every other
//! operation is a single backend call.

use std::cmp::Ordering;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use marginalia_store::{
    Note, NoteBackend, NoteContent, NoteId, NoteVisit, ScoreModel, ScoringParams, VisitLog,
};
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::clock::Clock;
use crate::error::{DomainError, Result};
use crate::services::visit::VisitCoordinator;

/// A note paired with its score decayed to the current time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredNote {
    #[serde(flatten)]
    pub note: Note,
    pub current_score: i32,
}

/// Note management service.
#[derive(Clone)]
pub struct NotesService {
    notes: Arc<dyn NoteBackend>,
    visits: Arc<dyn VisitLog>,
    clock: Arc<dyn Clock>,
    model: ScoreModel,
    coordinator: VisitCoordinator,
}

impl NotesService {
    /// Create a new notes service over one backend serving both notes and visits.
    pub fn new<B>(backend: Arc<B>, clock: Arc<dyn Clock>, params: ScoringParams) -> Self
    where
        B: NoteBackend + VisitLog + 'static,
    {
        let model = ScoreModel::new(params);
        let notes: Arc<dyn NoteBackend> = backend.clone();
        let visits: Arc<dyn VisitLog> = backend;
        let coordinator = VisitCoordinator::new(notes.clone(), clock.clone(), model);

        Self {
            notes,
            visits,
            clock,
            model,
            coordinator,
        }
    }

    /// Add a new note. It starts at the initial score with no visits.
    pub fn add_note(&self, content: NoteContent) -> Result<Note> {
        let content = content.normalized()?;
        let now = self.clock.now();
        let state = self.model.initial_state(now.timestamp_millis());

        let note = self.notes.insert_note(&content, now, &state)?;
        info!(note_id = %note.id, "Note added");
        Ok(note)
    }

    /// Replace a note's content. Scoring and visit fields are untouched.
    pub fn edit_note(&self, id: NoteId, content: NoteContent) -> Result<Note> {
        let content = content.normalized()?;
        let existing = self
            .notes
            .get_note(id)?
            .ok_or(DomainError::NoteNotFound(id))?;

        let updated = existing.with_content(content);
        self.notes.update_note(&updated)?;
        debug!(note_id = %id, "Note edited");
        Ok(updated)
    }

    /// Delete a note and its visit history. Returns false if it did not exist.
    pub fn delete_note(&self, id: NoteId) -> Result<bool> {
        let deleted = self.notes.delete_note(id)?;
        if deleted {
            info!(note_id = %id, "Note deleted");
        }
        Ok(deleted)
    }

    /// Look up a note without counting it as a visit.
    pub fn get_note(&self, id: NoteId) -> Result<Option<Note>> {
        Ok(self.notes.get_note(id)?)
    }

    /// Open a note: record the visit, recover the score, and return the note.
    pub async fn open_note(&self, id: NoteId) -> Result<Option<Note>> {
        self.coordinator.log_note_visit_and_score(id).await
    }

    /// All notes, newest first.
    pub fn list_notes(&self) -> Result<Vec<Note>> {
        Ok(self.notes.list_notes()?)
    }

    /// Notes carrying `tag`, newest first.
    pub fn list_notes_tagged(&self, tag: &str) -> Result<Vec<Note>> {
        Ok(self.notes.list_notes_by_tag(tag)?)
    }

    /// Live listing of all notes, newest first.
    pub fn subscribe(&self) -> watch::Receiver<Vec<Note>> {
        self.notes.subscribe_notes()
    }

    /// The note's score decayed to now. Read-only.
    pub fn current_score(&self, note: &Note) -> i32 {
        self.model
            .score_at(&note.score_state(), self.clock.now().timestamp_millis())
    }

    /// All notes, most neglected first.
    ///
    /// Ordered by current score ascending; equal scores put the older note first.
    pub fn list_by_neglect(&self) -> Result<Vec<ScoredNote>> {
        Ok(self.rank_by_neglect(self.notes.list_notes()?))
    }

    /// Pair each note with its current score, keeping the given order.
    pub fn score_notes(&self, notes: Vec<Note>) -> Vec<ScoredNote> {
        let now = self.clock.now().timestamp_millis();
        notes
            .into_iter()
            .map(|note| {
                let current_score = self.model.score_at(&note.score_state(), now);
                ScoredNote {
                    note,
                    current_score,
                }
            })
            .collect()
    }

    /// Score `notes` and order them most neglected first.
    pub fn rank_by_neglect(&self, notes: Vec<Note>) -> Vec<ScoredNote> {
        let mut scored = self.score_notes(notes);
        scored.sort_by(neglect_order);
        scored
    }

    /// Visit history for a note, oldest first.
    pub fn visits(&self, id: NoteId) -> Result<Vec<NoteVisit>> {
        Ok(self.visits.visits_for_note(id)?)
    }

    /// Number of logged visits for a note.
    pub fn visit_count(&self, id: NoteId) -> Result<u64> {
        Ok(self.visits.visit_count(id)?)
    }

    /// Time of the most recent logged visit.
    pub fn last_visit(&self, id: NoteId) -> Result<Option<DateTime<Utc>>> {
        Ok(self.visits.last_visit(id)?)
    }
}

fn neglect_order(a: &ScoredNote, b: &ScoredNote) -> Ordering {
    a.current_score
        .cmp(&b.current_score)
        .then(a.note.created_at.cmp(&b.note.created_at))
        .then(a.note.id.cmp(&b.note.id))
}
