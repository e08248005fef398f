//! Visit coordination.
//!
//! Opening a note is the only event that recovers its score. The coordinator
//! turns one "note opened" event into a single storage transaction: the note's
//! scoring fields are recomputed and written, and a visit-log row is appended,
//! together or not at all.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use marginalia_store::{Note, NoteBackend, NoteId, ScoreModel};
use tracing::{debug, info};

use crate::clock::Clock;
use crate::error::Result;

/// Records note visits and updates scores.
#[derive(Clone)]
pub struct VisitCoordinator {
    backend: Arc<dyn NoteBackend>,
    clock: Arc<dyn Clock>,
    model: ScoreModel,
}

impl VisitCoordinator {
    /// Create a coordinator over the given backend.
    pub fn new(backend: Arc<dyn NoteBackend>, clock: Arc<dyn Clock>, model: ScoreModel) -> Self {
        Self {
            backend,
            clock,
            model,
        }
    }

    /// Log a visit to a note and recover its score.
    ///
    /// Call exactly once per "open note" action. Returns the updated note, or
    /// `Ok(None)` if no such note exists, in which case nothing is written.
    /// The read-modify-write runs as one blocking task inside one storage
    /// transaction. Two concurrent visits to the same note are serialized by
    /// the store; a concurrent content edit of the same note may still win
    /// or lose against it.
    pub async fn log_note_visit_and_score(&self, id: NoteId) -> Result<Option<Note>> {
        let backend = Arc::clone(&self.backend);
        let model = self.model;
        let visited_at = self.clock.now();

        let visited = tokio::task::spawn_blocking(move || {
            backend.visit_note(id, visited_at, &|note| apply_visit(&model, note, visited_at))
        })
        .await??;

        match &visited {
            Some(note) => info!(
                note_id = %id,
                score = note.score,
                visit_count = note.visit_count,
                "Note visited"
            ),
            None => debug!(note_id = %id, "Visit ignored: note does not exist"),
        }

        Ok(visited)
    }
}

/// The note as it should look after a visit at `visited_at`.
///
/// Scoring fields come from [`ScoreModel::visit`]; the visit counter goes up
/// by one and the last-visited time becomes `visited_at`. Content fields are
/// unchanged.
pub fn apply_visit(model: &ScoreModel, note: Note, visited_at: DateTime<Utc>) -> Note {
    let state = model.visit(&note.score_state(), visited_at.timestamp_millis());
    let visit_count = note.visit_count + 1;

    Note {
        visit_count,
        last_visited_at: Some(visited_at),
        ..note.with_score_state(state)
    }
}
