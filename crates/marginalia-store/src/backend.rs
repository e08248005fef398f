//! Storage backend traits for notes and the visit log.
//!
//! [`NoteBackend`] and [`VisitLog`] let the visit coordinator and services run
//! against either the SQLite [`NoteStore`](crate::NoteStore) or the in-memory
//! [`MockNoteBackend`] used in tests.
//!
//! # Example
//!
//! ```ignore
//! use marginalia_store::{NoteBackend, NoteStore};
//!
//! let store = NoteStore::open_in_memory()?;
//!
//! fn titles(backend: &dyn NoteBackend) -> Vec<Option<String>> {
//!     backend.list_notes().unwrap().into_iter().map(|n| n.title).collect()
//! }
//! ```

use chrono::{DateTime, Utc};
use tokio::sync::watch;

use crate::error::Result;
use crate::score::ScoreState;
use crate::types::{Note, NoteContent, NoteId, NoteVisit, VisitId};

/// Trait for note storage backends.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync` to allow sharing across threads.
pub trait NoteBackend: Send + Sync {
    /// Insert a new note and return it with its assigned ID.
    ///
    /// `content` is stored as given; normalize it first.
    fn insert_note(
        &self,
        content: &NoteContent,
        created_at: DateTime<Utc>,
        score: &ScoreState,
    ) -> Result<Note>;

    /// Get a note by ID. Returns `Ok(None)` if it does not exist.
    fn get_note(&self, id: NoteId) -> Result<Option<Note>>;

    /// Replace the content fields of an existing note.
    ///
    /// Scoring and visit fields are left untouched.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` error if the note does not exist.
    fn update_note(&self, note: &Note) -> Result<()>;

    /// Delete a note and its visit log.
    ///
    /// Returns `true` if the note existed and was deleted, `false` if not found.
    fn delete_note(&self, id: NoteId) -> Result<bool>;

    /// All notes, newest first (`created_at` descending, then ID descending).
    fn list_notes(&self) -> Result<Vec<Note>>;

    /// Notes carrying exactly `tag`, in [`NoteBackend::list_notes`] order.
    fn list_notes_by_tag(&self, tag: &str) -> Result<Vec<Note>>;

    /// Subscribe to the live note listing.
    ///
    /// The receiver holds the same ordering as [`NoteBackend::list_notes`]
    /// and is updated after every committed write.
    fn subscribe_notes(&self) -> watch::Receiver<Vec<Note>>;

    /// Record a visit atomically.
    ///
    /// Loads the note, passes it to `apply`, stores the scoring and visit
    /// fields of the returned note, and appends a visit-log row at
    /// `visited_at`. Either all of it commits or none of it does. Returns
    /// `Ok(None)` without writing anything if the note does not exist.
    fn visit_note(
        &self,
        id: NoteId,
        visited_at: DateTime<Utc>,
        apply: &dyn Fn(Note) -> Note,
    ) -> Result<Option<Note>>;
}

/// Trait for the append-only visit log.
pub trait VisitLog: Send + Sync {
    /// Append a visit entry for an existing note.
    fn insert_visit(&self, note_id: NoteId, visited_at: DateTime<Utc>) -> Result<VisitId>;

    /// All visits of a note, oldest first.
    fn visits_for_note(&self, note_id: NoteId) -> Result<Vec<NoteVisit>>;

    /// Number of logged visits of a note.
    fn visit_count(&self, note_id: NoteId) -> Result<u64>;

    /// Time of the most recent logged visit, if any.
    fn last_visit(&self, note_id: NoteId) -> Result<Option<DateTime<Utc>>>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Mock backend
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(any(test, feature = "testing"))]
pub use mock::MockNoteBackend;

#[cfg(any(test, feature = "testing"))]
mod mock {
    use std::collections::BTreeMap;

    use chrono::{DateTime, SubsecRound, Utc};
    use parking_lot::Mutex;
    use tokio::sync::watch;

    use super::{NoteBackend, VisitLog};
    use crate::error::{Result, StoreError};
    use crate::score::ScoreState;
    use crate::types::{Note, NoteContent, NoteId, NoteVisit, VisitId};

    #[derive(Debug, Default)]
    struct MockState {
        notes: BTreeMap<NoteId, Note>,
        visits: Vec<NoteVisit>,
        next_note_id: i64,
        next_visit_id: i64,
        fail_next_visit: bool,
        writes: usize,
    }

    /// Mock note backend for testing.
    ///
    /// Keeps everything behind one lock, so a visit is applied all at once.
    /// [`MockNoteBackend::fail_next_visit`] makes the next visit fail after the
    /// note has been loaded, to exercise rollback paths.
    #[derive(Debug)]
    pub struct MockNoteBackend {
        state: Mutex<MockState>,
        listing: watch::Sender<Vec<Note>>,
    }

    impl Default for MockNoteBackend {
        fn default() -> Self {
            Self {
                state: Mutex::new(MockState::default()),
                listing: watch::Sender::new(Vec::new()),
            }
        }
    }

    impl MockNoteBackend {
        /// Create a new empty mock backend.
        pub fn new() -> Self {
            Self::default()
        }

        /// Make the next `visit_note` call fail without writing anything.
        pub fn fail_next_visit(&self) {
            self.state.lock().fail_next_visit = true;
        }

        /// Number of successful write operations so far.
        pub fn write_count(&self) -> usize {
            self.state.lock().writes
        }

        /// Get the number of stored notes.
        pub fn len(&self) -> usize {
            self.state.lock().notes.len()
        }

        /// Check if the backend is empty.
        pub fn is_empty(&self) -> bool {
            self.state.lock().notes.is_empty()
        }

        fn publish(&self, state: &MockState) {
            self.listing.send_replace(sorted(state));
        }
    }

    fn sorted(state: &MockState) -> Vec<Note> {
        let mut notes: Vec<_> = state.notes.values().cloned().collect();
        notes.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        notes
    }

    impl NoteBackend for MockNoteBackend {
        fn insert_note(
            &self,
            content: &NoteContent,
            created_at: DateTime<Utc>,
            score: &ScoreState,
        ) -> Result<Note> {
            let mut state = self.state.lock();
            state.next_note_id += 1;

            let note = Note {
                id: NoteId(state.next_note_id),
                text: content.text.clone(),
                author: content.author.clone(),
                title: content.title.clone(),
                page: content.page.clone(),
                publisher: content.publisher.clone(),
                url: content.url.clone(),
                tags: content.tags.clone(),
                created_at: created_at.trunc_subsecs(3),
                last_visited_at: None,
                visit_count: 0,
                score: score.score,
                last_updated: score.last_updated,
                visit_timestamps: score.visit_timestamps.clone(),
            };
            state.notes.insert(note.id, note.clone());
            state.writes += 1;
            self.publish(&state);
            Ok(note)
        }

        fn get_note(&self, id: NoteId) -> Result<Option<Note>> {
            Ok(self.state.lock().notes.get(&id).cloned())
        }

        fn update_note(&self, note: &Note) -> Result<()> {
            let mut state = self.state.lock();
            let Some(existing) = state.notes.get(&note.id).cloned() else {
                return Err(StoreError::NotFound(format!("Note {}", note.id)));
            };
            state
                .notes
                .insert(note.id, existing.with_content(note.content()));
            state.writes += 1;
            self.publish(&state);
            Ok(())
        }

        fn delete_note(&self, id: NoteId) -> Result<bool> {
            let mut state = self.state.lock();
            let existed = state.notes.remove(&id).is_some();
            if existed {
                state.visits.retain(|v| v.note_id != id);
                state.writes += 1;
                self.publish(&state);
            }
            Ok(existed)
        }

        fn list_notes(&self) -> Result<Vec<Note>> {
            Ok(sorted(&self.state.lock()))
        }

        fn list_notes_by_tag(&self, tag: &str) -> Result<Vec<Note>> {
            let mut notes = sorted(&self.state.lock());
            notes.retain(|n| n.tags.iter().any(|t| t == tag));
            Ok(notes)
        }

        fn subscribe_notes(&self) -> watch::Receiver<Vec<Note>> {
            self.listing.subscribe()
        }

        fn visit_note(
            &self,
            id: NoteId,
            visited_at: DateTime<Utc>,
            apply: &dyn Fn(Note) -> Note,
        ) -> Result<Option<Note>> {
            let mut state = self.state.lock();
            let Some(note) = state.notes.get(&id).cloned() else {
                return Ok(None);
            };

            let updated = apply(note);
            if std::mem::take(&mut state.fail_next_visit) {
                return Err(StoreError::InvalidData(format!(
                    "injected visit failure for note {}",
                    id
                )));
            }

            state.next_visit_id += 1;
            let visit = NoteVisit {
                id: VisitId(state.next_visit_id),
                note_id: id,
                visited_at: visited_at.trunc_subsecs(3),
            };
            state.visits.push(visit);
            state.notes.insert(id, updated.clone());
            state.writes += 1;
            self.publish(&state);
            Ok(Some(updated))
        }
    }

    impl VisitLog for MockNoteBackend {
        fn insert_visit(&self, note_id: NoteId, visited_at: DateTime<Utc>) -> Result<VisitId> {
            let mut state = self.state.lock();
            if !state.notes.contains_key(&note_id) {
                return Err(StoreError::NotFound(format!("Note {}", note_id)));
            }
            state.next_visit_id += 1;
            let id = VisitId(state.next_visit_id);
            state.visits.push(NoteVisit {
                id,
                note_id,
                visited_at: visited_at.trunc_subsecs(3),
            });
            state.writes += 1;
            Ok(id)
        }

        fn visits_for_note(&self, note_id: NoteId) -> Result<Vec<NoteVisit>> {
            let state = self.state.lock();
            let mut visits: Vec<_> = state
                .visits
                .iter()
                .filter(|v| v.note_id == note_id)
                .cloned()
                .collect();
            visits.sort_by(|a, b| a.visited_at.cmp(&b.visited_at).then(a.id.cmp(&b.id)));
            Ok(visits)
        }

        fn visit_count(&self, note_id: NoteId) -> Result<u64> {
            let state = self.state.lock();
            Ok(state.visits.iter().filter(|v| v.note_id == note_id).count() as u64)
        }

        fn last_visit(&self, note_id: NoteId) -> Result<Option<DateTime<Utc>>> {
            let state = self.state.lock();
            Ok(state
                .visits
                .iter()
                .filter(|v| v.note_id == note_id)
                .map(|v| v.visited_at)
                .max())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::score::ScoreModel;

    fn insert(backend: &MockNoteBackend, text: &str, at: DateTime<Utc>) -> Note {
        let state = ScoreModel::default().initial_state(at.timestamp_millis());
        backend
            .insert_note(&NoteContent::new(text), at, &state)
            .unwrap()
    }

    #[test]
    fn test_mock_backend_insert_and_get() {
        let backend = MockNoteBackend::new();
        let note = insert(&backend, "Test content", Utc::now());

        let fetched = backend.get_note(note.id).unwrap().unwrap();
        assert_eq!(fetched.text, "Test content");
        assert_eq!(fetched.score, 100);
        assert_eq!(backend.len(), 1);
    }

    #[test]
    fn test_mock_backend_ids_not_reused() {
        let backend = MockNoteBackend::new();
        let first = insert(&backend, "one", Utc::now());
        assert!(backend.delete_note(first.id).unwrap());
        let second = insert(&backend, "two", Utc::now());
        assert_ne!(first.id, second.id);
    }

    #[test]
    fn test_mock_backend_update_missing() {
        let backend = MockNoteBackend::new();
        let mut note = insert(&backend, "x", Utc::now());
        note.id = NoteId(999);
        assert!(matches!(
            backend.update_note(&note),
            Err(crate::StoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_mock_backend_failed_visit_writes_nothing() {
        let backend = MockNoteBackend::new();
        let note = insert(&backend, "x", Utc::now());
        let writes = backend.write_count();

        backend.fail_next_visit();
        let result = backend.visit_note(note.id, Utc::now(), &|mut n| {
            n.visit_count += 1;
            n
        });

        assert!(result.is_err());
        assert_eq!(backend.write_count(), writes);
        assert_eq!(backend.get_note(note.id).unwrap().unwrap().visit_count, 0);
        assert_eq!(backend.visit_count(note.id).unwrap(), 0);
    }

    #[test]
    fn test_mock_backend_delete_cascades_visits() {
        let backend = MockNoteBackend::new();
        let note = insert(&backend, "x", Utc::now());
        backend.insert_visit(note.id, Utc::now()).unwrap();
        assert_eq!(backend.visit_count(note.id).unwrap(), 1);

        assert!(backend.delete_note(note.id).unwrap());
        assert_eq!(backend.visit_count(note.id).unwrap(), 0);
        assert!(!backend.delete_note(note.id).unwrap());
    }
}
