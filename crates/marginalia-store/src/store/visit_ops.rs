//! Visit log operations and the atomic visit transaction.

use chrono::{DateTime, SubsecRound, Utc};
use rusqlite::{Connection, params};
use tracing::debug;

use crate::error::{Result, StoreError};
use crate::types::{Note, NoteId, NoteVisit, VisitId, decode_time, encode_time};

use super::NoteStore;

impl NoteStore {
    /// Record a visit to a note in one transaction.
    ///
    /// Loads the note, lets `apply` compute the visited state, writes the
    /// scoring and visit fields back and appends a visit-log row. Returns
    /// `Ok(None)` with nothing written when the note does not exist. On any
    /// error the transaction is rolled back, so the note's `visit_count`
    /// always matches its number of visit-log rows.
    pub fn visit_note(
        &self,
        id: NoteId,
        visited_at: DateTime<Utc>,
        apply: &dyn Fn(Note) -> Note,
    ) -> Result<Option<Note>> {
        let visited_at = visited_at.trunc_subsecs(3);

        let visited = self.with_transaction(|conn| {
            let Some(note) = Self::fetch_note(conn, id)? else {
                return Ok(None);
            };

            let updated = apply(note);
            Self::write_visit_fields(conn, id, &updated)?;
            Self::append_visit(conn, id, visited_at)?;
            Ok(Some(updated))
        })?;

        match &visited {
            Some(note) => {
                debug!(
                    "Visited note {} (score {}, {} visits)",
                    id, note.score, note.visit_count
                );
            }
            None => debug!("Visit skipped: note {} does not exist", id),
        }

        Ok(visited)
    }

    /// Append a visit entry for an existing note.
    pub fn insert_visit(&self, note_id: NoteId, visited_at: DateTime<Utc>) -> Result<VisitId> {
        let conn = self.conn.lock();
        Self::append_visit(&conn, note_id, visited_at.trunc_subsecs(3))
    }

    /// All visits of a note, oldest first.
    pub fn get_visits_for_note(&self, note_id: NoteId) -> Result<Vec<NoteVisit>> {
        let conn = self.conn.lock();

        let mut stmt = conn.prepare(
            r#"
            SELECT id, note_id, visited_at
            FROM note_visits
            WHERE note_id = ?1
            ORDER BY visited_at ASC, id ASC
            "#,
        )?;

        let mut rows = stmt.query(params![note_id.0])?;

        let mut visits = Vec::new();
        while let Some(row) = rows.next()? {
            let visited_at: String = row.get(2)?;
            visits.push(NoteVisit {
                id: VisitId(row.get(0)?),
                note_id: NoteId(row.get(1)?),
                visited_at: decode_time(&visited_at)?,
            });
        }

        Ok(visits)
    }

    /// Number of logged visits of a note.
    pub fn get_visit_count(&self, note_id: NoteId) -> Result<u64> {
        let conn = self.conn.lock();

        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM note_visits WHERE note_id = ?1",
            params![note_id.0],
            |row| row.get(0),
        )?;

        Ok(count as u64)
    }

    /// Time of the most recent logged visit, if any.
    pub fn get_last_visit(&self, note_id: NoteId) -> Result<Option<DateTime<Utc>>> {
        let conn = self.conn.lock();

        let last: Option<String> = conn.query_row(
            "SELECT MAX(visited_at) FROM note_visits WHERE note_id = ?1",
            params![note_id.0],
            |row| row.get(0),
        )?;

        last.as_deref().map(decode_time).transpose()
    }

    fn write_visit_fields(conn: &Connection, id: NoteId, note: &Note) -> Result<()> {
        let timestamps_json = serde_json::to_string(&note.visit_timestamps)?;
        let visit_count = i64::try_from(note.visit_count).map_err(|_| {
            StoreError::InvalidData(format!("visit count {} overflows", note.visit_count))
        })?;

        let rows_affected = conn.execute(
            r#"
            UPDATE notes
            SET last_visited_at = ?2, visit_count = ?3, score = ?4, last_updated = ?5,
                visit_timestamps = ?6
            WHERE id = ?1
            "#,
            params![
                id.0,
                note.last_visited_at.as_ref().map(encode_time),
                visit_count,
                note.score,
                note.last_updated,
                timestamps_json,
            ],
        )?;

        if rows_affected == 0 {
            return Err(StoreError::NotFound(format!("Note {}", id)));
        }
        Ok(())
    }

    fn append_visit(
        conn: &Connection,
        note_id: NoteId,
        visited_at: DateTime<Utc>,
    ) -> Result<VisitId> {
        conn.execute(
            "INSERT INTO note_visits (note_id, visited_at) VALUES (?1, ?2)",
            params![note_id.0, encode_time(&visited_at)],
        )?;
        Ok(VisitId(conn.last_insert_rowid()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::score::{ONE_DAY_MS, ScoreModel};
    use crate::types::NoteContent;
    use chrono::Duration;

    fn create_test_store() -> NoteStore {
        NoteStore::open_in_memory().unwrap()
    }

    fn add(store: &NoteStore, at: DateTime<Utc>) -> Note {
        let state = ScoreModel::default().initial_state(at.timestamp_millis());
        store
            .insert_note(&NoteContent::new("visited note"), at, &state)
            .unwrap()
    }

    fn visit(model: ScoreModel, at: DateTime<Utc>) -> impl Fn(Note) -> Note {
        move |note: Note| {
            let state = model.visit(&note.score_state(), at.timestamp_millis());
            let visit_count = note.visit_count + 1;
            Note {
                visit_count,
                last_visited_at: Some(at),
                ..note.with_score_state(state)
            }
        }
    }

    #[test]
    fn test_visit_updates_note_and_log() {
        let store = create_test_store();
        let t0 = Utc::now().trunc_subsecs(3);
        let note = add(&store, t0);
        let at = t0 + Duration::days(5);

        let visited = store
            .visit_note(note.id, at, &visit(ScoreModel::default(), at))
            .unwrap()
            .unwrap();
        assert_eq!(visited.score, 105);
        assert_eq!(visited.visit_count, 1);

        let stored = store.get_note(note.id).unwrap().unwrap();
        assert_eq!(stored, visited);
        assert_eq!(stored.last_visited_at, Some(at));
        assert_eq!(stored.visit_timestamps, vec![at.timestamp_millis()]);

        let visits = store.get_visits_for_note(note.id).unwrap();
        assert_eq!(visits.len(), 1);
        assert_eq!(visits[0].visited_at, at);
        assert_eq!(store.get_visit_count(note.id).unwrap(), 1);
        assert_eq!(store.get_last_visit(note.id).unwrap(), Some(at));
    }

    #[test]
    fn test_visit_missing_note_writes_nothing() {
        let store = create_test_store();
        let at = Utc::now();

        let result = store
            .visit_note(NoteId(77), at, &visit(ScoreModel::default(), at))
            .unwrap();
        assert!(result.is_none());

        let stats = store.stats().unwrap();
        assert_eq!(stats.note_count, 0);
        assert_eq!(stats.visit_count, 0);
    }

    #[test]
    fn test_failed_visit_rolls_back() {
        let store = create_test_store();
        let note = add(&store, Utc::now());
        let at = Utc::now();

        // Break the visit log so the second write of the transaction fails
        store
            .with_transaction(|conn| {
                conn.execute_batch("ALTER TABLE note_visits RENAME TO note_visits_gone;")?;
                Ok(())
            })
            .unwrap();

        let result = store.visit_note(note.id, at, &visit(ScoreModel::default(), at));
        assert!(matches!(result, Err(StoreError::Database(_))));

        let stored = store.get_note(note.id).unwrap().unwrap();
        assert_eq!(stored, note);
    }

    #[test]
    fn test_visit_count_matches_log_after_many_visits() {
        let store = create_test_store();
        let t0 = Utc::now().trunc_subsecs(3);
        let a = add(&store, t0);
        let b = add(&store, t0);

        for i in 0..12 {
            let at = t0 + Duration::hours(i * 7);
            let id = if i % 3 == 0 { b.id } else { a.id };
            store
                .visit_note(id, at, &visit(ScoreModel::default(), at))
                .unwrap();
        }

        for id in [a.id, b.id] {
            let note = store.get_note(id).unwrap().unwrap();
            assert_eq!(note.visit_count, store.get_visit_count(id).unwrap());
        }
        assert_eq!(store.get_visit_count(a.id).unwrap(), 8);
        assert_eq!(store.get_visit_count(b.id).unwrap(), 4);
    }

    #[test]
    fn test_visits_ordered_and_last_visit() {
        let store = create_test_store();
        let t0 = Utc::now().trunc_subsecs(3);
        let note = add(&store, t0);

        let later = t0 + Duration::milliseconds(3 * ONE_DAY_MS);
        store.insert_visit(note.id, later).unwrap();
        store.insert_visit(note.id, t0).unwrap();

        let visits = store.get_visits_for_note(note.id).unwrap();
        assert_eq!(
            visits.iter().map(|v| v.visited_at).collect::<Vec<_>>(),
            vec![t0, later]
        );
        assert_eq!(store.get_last_visit(note.id).unwrap(), Some(later));
        assert_eq!(store.get_last_visit(NoteId(404)).unwrap(), None);
    }

    #[test]
    fn test_insert_visit_requires_existing_note() {
        let store = create_test_store();
        assert!(store.insert_visit(NoteId(1), Utc::now()).is_err());
    }

    #[test]
    fn test_delete_cascades_visits() {
        let store = create_test_store();
        let note = add(&store, Utc::now());
        let at = Utc::now();
        store
            .visit_note(note.id, at, &visit(ScoreModel::default(), at))
            .unwrap();
        assert_eq!(store.stats().unwrap().visit_count, 1);

        store.delete_note(note.id).unwrap();
        assert_eq!(store.stats().unwrap().visit_count, 0);
    }
}
