//! Note store implementation using SQLite.
//!
//! Provides persistent storage for notes, their visit log, and derived
//! source bindings using rusqlite. The connection is shared behind a lock;
//! multi-statement writes go through [`NoteStore::with_transaction`].
//!
//! # Live listing
//!
//! The store keeps a `tokio::sync::watch` channel holding the full note
//! listing. Every committed write republishes it, so subscribers always see
//! the current ordering without polling.

mod note_ops;
mod source_ops;
mod visit_ops;

use std::path::Path;

use parking_lot::Mutex;
use rusqlite::{Connection, OpenFlags};
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::{Result, StoreError};
use crate::score::INITIAL_SCORE;
use crate::types::Note;

// ─────────────────────────────────────────────────────────────────────────────
// Schema Version
// ─────────────────────────────────────────────────────────────────────────────

/// Current schema version for migrations.
const SCHEMA_VERSION: i32 = 3;

// ─────────────────────────────────────────────────────────────────────────────
// Note Store
// ─────────────────────────────────────────────────────────────────────────────

/// Note store backed by SQLite.
///
/// Uses WAL mode for better concurrent read performance and enforces
/// foreign keys so deleting a note removes its visit log.
pub struct NoteStore {
    /// The SQLite connection.
    pub(crate) conn: Mutex<Connection>,
    /// Current note listing, republished after each write.
    listing: watch::Sender<Vec<Note>>,
}

impl std::fmt::Debug for NoteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NoteStore")
            .field("subscribers", &self.listing.receiver_count())
            .finish_non_exhaustive()
    }
}

/// Row counts and schema information.
#[derive(Debug, Clone, Serialize)]
pub struct StoreStats {
    pub note_count: usize,
    pub visit_count: usize,
    pub source_binding_count: usize,
    pub schema_version: i32,
}

// ─────────────────────────────────────────────────────────────────────────────
// Initialization
// ─────────────────────────────────────────────────────────────────────────────

impl NoteStore {
    /// Open or create a note store at the given path.
    ///
    /// Creates the database file and initializes or migrates the schema.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        // Ensure parent directory exists
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|_| {
                StoreError::Database(rusqlite::Error::InvalidPath(path.to_path_buf()))
            })?;
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_FULL_MUTEX,
        )?;

        let store = Self::from_connection(conn)?;
        info!("Note store opened at {:?}", path);
        Ok(store)
    }

    /// Create an in-memory store (useful for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self::from_connection(conn)?;
        info!("In-memory note store created");
        Ok(store)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        let store = Self {
            conn: Mutex::new(conn),
            listing: watch::Sender::new(Vec::new()),
        };
        store.initialize()?;
        {
            let conn = store.conn.lock();
            store.publish_locked(&conn);
        }
        Ok(store)
    }

    /// Initialize the database with schema and pragmas.
    fn initialize(&self) -> Result<()> {
        let mut conn = self.conn.lock();

        // Enable WAL mode for better concurrent reads
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        Self::create_schema(&mut conn)
    }

    /// Create the database schema and run pending migrations.
    ///
    /// All steps and the version bump share one transaction, so an
    /// interrupted upgrade leaves the previous version intact.
    fn create_schema(conn: &mut Connection) -> Result<()> {
        let current_version: i32 = conn
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .unwrap_or(0);

        if current_version > SCHEMA_VERSION {
            return Err(StoreError::Migration(format!(
                "database schema version {} is newer than supported version {}",
                current_version, SCHEMA_VERSION
            )));
        }

        if current_version == SCHEMA_VERSION {
            debug!("Schema up to date (version {})", current_version);
            return Ok(());
        }

        info!(
            "Migrating schema from version {} to {}",
            current_version, SCHEMA_VERSION
        );

        let tx = conn.transaction()?;

        // Version 1 layout; later versions are reached through migrations
        tx.execute_batch(
            r#"
            -- Notes table: quotes and excerpts with attribution
            CREATE TABLE IF NOT EXISTS notes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                text TEXT NOT NULL,
                speaker TEXT,
                title TEXT,
                page TEXT,
                source TEXT,
                url TEXT,
                tags TEXT NOT NULL DEFAULT '[]',
                created_at TEXT NOT NULL
            );

            -- Index for the newest-first listing
            CREATE INDEX IF NOT EXISTS idx_notes_created_at
                ON notes(created_at);

            -- Visit log: one row per note opening
            CREATE TABLE IF NOT EXISTS note_visits (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                note_id INTEGER NOT NULL REFERENCES notes(id) ON DELETE CASCADE,
                visited_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_note_visits_note_id
                ON note_visits(note_id, visited_at);
            "#,
        )?;

        if current_version < 2 {
            Self::migrate_v2(&tx)?;
        }
        if current_version < 3 {
            Self::migrate_v3(&tx)?;
        }

        tx.pragma_update(None, "user_version", SCHEMA_VERSION)?;
        tx.commit()?;

        info!("Schema created (version {})", SCHEMA_VERSION);
        Ok(())
    }

    /// Migration v2: rename attribution columns and add scoring columns.
    fn migrate_v2(conn: &Connection) -> Result<()> {
        info!("Running migration v2: attribution renames and scoring columns");

        if has_column(conn, "notes", "speaker") {
            conn.execute_batch("ALTER TABLE notes RENAME COLUMN speaker TO author;")?;
        }
        if has_column(conn, "notes", "source") {
            conn.execute_batch("ALTER TABLE notes RENAME COLUMN source TO publisher;")?;
        }

        let initial_score = format!("INTEGER NOT NULL DEFAULT {INITIAL_SCORE}");
        let scoring_columns = [
            ("last_visited_at", "TEXT"),
            ("visit_count", "INTEGER NOT NULL DEFAULT 0"),
            ("score", initial_score.as_str()),
            ("last_updated", "INTEGER NOT NULL DEFAULT 0"),
            ("visit_timestamps", "TEXT NOT NULL DEFAULT '[]'"),
        ];
        // Databases left half-upgraded by older builds may already have some
        for (column, definition) in scoring_columns {
            if !has_column(conn, "notes", column) {
                conn.execute_batch(&format!(
                    "ALTER TABLE notes ADD COLUMN {} {};",
                    column, definition
                ))?;
            }
        }

        // Existing notes start decaying from their creation time
        conn.execute(
            r#"
            UPDATE notes
            SET last_updated = CAST(
                ROUND((julianday(created_at) - 2440587.5) * 86400000.0) AS INTEGER)
            WHERE last_updated = 0
            "#,
            [],
        )?;

        // Backfill visit history already present in the log
        conn.execute(
            r#"
            UPDATE notes
            SET visit_count = (SELECT COUNT(*) FROM note_visits v WHERE v.note_id = notes.id),
                last_visited_at = (SELECT MAX(visited_at) FROM note_visits v WHERE v.note_id = notes.id)
            "#,
            [],
        )?;

        info!("Migration v2 complete");
        Ok(())
    }

    /// Migration v3: derive the source bindings table from existing notes.
    fn migrate_v3(conn: &Connection) -> Result<()> {
        info!("Running migration v3: source bindings");

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS source_bindings (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                speaker TEXT NOT NULL,
                title TEXT NOT NULL,
                source TEXT,
                UNIQUE(speaker, title)
            );
            "#,
        )?;

        let derived = source_ops::derive_source_bindings(conn)?;

        info!("Migration v3 complete ({} bindings derived)", derived);
        Ok(())
    }
}

/// Whether `table` currently has a column named `column`.
fn has_column(conn: &Connection, table: &str, column: &str) -> bool {
    conn.prepare(&format!("SELECT {} FROM {} LIMIT 0", column, table))
        .is_ok()
}

// ─────────────────────────────────────────────────────────────────────────────
// Transactions
// ─────────────────────────────────────────────────────────────────────────────

impl NoteStore {
    /// Execute a function within a transaction.
    ///
    /// All operations within the closure are executed atomically.
    /// If the closure returns an error, all changes are rolled back.
    /// After a commit the live listing is refreshed before the lock is
    /// released.
    ///
    /// # Example
    ///
    /// ```ignore
    /// store.with_transaction(|conn| {
    ///     // Multiple operations here are atomic
    ///     Ok(())
    /// })?;
    /// ```
    pub fn with_transaction<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        match f(&tx) {
            Ok(result) => {
                tx.commit()?;
                self.publish_locked(&conn);
                Ok(result)
            }
            Err(e) => {
                // Transaction is automatically rolled back when dropped
                Err(e)
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Live Listing
// ─────────────────────────────────────────────────────────────────────────────

impl NoteStore {
    /// Subscribe to the live note listing (newest first).
    pub fn subscribe(&self) -> watch::Receiver<Vec<Note>> {
        self.listing.subscribe()
    }

    /// Re-read the listing and push it to subscribers.
    ///
    /// Takes the connection the caller already holds locked, so listings are
    /// published in commit order. Subscribers are only woken when the listing
    /// changed. A failed refresh leaves the previous listing in place; the
    /// write itself already committed.
    pub(crate) fn publish_locked(&self, conn: &Connection) {
        match Self::query_listing(conn) {
            Ok(notes) => {
                self.listing.send_if_modified(|current| {
                    if *current == notes {
                        return false;
                    }
                    *current = notes;
                    true
                });
            }
            Err(e) => warn!("Failed to refresh note listing: {}", e),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Statistics
// ─────────────────────────────────────────────────────────────────────────────

impl NoteStore {
    /// Get database statistics.
    pub fn stats(&self) -> Result<StoreStats> {
        let conn = self.conn.lock();

        let note_count: i64 = conn.query_row("SELECT COUNT(*) FROM notes", [], |row| row.get(0))?;
        let visit_count: i64 =
            conn.query_row("SELECT COUNT(*) FROM note_visits", [], |row| row.get(0))?;
        let source_binding_count: i64 =
            conn.query_row("SELECT COUNT(*) FROM source_bindings", [], |row| row.get(0))?;

        Ok(StoreStats {
            note_count: note_count as usize,
            visit_count: visit_count as usize,
            source_binding_count: source_binding_count as usize,
            schema_version: SCHEMA_VERSION,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Backend Trait Implementations
// ─────────────────────────────────────────────────────────────────────────────

impl crate::backend::NoteBackend for NoteStore {
    fn insert_note(
        &self,
        content: &crate::types::NoteContent,
        created_at: chrono::DateTime<chrono::Utc>,
        score: &crate::score::ScoreState,
    ) -> Result<Note> {
        NoteStore::insert_note(self, content, created_at, score)
    }

    fn get_note(&self, id: crate::types::NoteId) -> Result<Option<Note>> {
        NoteStore::get_note(self, id)
    }

    fn update_note(&self, note: &Note) -> Result<()> {
        NoteStore::update_note(self, note)
    }

    fn delete_note(&self, id: crate::types::NoteId) -> Result<bool> {
        NoteStore::delete_note(self, id)
    }

    fn list_notes(&self) -> Result<Vec<Note>> {
        self.list_all_notes()
    }

    fn list_notes_by_tag(&self, tag: &str) -> Result<Vec<Note>> {
        NoteStore::list_notes_by_tag(self, tag)
    }

    fn subscribe_notes(&self) -> watch::Receiver<Vec<Note>> {
        self.subscribe()
    }

    fn visit_note(
        &self,
        id: crate::types::NoteId,
        visited_at: chrono::DateTime<chrono::Utc>,
        apply: &dyn Fn(Note) -> Note,
    ) -> Result<Option<Note>> {
        NoteStore::visit_note(self, id, visited_at, apply)
    }
}

impl crate::backend::VisitLog for NoteStore {
    fn insert_visit(
        &self,
        note_id: crate::types::NoteId,
        visited_at: chrono::DateTime<chrono::Utc>,
    ) -> Result<crate::types::VisitId> {
        NoteStore::insert_visit(self, note_id, visited_at)
    }

    fn visits_for_note(
        &self,
        note_id: crate::types::NoteId,
    ) -> Result<Vec<crate::types::NoteVisit>> {
        self.get_visits_for_note(note_id)
    }

    fn visit_count(&self, note_id: crate::types::NoteId) -> Result<u64> {
        self.get_visit_count(note_id)
    }

    fn last_visit(
        &self,
        note_id: crate::types::NoteId,
    ) -> Result<Option<chrono::DateTime<chrono::Utc>>> {
        self.get_last_visit(note_id)
    }
}

#[cfg(test)]
mod tests {
    use rusqlite::params;

    use super::*;
    use crate::types::NoteContent;

    fn create_test_store() -> NoteStore {
        NoteStore::open_in_memory().unwrap()
    }

    #[test]
    fn test_open_in_memory() {
        let store = create_test_store();
        let stats = store.stats().unwrap();
        assert_eq!(stats.note_count, 0);
        assert_eq!(stats.visit_count, 0);
        assert_eq!(stats.schema_version, SCHEMA_VERSION);
    }

    const INSERT_RAW: &str =
        "INSERT INTO notes (text, created_at, last_updated) VALUES (?1, ?2, 0)";

    #[test]
    fn test_with_transaction() {
        let store = create_test_store();

        let result = store.with_transaction(|conn| {
            conn.execute(INSERT_RAW, params!["tx note", "2024-01-01T00:00:00.000Z"])?;
            Ok("success")
        });

        assert_eq!(result.unwrap(), "success");
        assert_eq!(store.count_notes().unwrap(), 1);
    }

    #[test]
    fn test_with_transaction_rolls_back_on_error() {
        let store = create_test_store();

        let result: Result<()> = store.with_transaction(|conn| {
            conn.execute(INSERT_RAW, params!["tx note", "2024-01-01T00:00:00.000Z"])?;
            Err(StoreError::InvalidData("abort".to_string()))
        });

        assert!(result.is_err());
        assert_eq!(store.count_notes().unwrap(), 0);
    }

    #[test]
    fn test_reopen_file_store_keeps_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("notes.db");

        let id = {
            let store = NoteStore::open(&path).unwrap();
            store
                .insert_note(
                    &NoteContent::new("persisted"),
                    chrono::Utc::now(),
                    &crate::ScoreModel::default().initial_state(0),
                )
                .unwrap()
                .id
        };

        let store = NoteStore::open(&path).unwrap();
        let note = store.get_note(id).unwrap().unwrap();
        assert_eq!(note.text, "persisted");
        assert_eq!(store.stats().unwrap().schema_version, SCHEMA_VERSION);
    }

    #[test]
    fn test_migrates_version_one_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("legacy.db");

        {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch(
                r#"
                CREATE TABLE notes (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    text TEXT NOT NULL,
                    speaker TEXT,
                    title TEXT,
                    page TEXT,
                    source TEXT,
                    url TEXT,
                    tags TEXT NOT NULL DEFAULT '[]',
                    created_at TEXT NOT NULL
                );
                CREATE TABLE note_visits (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    note_id INTEGER NOT NULL REFERENCES notes(id) ON DELETE CASCADE,
                    visited_at TEXT NOT NULL
                );
                INSERT INTO notes (text, speaker, title, source, created_at)
                    VALUES ('Know thyself', 'Socrates', 'Apology', 'Penguin', '2024-01-01T00:00:00.000Z');
                INSERT INTO notes (text, speaker, title, source, created_at)
                    VALUES ('The unexamined life', 'Socrates', 'Apology', 'Penguin', '2024-01-02T00:00:00.000Z');
                INSERT INTO notes (text, created_at)
                    VALUES ('No attribution', '2024-01-03T00:00:00.000Z');
                INSERT INTO note_visits (note_id, visited_at) VALUES (1, '2024-01-05T00:00:00.000Z');
                PRAGMA user_version = 1;
                "#,
            )
            .unwrap();
        }

        let store = NoteStore::open(&path).unwrap();

        let first = store.get_note(crate::NoteId(1)).unwrap().unwrap();
        assert_eq!(first.author.as_deref(), Some("Socrates"));
        assert_eq!(first.publisher.as_deref(), Some("Penguin"));
        assert_eq!(first.score, INITIAL_SCORE);
        assert_eq!(first.last_updated, first.created_at.timestamp_millis());
        assert_eq!(first.visit_count, 1);
        assert!(first.last_visited_at.is_some());

        let bindings = store.list_source_bindings().unwrap();
        assert_eq!(bindings.len(), 1);
        assert_eq!(bindings[0].speaker, "Socrates");
        assert_eq!(bindings[0].source.as_deref(), Some("Penguin"));
        assert_eq!(store.stats().unwrap().schema_version, SCHEMA_VERSION);
    }

    #[test]
    fn test_listing_matches_table_after_concurrent_inserts() {
        let store = std::sync::Arc::new(create_test_store());
        let rx = store.subscribe();

        for _ in 0..20 {
            let handles: Vec<_> = (0..16)
                .map(|i| {
                    let store = store.clone();
                    std::thread::spawn(move || {
                        for j in 0..3 {
                            store
                                .insert_note(
                                    &NoteContent::new(format!("note {i}-{j}")),
                                    chrono::Utc::now(),
                                    &crate::ScoreModel::default().initial_state(0),
                                )
                                .unwrap();
                        }
                    })
                })
                .collect();
            for handle in handles {
                handle.join().unwrap();
            }

            assert_eq!(rx.borrow().len(), store.count_notes().unwrap());
        }
    }

    #[test]
    fn test_listing_follows_transactions() {
        let store = create_test_store();
        let rx = store.subscribe();

        store
            .with_transaction(|conn| {
                conn.execute(INSERT_RAW, params!["tx note", "2024-01-01T00:00:00.000Z"])?;
                Ok(())
            })
            .unwrap();

        assert_eq!(rx.borrow().len(), 1);
        assert_eq!(rx.borrow()[0].text, "tx note");
    }

    #[test]
    fn test_resumes_partially_applied_upgrade() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("half.db");

        {
            // Columns renamed and one scoring column added, version never bumped
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch(
                r#"
                CREATE TABLE notes (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    text TEXT NOT NULL,
                    author TEXT,
                    title TEXT,
                    page TEXT,
                    publisher TEXT,
                    url TEXT,
                    tags TEXT NOT NULL DEFAULT '[]',
                    created_at TEXT NOT NULL,
                    last_visited_at TEXT
                );
                CREATE TABLE note_visits (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    note_id INTEGER NOT NULL REFERENCES notes(id) ON DELETE CASCADE,
                    visited_at TEXT NOT NULL
                );
                INSERT INTO notes (text, author, created_at)
                    VALUES ('Half way', 'Zeno', '2024-01-01T00:00:00.000Z');
                PRAGMA user_version = 1;
                "#,
            )
            .unwrap();
        }

        let store = NoteStore::open(&path).unwrap();

        let note = store.get_note(crate::NoteId(1)).unwrap().unwrap();
        assert_eq!(note.author.as_deref(), Some("Zeno"));
        assert_eq!(note.score, INITIAL_SCORE);
        assert_eq!(note.visit_count, 0);
        assert_eq!(store.stats().unwrap().schema_version, SCHEMA_VERSION);
    }

    #[test]
    fn test_failed_upgrade_keeps_old_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blocked.db");

        {
            // An unrelated `source_bindings` table makes v3 fail after v2 ran
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch(
                r#"
                CREATE TABLE notes (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    text TEXT NOT NULL,
                    speaker TEXT,
                    title TEXT,
                    page TEXT,
                    source TEXT,
                    url TEXT,
                    tags TEXT NOT NULL DEFAULT '[]',
                    created_at TEXT NOT NULL
                );
                CREATE TABLE note_visits (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    note_id INTEGER NOT NULL REFERENCES notes(id) ON DELETE CASCADE,
                    visited_at TEXT NOT NULL
                );
                CREATE TABLE source_bindings (broken INTEGER);
                PRAGMA user_version = 1;
                "#,
            )
            .unwrap();
        }

        assert!(NoteStore::open(&path).is_err());

        let conn = Connection::open(&path).unwrap();
        let version: i32 = conn
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .unwrap();
        assert_eq!(version, 1);
        assert!(has_column(&conn, "notes", "speaker"));
        assert!(!has_column(&conn, "notes", "score"));
    }

    #[test]
    fn test_refuses_newer_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("future.db");
        {
            let conn = Connection::open(&path).unwrap();
            conn.pragma_update(None, "user_version", SCHEMA_VERSION + 1)
                .unwrap();
        }

        assert!(matches!(
            NoteStore::open(&path),
            Err(StoreError::Migration(_))
        ));
    }
}
