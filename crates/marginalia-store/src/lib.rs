//! Note storage and forgetting-score model for Marginalia.
//!
//! This crate holds the persistent side of the note keeper: notes with their
//! attribution, an append-only visit log, and the score model that decides
//! how "forgotten" a note is.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  NoteStore                                                              │
//! │  - Single SQLite file with WAL mode                                     │
//! │  - notes, note_visits, source_bindings tables                           │
//! │  - Live listing via tokio watch channel                                 │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │  ScoreModel                                                             │
//! │  - Pure decay / recovery over ScoreState snapshots                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use chrono::Utc;
//! use marginalia_store::{NoteContent, NoteStore, ScoreModel};
//!
//! let store = NoteStore::open("notes.db")?;
//! let model = ScoreModel::default();
//!
//! let now = Utc::now();
//! let content = NoteContent::new("We suffer more in imagination than in reality")
//!     .with_author("Seneca")
//!     .with_tag("stoic")
//!     .normalized()?;
//! let note = store.insert_note(&content, now, &model.initial_state(now.timestamp_millis()))?;
//!
//! let visited = store.visit_note(note.id, now, &|n| {
//!     let state = model.visit(&n.score_state(), now.timestamp_millis());
//!     let mut n = n.with_score_state(state);
//!     n.visit_count += 1;
//!     n.last_visited_at = Some(now);
//!     n
//! })?;
//! # Ok::<(), marginalia_store::StoreError>(())
//! ```

pub mod backend;
pub mod error;
pub mod score;
pub mod store;
pub mod types;
pub mod validation;

// Re-export backend traits
#[cfg(any(test, feature = "testing"))]
pub use backend::MockNoteBackend;
pub use backend::{NoteBackend, VisitLog};

// Re-export error types
pub use error::{Result, StoreError};

// Re-export score model
pub use score::{ScoreModel, ScoreState, ScoringParams};

// Re-export store
pub use store::{NoteStore, StoreStats};

// Re-export types
pub use types::{Note, NoteContent, NoteId, NoteVisit, SourceBinding, VisitId};

// Re-export validation
pub use validation::ValidationError;
