//! Domain facade for Marginalia.
//!
//! This crate sits between front ends (the CLI) and the storage crate. It
//! owns the rules that span more than one storage call:
//!
//! - **Visit coordination**: opening a note logs a visit and recovers its
//!   score in one transaction
//! - **Note management**: add, edit, delete, list, and neglect ordering
//!
//! Time comes from an injected [`Clock`], so every rule can be tested at a
//! fixed instant.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use marginalia_domain::{NotesService, SystemClock};
//! use marginalia_store::{NoteContent, NoteStore, ScoringParams};
//!
//! # async fn run() -> marginalia_domain::Result<()> {
//! let store = Arc::new(NoteStore::open("notes.db")?);
//! let service = NotesService::new(store, Arc::new(SystemClock), ScoringParams::default());
//!
//! let note = service.add_note(NoteContent::new("Know thyself"))?;
//! let opened = service.open_note(note.id).await?;
//! # Ok(())
//! # }
//! ```

pub mod clock;
mod error;
pub mod services;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{DomainError, Result};
pub use services::{NotesService, ScoredNote, VisitCoordinator};
