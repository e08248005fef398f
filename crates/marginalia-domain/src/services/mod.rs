//! Domain services.
//!
//! Services orchestrating note storage, visits, and scoring for front ends.

pub mod notes;
pub mod visit;

pub use notes::{NotesService, ScoredNote};
pub use visit::{VisitCoordinator, apply_visit};
