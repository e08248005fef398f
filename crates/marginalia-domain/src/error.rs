//! Domain error types.

use marginalia_store::{NoteId, StoreError};
use thiserror::Error;

/// Domain-level errors.
#[derive(Debug, Error)]
pub enum DomainError {
    /// Note not found.
    #[error("Note not found: {0}")]
    NoteNotFound(NoteId),

    /// Storage operation failed (and was rolled back).
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Background storage task panicked or was cancelled.
    #[error("Storage task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl From<marginalia_store::ValidationError> for DomainError {
    fn from(err: marginalia_store::ValidationError) -> Self {
        DomainError::Store(StoreError::Validation(err))
    }
}

/// Result type for domain operations.
pub type Result<T> = std::result::Result<T, DomainError>;
