//! Study error taxonomy
//!
//! What callers of the lifecycle can see. Storage errors are folded in:
//! a missing row is `NotFound`, a lost compare-and-set is a
//! `ConcurrencyConflict`, anything else is a fatal `Persistence` failure.

use crate::storage::StorageError;

/// Errors surfaced by `StudyService`
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum StudyError {
    /// Bookmark, user or vocabulary entry does not exist
    #[error("Not found: {0}")]
    NotFound(String),
    /// Malformed request (unknown outcome/source, bad configuration)
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// Another update on the same bookmark held the lock or won the commit
    #[error("Concurrent update on bookmark {bookmark_id}, retry later")]
    ConcurrencyConflict { bookmark_id: i64 },
    /// An optional collaborator failed. Logged, never returned by the lifecycle.
    #[error("Dependency unavailable: {0}")]
    DependencyUnavailable(String),
    /// Storage commit failed; nothing was applied
    #[error("Persistence failure: {0}")]
    Persistence(StorageError),
}

impl StudyError {
    /// Whether the caller may simply try the same request again
    pub fn is_retryable(&self) -> bool {
        matches!(self, StudyError::ConcurrencyConflict { .. })
    }
}

impl From<StorageError> for StudyError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(what) => StudyError::NotFound(what),
            StorageError::VersionConflict(bookmark_id) => {
                StudyError::ConcurrencyConflict { bookmark_id }
            }
            other => StudyError::Persistence(other),
        }
    }
}

/// Study result type
pub type StudyResult<T> = std::result::Result<T, StudyError>;
