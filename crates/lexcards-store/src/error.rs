use lexcards_shared::{ContentError, ValidationErrors};
use rusqlite::ErrorCode;
use thiserror::Error;

/// Errors produced by the store layer.
#[derive(Error, Debug)]
pub enum StoreError {
    /// SQLite error not covered by a more specific variant.
    #[error("Database error: {0}")]
    Sqlite(rusqlite::Error),

    /// Generic I/O error (e.g. creating the database directory).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// No row for the given identity.
    #[error("Record not found")]
    NotFound,

    /// The row changed (or vanished) since the caller read it.
    #[error("Edit conflict: record was modified since it was read")]
    EditConflict,

    /// The operation ran past its deadline and was interrupted.
    #[error("Store operation timed out")]
    Timeout,

    /// Migration failure.
    #[error("Migration error: {0}")]
    Migration(String),

    /// Stored content no longer decodes against its discriminant.
    #[error("Content error: {0}")]
    Content(#[from] ContentError),

    /// Request values failed validation before any query ran.
    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    /// JSON (de)serialization of a stored column.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound)
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::EditConflict)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(ref e, _) if e.code == ErrorCode::OperationInterrupted => {
                StoreError::Timeout
            }
            other => StoreError::Sqlite(other),
        }
    }
}

/// Map a foreign-key violation (missing user or card) to [`StoreError::NotFound`].
pub(crate) fn missing_parent(err: rusqlite::Error) -> StoreError {
    match err {
        rusqlite::Error::SqliteFailure(ref e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY =>
        {
            StoreError::NotFound
        }
        other => StoreError::from(other),
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;
