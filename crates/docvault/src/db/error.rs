//! Database error types.

use std::path::PathBuf;
use thiserror::Error;

use crate::document::ProcessingStatus;

/// Errors from database operations.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// SQLite error from rusqlite.
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// IO error when creating the database directory.
    #[error("IO error for path '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A migration failed to apply.
    #[error("Migration failed at version {version}: {reason}")]
    Migration { version: u32, reason: String },

    /// The database lock was poisoned.
    #[error("Database lock poisoned")]
    LockPoisoned,

    /// A stored value could not be mapped back onto the data model.
    #[error("Invalid value in column '{column}': {reason}")]
    InvalidValue { column: &'static str, reason: String },

    /// A status write targeted a state no transition leads to.
    #[error("No transition leads to status {0}")]
    IllegalTransition(ProcessingStatus),
}
