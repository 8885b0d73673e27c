//! Common error types for UniConnect

use thiserror::Error;

/// Common result type for UniConnect operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across UniConnect crates
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested student, event, club or favorite does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Write contention that outlasted the lock retry budget
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// True for SQLite busy/locked failures that are worth retrying
    pub fn is_lock_contention(&self) -> bool {
        match self {
            Error::Database(sqlx::Error::Database(db_err)) => {
                // SQLITE_BUSY (5), SQLITE_LOCKED (6) and their extended codes
                let busy_code = db_err
                    .code()
                    .and_then(|code| code.parse::<i32>().ok())
                    .map(|code| matches!(code & 0xff, 5 | 6))
                    .unwrap_or(false);
                busy_code || db_err.message().contains("database is locked")
            }
            Error::Database(err) => err.to_string().contains("database is locked"),
            _ => false,
        }
    }
}
