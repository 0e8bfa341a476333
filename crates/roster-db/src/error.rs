//! Error types for storage and query operations.

use crate::models::TableName;
use roster_core::PlayerId;
use thiserror::Error;

/// Errors that can occur during database operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Native DB error (read/write handle failure).
    #[error("Database error: {0}")]
    Database(String),

    /// Update targeted a player that does not exist.
    #[error("Player not found: {0}")]
    NotFound(PlayerId),

    /// A query function failed.
    #[error("Query error: {0}")]
    Query(String),

    /// An observed query read a table it did not declare.
    #[error("Query read undeclared table: {0}")]
    UndeclaredTable(TableName),
}

impl Error {
    /// Create a query error from any message.
    pub fn query(message: impl Into<String>) -> Self {
        Error::Query(message.into())
    }
}

impl From<native_db::db_type::Error> for Error {
    fn from(err: native_db::db_type::Error) -> Self {
        Error::Database(err.to_string())
    }
}

/// Result type for database operations.
pub type Result<T> = std::result::Result<T, Error>;
