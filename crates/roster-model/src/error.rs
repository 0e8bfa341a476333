//! Error types for roster-model

use thiserror::Error;

/// Model error type
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("RON parse error: {0}")]
    Ron(#[from] ron::error::SpannedError),

    #[error("Store error: {0}")]
    Db(#[from] roster_db::Error),

    #[error("Observation error: {0}")]
    Observe(#[from] roster_observe::Error),

    #[error("Worker thread panicked: {0}")]
    WorkerPanicked(&'static str),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
