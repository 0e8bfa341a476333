//! Error types for roster-observe

use thiserror::Error;

/// Result type for observation setup
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned when starting observations or dispatch queues
///
/// Failures of the observed query itself are not returned here: they are
/// delivered to the observation's error callback as [`roster_db::Error`].
#[derive(Debug, Error)]
pub enum Error {
    /// A worker or dispatch thread could not be spawned
    #[error("failed to spawn {what} thread: {source}")]
    Spawn {
        /// Which thread
        what: &'static str,
        /// Underlying OS error
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub(crate) fn spawn(what: &'static str, source: std::io::Error) -> Self {
        Error::Spawn { what, source }
    }
}
