//! Database location settings.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Where the store keeps its data
///
/// A missing `path` selects an in-memory database.
///
/// ```
/// use roster_db::DatabaseConfig;
///
/// assert!(DatabaseConfig::default().is_in_memory());
/// assert!(!DatabaseConfig::at("players.db").is_in_memory());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database file; `None` keeps everything in memory
    pub path: Option<PathBuf>,
}

impl DatabaseConfig {
    /// In-memory database
    pub fn in_memory() -> Self {
        Self { path: None }
    }

    /// Database file at `path`
    pub fn at(path: impl AsRef<Path>) -> Self {
        Self {
            path: Some(path.as_ref().to_path_buf()),
        }
    }

    /// Whether this configuration selects an in-memory database
    pub fn is_in_memory(&self) -> bool {
        self.path.is_none()
    }
}
