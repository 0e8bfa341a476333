//! Roster Configuration - Settings for a roster application
//!
//! Loaded from RON. Every field is optional:
//!
//! ```ron
//! (
//!     database: (path: Some("roster.db")),
//!     observation: (coalesce_pending: true),
//!     seed: 42,
//!     initial_players: 8,
//!     log_filter: "info,roster_db=debug",
//!     ordering: by_name,
//! )
//! ```

use crate::error::Result;
use roster_core::Ordering;
use roster_db::{DatabaseConfig, DEFAULT_PLAYER_COUNT};
use roster_observe::ObservationConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default random seed.
pub const DEFAULT_SEED: u64 = 0x5EED;

/// Default `tracing` filter directive.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Application settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RosterConfig {
    /// Store location
    pub database: DatabaseConfig,
    /// Observation worker settings
    pub observation: ObservationConfig,
    /// Seed for random players
    pub seed: u64,
    /// Players created when the store starts empty
    pub initial_players: usize,
    /// Filter used when `RUST_LOG` is not set
    pub log_filter: String,
    /// Initial list ordering
    pub ordering: Ordering,
}

impl RosterConfig {
    /// Load a configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_ron_str(&content)
    }

    /// Parse a configuration from a RON string
    pub fn from_ron_str(content: &str) -> Result<Self> {
        Ok(ron::from_str(content)?)
    }
}

impl Default for RosterConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            observation: ObservationConfig::default(),
            seed: DEFAULT_SEED,
            initial_players: DEFAULT_PLAYER_COUNT,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            ordering: Ordering::default(),
        }
    }
}
