//! Observation Configuration - Worker settings
//!
//! Settings applied to the worker thread of each started observation.

use serde::{Deserialize, Serialize};

/// Default name for observation worker threads.
pub const DEFAULT_THREAD_NAME: &str = "roster-observer";

/// Configuration for observation workers
///
/// # Example
///
/// ```
/// use roster_observe::ObservationConfig;
///
/// let config = ObservationConfig::default();
/// assert!(!config.coalesce_pending);
///
/// let config = ObservationConfig::default().coalescing(true);
/// assert!(config.coalesce_pending);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservationConfig {
    /// Name given to observation worker threads
    pub thread_name: String,

    /// Fold commit notifications that are already queued into one re-run
    ///
    /// A re-run always reads the newest snapshot, so queued notifications
    /// would only re-read the same or a newer state. Off by default: every
    /// notification then gets its own re-run.
    pub coalesce_pending: bool,
}

impl ObservationConfig {
    /// Set the worker thread name
    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    /// Enable or disable folding of queued notifications
    pub fn coalescing(mut self, enabled: bool) -> Self {
        self.coalesce_pending = enabled;
        self
    }
}

impl Default for ObservationConfig {
    fn default() -> Self {
        Self {
            thread_name: DEFAULT_THREAD_NAME.to_string(),
            coalesce_pending: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default() {
        let config = ObservationConfig::default();
        assert_eq!(config.thread_name, DEFAULT_THREAD_NAME);
        assert!(!config.coalesce_pending);
    }

    #[test]
    fn test_builders() {
        let config = ObservationConfig::default()
            .with_thread_name("scores")
            .coalescing(true);
        assert_eq!(config.thread_name, "scores");
        assert!(config.coalesce_pending);
    }

    #[test]
    fn test_ron_defaults_missing_fields() {
        let config: ObservationConfig = ron::from_str("(coalesce_pending: true)").unwrap();
        assert_eq!(config.thread_name, DEFAULT_THREAD_NAME);
        assert!(config.coalesce_pending);
    }
}
