//! Commit tracking and change notification.
//!
//! The [`ChangeTracker`] is the registry behind the store's commit hook.
//! Every committed write transaction is turned into a [`ChangeRecord`]
//! (commit number + touched tables) and routed to the watchers whose
//! declared tables intersect it.
//!
//! # Ordering
//!
//! [`crate::Store::write`] publishes while it still holds the writer gate,
//! so records reach watchers in commit order and commit numbers increase
//! strictly by one per commit.
//!
//! # Startup
//!
//! [`ChangeTracker::watch`] returns the last commit number at registration
//! time. A watcher that reads the store after registering sees every commit
//! up to `since` in its read, and is notified of every later one.

use crate::models::TableName;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, trace};

/// Sequential number of a committed write transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct CommitId(pub u64);

impl CommitId {
    /// The commit following this one.
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for CommitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "commit:{}", self.0)
    }
}

/// Identifier of a registered watcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WatcherId(pub u64);

impl fmt::Display for WatcherId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "watcher:{}", self.0)
    }
}

/// What one committed transaction changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeRecord {
    /// Commit number
    pub commit: CommitId,
    /// Tables written by the transaction
    pub tables: BTreeSet<TableName>,
    /// Number of rows inserted, updated or removed
    pub rows: usize,
}

impl ChangeRecord {
    /// Whether the transaction wrote to `table`.
    pub fn touches(&self, table: TableName) -> bool {
        self.tables.contains(table)
    }

    /// Whether the transaction wrote to any of `tables`.
    pub fn intersects(&self, tables: &BTreeSet<TableName>) -> bool {
        self.tables.iter().any(|t| tables.contains(t))
    }

    /// Whether the transaction wrote nothing.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

/// Callback invoked for each relevant commit.
///
/// Runs on the committing thread while the tracker is locked: it must be
/// quick and must not call back into the tracker.
pub type CommitCallback = Box<dyn Fn(&ChangeRecord) + Send>;

/// Result of [`ChangeTracker::watch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registration {
    /// Id to pass to [`ChangeTracker::unwatch`]
    pub id: WatcherId,
    /// Last commit before registration; notifications start after it
    pub since: CommitId,
}

struct Watcher {
    tables: BTreeSet<TableName>,
    callback: CommitCallback,
}

struct Registry {
    watchers: BTreeMap<WatcherId, Watcher>,
    next_id: u64,
    last_commit: CommitId,
}

/// Routes committed changes to registered watchers.
pub struct ChangeTracker {
    registry: Mutex<Registry>,
}

impl ChangeTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self {
            registry: Mutex::new(Registry {
                watchers: BTreeMap::new(),
                next_id: 1,
                last_commit: CommitId::default(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a watcher for `tables`.
    ///
    /// `callback` is invoked once per later commit that touches at least
    /// one of the tables, in commit order.
    pub fn watch<I, F>(&self, tables: I, callback: F) -> Registration
    where
        I: IntoIterator<Item = TableName>,
        F: Fn(&ChangeRecord) + Send + 'static,
    {
        let tables: BTreeSet<TableName> = tables.into_iter().collect();
        let mut registry = self.lock();
        let id = WatcherId(registry.next_id);
        registry.next_id += 1;
        let since = registry.last_commit;
        debug!(watcher = %id, %since, ?tables, "registered watcher");
        registry.watchers.insert(
            id,
            Watcher {
                tables,
                callback: Box::new(callback),
            },
        );
        Registration { id, since }
    }

    /// Remove a watcher.
    ///
    /// Returns true if the watcher was found and removed. Once this returns,
    /// the watcher's callback is not running and will not run again.
    pub fn unwatch(&self, id: WatcherId) -> bool {
        let removed = self.lock().watchers.remove(&id).is_some();
        if removed {
            debug!(watcher = %id, "removed watcher");
        }
        removed
    }

    /// Record a commit and notify the watchers it concerns.
    pub(crate) fn publish(&self, tables: BTreeSet<TableName>, rows: usize) -> ChangeRecord {
        let mut registry = self.lock();
        let commit = registry.last_commit.next();
        registry.last_commit = commit;
        let record = ChangeRecord {
            commit,
            tables,
            rows,
        };
        if record.is_empty() {
            return record;
        }
        for (id, watcher) in &registry.watchers {
            if record.intersects(&watcher.tables) {
                trace!(watcher = %id, commit = %record.commit, "notifying watcher");
                (watcher.callback)(&record);
            }
        }
        record
    }

    /// Number of registered watchers.
    pub fn watcher_count(&self) -> usize {
        self.lock().watchers.len()
    }

    /// Number of watchers interested in `table`.
    pub fn watchers_for_table(&self, table: TableName) -> usize {
        self.lock()
            .watchers
            .values()
            .filter(|w| w.tables.contains(table))
            .count()
    }

    /// Last published commit.
    pub fn last_commit(&self) -> CommitId {
        self.lock().last_commit
    }
}

impl Default for ChangeTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ChangeTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.lock();
        f.debug_struct("ChangeTracker")
            .field("watchers", &registry.watchers.len())
            .field("last_commit", &registry.last_commit)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn tables(names: &[TableName]) -> BTreeSet<TableName> {
        names.iter().copied().collect()
    }

    fn recorder() -> (Arc<Mutex<Vec<CommitId>>>, impl Fn(&ChangeRecord) + Send + 'static) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        (seen, move |record: &ChangeRecord| {
            sink.lock().unwrap().push(record.commit)
        })
    }

    #[test]
    fn test_tracker_new() {
        let tracker = ChangeTracker::new();
        assert_eq!(tracker.watcher_count(), 0);
        assert_eq!(tracker.last_commit(), CommitId(0));
    }

    #[test]
    fn test_watch_and_unwatch() {
        let tracker = ChangeTracker::new();
        let first = tracker.watch(["player"], |_| {});
        let second = tracker.watch(["player", "sequence"], |_| {});

        assert_ne!(first.id, second.id);
        assert_eq!(tracker.watcher_count(), 2);
        assert_eq!(tracker.watchers_for_table("player"), 2);
        assert_eq!(tracker.watchers_for_table("sequence"), 1);

        assert!(tracker.unwatch(first.id));
        assert!(!tracker.unwatch(first.id)); // Already removed
        assert_eq!(tracker.watcher_count(), 1);
    }

    #[test]
    fn test_publish_filters_by_table() {
        let tracker = ChangeTracker::new();
        let (players, on_player) = recorder();
        let (sequences, on_sequence) = recorder();
        tracker.watch(["player"], on_player);
        tracker.watch(["sequence"], on_sequence);

        tracker.publish(tables(&["player"]), 1);
        tracker.publish(tables(&["sequence"]), 1);
        tracker.publish(tables(&["player", "sequence"]), 2);

        assert_eq!(*players.lock().unwrap(), vec![CommitId(1), CommitId(3)]);
        assert_eq!(*sequences.lock().unwrap(), vec![CommitId(2), CommitId(3)]);
    }

    #[test]
    fn test_empty_commit_notifies_nobody() {
        let tracker = ChangeTracker::new();
        let (seen, callback) = recorder();
        tracker.watch(["player"], callback);

        let record = tracker.publish(BTreeSet::new(), 0);

        assert!(record.is_empty());
        assert_eq!(record.commit, CommitId(1));
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_commit_ids_are_sequential() {
        let tracker = ChangeTracker::new();
        let (seen, callback) = recorder();
        tracker.watch(["player"], callback);

        for _ in 0..5 {
            tracker.publish(tables(&["player"]), 1);
        }

        let seen = seen.lock().unwrap();
        assert_eq!(
            *seen,
            (1..=5).map(CommitId).collect::<Vec<_>>(),
            "notifications arrive in commit order"
        );
        assert_eq!(tracker.last_commit(), CommitId(5));
    }

    #[test]
    fn test_registration_since() {
        let tracker = ChangeTracker::new();
        tracker.publish(tables(&["player"]), 1);
        tracker.publish(tables(&["player"]), 1);

        let (seen, callback) = recorder();
        let registration = tracker.watch(["player"], callback);
        assert_eq!(registration.since, CommitId(2));

        tracker.publish(tables(&["player"]), 1);
        assert_eq!(*seen.lock().unwrap(), vec![CommitId(3)]);
    }

    #[test]
    fn test_unwatched_callback_not_called() {
        let tracker = ChangeTracker::new();
        let (seen, callback) = recorder();
        let registration = tracker.watch(["player"], callback);
        tracker.unwatch(registration.id);

        tracker.publish(tables(&["player"]), 1);
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_change_record_queries() {
        let record = ChangeRecord {
            commit: CommitId(4),
            tables: tables(&["player", "sequence"]),
            rows: 2,
        };
        assert!(record.touches("player"));
        assert!(!record.touches("other"));
        assert!(record.intersects(&tables(&["other", "sequence"])));
        assert!(!record.intersects(&tables(&["other"])));
        assert_eq!(format!("{}", record.commit), "commit:4");
    }
}
