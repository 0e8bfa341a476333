//! Database store wrapper.

use crate::config::DatabaseConfig;
use crate::error::Result;
use crate::models::*;
use crate::snapshot::Snapshot;
use crate::tracker::{ChangeRecord, ChangeTracker};
use crate::transaction::Transaction;
use native_db::*;
use std::path::Path;
use std::sync::{LazyLock, Mutex, PoisonError};
use tracing::{debug, trace};

// Static models for the database
static MODELS: LazyLock<Models> = LazyLock::new(|| {
    let mut models = Models::new();
    models
        .define::<StoredPlayer>()
        .expect("StoredPlayer model definition");
    models
        .define::<StoredSequence>()
        .expect("StoredSequence model definition");
    models
});

/// Transactional store with a read handle and a serialized write handle.
///
/// - [`Store::read`] runs on its own snapshot and may run concurrently
///   with other reads and with a write.
/// - [`Store::write`] runs one transaction at a time and publishes each
///   commit to the store's [`ChangeTracker`].
pub struct Store {
    db: Database<'static>,
    tracker: ChangeTracker,
    writer: Mutex<()>,
}

impl Store {
    fn with_db(db: Database<'static>) -> Self {
        Self {
            db,
            tracker: ChangeTracker::new(),
            writer: Mutex::new(()),
        }
    }

    /// Open or create a database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let db = Builder::new().create(&MODELS, path)?;
        debug!(path = %path.display(), "opened store");
        Ok(Self::with_db(db))
    }

    /// Create an in-memory database.
    pub fn in_memory() -> Result<Self> {
        let db = Builder::new().create_in_memory(&MODELS)?;
        debug!("opened in-memory store");
        Ok(Self::with_db(db))
    }

    /// Open the database described by `config`.
    pub fn from_config(config: &DatabaseConfig) -> Result<Self> {
        match &config.path {
            Some(path) => Self::open(path),
            None => Self::in_memory(),
        }
    }

    /// Run `f` against a consistent read snapshot.
    pub fn read<T>(&self, f: impl FnOnce(&Snapshot<'_>) -> Result<T>) -> Result<T> {
        let snapshot = Snapshot::new(self.db.r_transaction()?);
        f(&snapshot)
    }

    /// Run `f` inside a write transaction.
    ///
    /// Commits when `f` returns `Ok`; when `f` fails the transaction is
    /// dropped uncommitted and nothing is published.
    pub fn write<T>(&self, f: impl FnOnce(&mut Transaction<'_>) -> Result<T>) -> Result<T> {
        self.write_recorded(f).map(|(value, _)| value)
    }

    /// Like [`Store::write`], also returning the published change record.
    pub fn write_recorded<T>(
        &self,
        f: impl FnOnce(&mut Transaction<'_>) -> Result<T>,
    ) -> Result<(T, ChangeRecord)> {
        // Held through publish so records go out in commit order
        let _gate = self.writer.lock().unwrap_or_else(PoisonError::into_inner);

        let mut tx = Transaction::new(self.db.rw_transaction()?);
        let value = match f(&mut tx) {
            Ok(value) => value,
            Err(err) => {
                trace!(error = %err, "rolling back write transaction");
                return Err(err);
            }
        };
        let (tables, rows) = tx.commit()?;
        let record = self.tracker.publish(tables, rows);
        debug!(
            commit = %record.commit,
            tables = ?record.tables,
            rows = record.rows,
            "committed write transaction"
        );
        Ok((value, record))
    }

    /// The tracker receiving this store's commits.
    pub fn tracker(&self) -> &ChangeTracker {
        &self.tracker
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("tracker", &self.tracker)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::tracker::CommitId;
    use roster_core::{Player, PlayerId};
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_write_publishes_touched_tables() {
        let store = Store::in_memory().unwrap();
        let (_, record) = store
            .write_recorded(|tx| {
                tx.insert(StoredPlayer::from_player(
                    PlayerId::new(1),
                    &Player::new("Arthur", 10),
                ))
            })
            .unwrap();

        assert_eq!(record.commit, CommitId(1));
        assert!(record.touches(StoredPlayer::TABLE));
        assert!(!record.touches(StoredSequence::TABLE));
        assert_eq!(record.rows, 1);
    }

    #[test]
    fn test_failed_write_rolls_back() {
        let store = Store::in_memory().unwrap();
        let seen = Arc::new(Mutex::new(0));
        let sink = seen.clone();
        store
            .tracker()
            .watch([StoredPlayer::TABLE], move |_| *sink.lock().unwrap() += 1);

        let result: Result<()> = store.write(|tx| {
            tx.insert(StoredPlayer::from_player(
                PlayerId::new(1),
                &Player::new("Arthur", 10),
            ))?;
            Err(Error::query("abort"))
        });

        assert!(matches!(result, Err(Error::Query(_))));
        let count = store.read(|s| s.count::<StoredPlayer>()).unwrap();
        assert_eq!(count, 0);
        assert_eq!(*seen.lock().unwrap(), 0);
        assert_eq!(store.tracker().last_commit(), CommitId(0));
    }

    #[test]
    fn test_snapshot_records_reads() {
        let store = Store::in_memory().unwrap();
        let tables = store
            .read(|s| {
                s.count::<StoredPlayer>()?;
                Ok(s.tables_read())
            })
            .unwrap();
        assert_eq!(tables.into_iter().collect::<Vec<_>>(), vec!["player"]);
    }

    #[test]
    fn test_next_id_is_monotonic() {
        let store = Store::in_memory().unwrap();
        let ids: Vec<u64> = (0..3)
            .map(|_| store.write(|tx| tx.next_id(StoredPlayer::TABLE)).unwrap())
            .collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_store_shared_across_threads() {
        let store = Arc::new(Store::in_memory().unwrap());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for _ in 0..10 {
                        store.write(|tx| tx.next_id(StoredPlayer::TABLE)).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        let last = store
            .read(|s| s.get::<StoredSequence>(StoredPlayer::TABLE.to_string()))
            .unwrap()
            .map(|s| s.last);
        assert_eq!(last, Some(40));
        assert_eq!(store.tracker().last_commit(), CommitId(40));
    }

    #[test]
    fn test_open_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roster.db");
        {
            let store = Store::from_config(&DatabaseConfig::at(&path)).unwrap();
            store.write(|tx| tx.next_id(StoredPlayer::TABLE)).unwrap();
        }
        let store = Store::open(&path).unwrap();
        let next = store.write(|tx| tx.next_id(StoredPlayer::TABLE)).unwrap();
        assert_eq!(next, 2);
    }
}
