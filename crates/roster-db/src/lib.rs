//! Roster DB - Transactional storage layer using native_db
//!
//! Provides:
//! - A read/write handle pair over one database ([`Store::read`], [`Store::write`])
//! - A commit hook that reports touched tables to a [`ChangeTracker`]
//! - Player CRUD on top of both (save, delete, fetch)
//!
//! ## Write path
//!
//! ```text
//! Store::write(f)
//!  ├── writer gate (one write at a time)
//!  ├── native_db rw transaction ── f(&mut Transaction) records touched tables
//!  ├── commit
//!  └── ChangeTracker::publish ── watchers whose tables intersect
//! ```

mod config;
mod error;
mod models;
mod players;
mod snapshot;
mod store;
mod tracker;
mod transaction;

pub use config::DatabaseConfig;
pub use error::{Error, Result};
pub use models::{StoredPlayer, StoredSequence, TableName, Tracked};
pub use players::DEFAULT_PLAYER_COUNT;
pub use snapshot::Snapshot;
pub use store::Store;
pub use tracker::{
    ChangeRecord, ChangeTracker, CommitCallback, CommitId, Registration, WatcherId,
};
pub use transaction::Transaction;
