//! Snapshot - Consistent read view of the store
//!
//! Wraps a native_db read transaction. All reads made through one
//! `Snapshot` observe the same committed state, even while writers commit
//! concurrently.
//!
//! The snapshot remembers which tables were read, so an observer can check
//! a query against the tables it declared.

use crate::error::{Error, Result};
use crate::models::{TableName, Tracked};
use native_db::db_type::{ToInput, ToKey};
use native_db::transaction::RTransaction;
use std::cell::RefCell;
use std::collections::BTreeSet;

/// A point-in-time read view
pub struct Snapshot<'db> {
    r: RTransaction<'db>,
    reads: RefCell<BTreeSet<TableName>>,
}

impl<'db> Snapshot<'db> {
    pub(crate) fn new(r: RTransaction<'db>) -> Self {
        Self {
            r,
            reads: RefCell::new(BTreeSet::new()),
        }
    }

    fn note<T: Tracked>(&self) {
        self.reads.borrow_mut().insert(T::TABLE);
    }

    /// Get a row by primary key
    pub fn get<T: ToInput + Tracked>(&self, key: impl ToKey) -> Result<Option<T>> {
        self.note::<T>();
        Ok(self.r.get().primary(key)?)
    }

    /// All rows of a table, in primary key order
    pub fn all<T: ToInput + Tracked>(&self) -> Result<Vec<T>> {
        self.note::<T>();
        let scan = self.r.scan().primary::<T>()?;
        let iter = scan.all()?;
        let rows: std::result::Result<Vec<T>, _> = iter.collect();
        rows.map_err(|e| Error::Database(e.to_string()))
    }

    /// Row with the lowest primary key
    pub fn first<T: ToInput + Tracked>(&self) -> Result<Option<T>> {
        self.note::<T>();
        let scan = self.r.scan().primary::<T>()?;
        let mut iter = scan.all()?;
        iter.next()
            .transpose()
            .map_err(|e| Error::Database(e.to_string()))
    }

    /// Number of rows in a table
    pub fn count<T: ToInput + Tracked>(&self) -> Result<u64> {
        self.note::<T>();
        Ok(self.r.len().primary::<T>()?)
    }

    /// Tables read so far
    pub fn tables_read(&self) -> BTreeSet<TableName> {
        self.reads.borrow().clone()
    }
}

impl std::fmt::Debug for Snapshot<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Snapshot")
            .field("reads", &self.reads.borrow())
            .finish()
    }
}
