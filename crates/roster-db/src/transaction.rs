//! Transaction - Write handle passed to `Store::write`
//!
//! Wraps a native_db read-write transaction and records which tables each
//! write touches. The record becomes the commit's [`crate::ChangeRecord`].

use crate::error::{Error, Result};
use crate::models::{StoredSequence, TableName, Tracked};
use native_db::db_type::{ToInput, ToKey};
use native_db::transaction::RwTransaction;
use std::collections::BTreeSet;

/// An open write transaction
pub struct Transaction<'db> {
    rw: RwTransaction<'db>,
    tables: BTreeSet<TableName>,
    rows: usize,
}

impl<'db> Transaction<'db> {
    pub(crate) fn new(rw: RwTransaction<'db>) -> Self {
        Self {
            rw,
            tables: BTreeSet::new(),
            rows: 0,
        }
    }

    fn touch<T: Tracked>(&mut self) {
        self.tables.insert(T::TABLE);
        self.rows += 1;
    }

    /// Insert a new row
    pub fn insert<T: ToInput + Tracked>(&mut self, item: T) -> Result<()> {
        self.rw.insert(item)?;
        self.touch::<T>();
        Ok(())
    }

    /// Insert or replace a row
    pub fn upsert<T: ToInput + Tracked>(&mut self, item: T) -> Result<()> {
        self.rw.upsert(item)?;
        self.touch::<T>();
        Ok(())
    }

    /// Replace `old` with `new`
    pub fn update<T: ToInput + Tracked>(&mut self, old: T, new: T) -> Result<()> {
        self.rw.update(old, new)?;
        self.touch::<T>();
        Ok(())
    }

    /// Remove a row
    pub fn remove<T: ToInput + Tracked>(&mut self, item: T) -> Result<()> {
        self.rw.remove(item)?;
        self.touch::<T>();
        Ok(())
    }

    /// Get a row by primary key, including uncommitted writes
    pub fn get<T: ToInput + Tracked>(&self, key: impl ToKey) -> Result<Option<T>> {
        Ok(self.rw.get().primary(key)?)
    }

    /// All rows of a table, in primary key order
    pub fn all<T: ToInput + Tracked>(&self) -> Result<Vec<T>> {
        let scan = self.rw.scan().primary::<T>()?;
        let iter = scan.all()?;
        let rows: std::result::Result<Vec<T>, _> = iter.collect();
        rows.map_err(|e| Error::Database(e.to_string()))
    }

    /// Allocate the next id of `table`'s sequence
    pub fn next_id(&mut self, table: TableName) -> Result<u64> {
        let last = self
            .get::<StoredSequence>(table.to_string())?
            .map(|s| s.last)
            .unwrap_or(0);
        let next = last + 1;
        self.upsert(StoredSequence {
            table: table.to_string(),
            last: next,
        })?;
        Ok(next)
    }

    /// Commit, returning the touched tables and row count
    pub(crate) fn commit(self) -> Result<(BTreeSet<TableName>, usize)> {
        self.rw.commit()?;
        Ok((self.tables, self.rows))
    }
}

impl std::fmt::Debug for Transaction<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("tables", &self.tables)
            .field("rows", &self.rows)
            .finish()
    }
}
