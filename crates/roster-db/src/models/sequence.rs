//! Id sequence model.

use super::{TableName, Tracked};
use native_db::*;
use native_model::{native_model, Model};
use serde::{Deserialize, Serialize};

/// Last id handed out for a table.
///
/// One row per table, keyed by table name. Ids are allocated inside the
/// inserting transaction, so a rolled back insert also rolls back its id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[native_model(id = 2, version = 1)]
#[native_db]
pub struct StoredSequence {
    /// Primary key - table the sequence belongs to.
    #[primary_key]
    pub table: String,
    /// Last allocated id (0 before the first allocation).
    pub last: u64,
}

impl Tracked for StoredSequence {
    const TABLE: TableName = "sequence";
}
