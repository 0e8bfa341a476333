//! Database models for persistent storage.

mod player;
mod sequence;

pub use player::*;
pub use sequence::*;

/// Name of a table, used for change tracking.
pub type TableName = &'static str;

/// A stored model that belongs to a named table.
///
/// Every write through a [`crate::Transaction`] and every read through a
/// [`crate::Snapshot`] is attributed to `TABLE`.
pub trait Tracked {
    /// Table this model is stored in.
    const TABLE: TableName;
}
