//! Roster Observe - Observable queries over a roster store
//!
//! A [`ValueObservation`] pairs a read query with the tables it reads.
//! Starting it registers a watcher with the store's change tracker, runs the
//! query once for the initial value, and re-runs it after every commit that
//! touches one of those tables. New values are handed to callbacks on a
//! caller-chosen [`Scheduler`]; unchanged values are not re-delivered.
//!
//! ## Architecture
//!
//! ```text
//! Store::write ── commit ── ChangeTracker
//!                               │ Commit(n)
//!                               ▼
//!                     observation worker thread
//!                      (re-run on fresh snapshot, compare)
//!                               │ job
//!                               ▼
//!                  Scheduler (DispatchQueue / ImmediateScheduler)
//!                      on_change / on_error, serialized
//! ```
//!
//! ## Lifecycle
//!
//! `Created → Active → {Terminated | Cancelled}`. A failed query terminates
//! its observation; [`ObservationHandle::cancel`] (or dropping the handle)
//! cancels it. After `cancel` returns no callback of that observation runs.

mod config;
mod dispatch;
mod error;
mod observation;
mod poll;
mod scheduler;

pub use config::ObservationConfig;
pub use dispatch::DispatchQueue;
pub use error::{Error, Result};
pub use observation::{ObservationHandle, ObservationId, Status, ValueObservation};
pub use poll::{wait_until, DEFAULT_POLL_INTERVAL};
pub use scheduler::{ImmediateScheduler, Job, Scheduler};
