//! Value observations
//!
//! [`ValueObservation::start`] registers a watcher *before* the initial
//! read, so no commit can fall between the read and the registration. A
//! commit that lands in between is simply read twice; the second result
//! equals the first and is not re-delivered.
//!
//! Each started observation owns one worker thread. The worker receives
//! commit notifications from the tracker, re-runs the query on a fresh
//! snapshot, and schedules a delivery when the result differs from the
//! previous one. Deliveries run under the observation's delivery gate,
//! which is what lets [`ObservationHandle::cancel`] guarantee that no
//! callback is running or will run once it returns.

use crate::config::ObservationConfig;
use crate::error::{Error, Result};
use crate::scheduler::Scheduler;
use roster_db::{CommitId, Snapshot, Store, TableName, WatcherId};
use std::collections::BTreeSet;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{mpsc, Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};
use tracing::{debug, trace, warn};

static NEXT_OBSERVATION: AtomicU64 = AtomicU64::new(1);

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Identifier of a started observation, used in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObservationId(pub u64);

impl fmt::Display for ObservationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "observation:{}", self.0)
    }
}

/// Lifecycle state of a started observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// Registered, not yet running
    Created,
    /// Delivering values
    Active,
    /// Stopped after a query error or a panicking callback
    Terminated,
    /// Stopped by its handle
    Cancelled,
}

impl Status {
    /// Whether the observation has stopped for good.
    pub fn is_terminal(self) -> bool {
        matches!(self, Status::Terminated | Status::Cancelled)
    }
}

struct State {
    status: Status,
    /// A failure is waiting to be handed to `on_error`
    error_pending: bool,
}

/// Which callback a delivery job runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delivery {
    Change,
    Error,
}

/// State shared by the handle, the worker and the delivery jobs.
struct Lifecycle {
    id: ObservationId,
    state: Mutex<State>,
    /// Held while a callback runs
    gate: Mutex<()>,
    /// Thread currently running a callback under the gate
    delivering: Mutex<Option<ThreadId>>,
    /// Wakes the worker so it unregisters and exits
    events: mpsc::Sender<Event>,
}

/// Clears [`Lifecycle::delivering`] even if the callback panics.
struct DeliveryGuard<'a>(&'a Mutex<Option<ThreadId>>);

impl Drop for DeliveryGuard<'_> {
    fn drop(&mut self) {
        *lock(self.0) = None;
    }
}

impl Lifecycle {
    fn new(events: mpsc::Sender<Event>) -> Self {
        Self {
            id: ObservationId(NEXT_OBSERVATION.fetch_add(1, Ordering::Relaxed)),
            state: Mutex::new(State {
                status: Status::Created,
                error_pending: false,
            }),
            gate: Mutex::new(()),
            delivering: Mutex::new(None),
            events,
        }
    }

    fn status(&self) -> Status {
        lock(&self.state).status
    }

    fn is_active(&self) -> bool {
        self.status() == Status::Active
    }

    fn activate(&self) {
        let mut state = lock(&self.state);
        if state.status == Status::Created {
            state.status = Status::Active;
        }
    }

    /// Active to Terminated. With `error`, one error delivery stays allowed.
    fn terminate(&self, error: bool) -> bool {
        let mut state = lock(&self.state);
        if state.status != Status::Active {
            return false;
        }
        state.status = Status::Terminated;
        state.error_pending = error;
        drop(state);
        let _ = self.events.send(Event::Stop);
        true
    }

    /// Move to Cancelled unless already stopped, and drop any pending error.
    fn cancel(&self) -> bool {
        let mut state = lock(&self.state);
        state.error_pending = false;
        if state.status.is_terminal() {
            return false;
        }
        state.status = Status::Cancelled;
        drop(state);
        let _ = self.events.send(Event::Stop);
        true
    }

    /// Run `f` under the gate if the observation still accepts `delivery`.
    ///
    /// A change is only delivered while active; an error only once, after
    /// the worker recorded it. A panicking callback terminates the
    /// observation.
    fn deliver(&self, delivery: Delivery, f: impl FnOnce()) -> bool {
        let _gate = lock(&self.gate);
        {
            let mut state = lock(&self.state);
            let allowed = match delivery {
                Delivery::Change => state.status == Status::Active,
                Delivery::Error => std::mem::take(&mut state.error_pending),
            };
            if !allowed {
                return false;
            }
        }
        *lock(&self.delivering) = Some(thread::current().id());
        let _guard = DeliveryGuard(&self.delivering);
        if panic::catch_unwind(AssertUnwindSafe(f)).is_err() {
            warn!(observation = %self.id, ?delivery, "observation callback panicked");
            self.terminate(false);
            return false;
        }
        true
    }

    /// Block until no callback is running, unless the caller is that callback.
    fn wait_for_delivery(&self) {
        if *lock(&self.delivering) == Some(thread::current().id()) {
            return;
        }
        drop(lock(&self.gate));
    }
}

enum Event {
    Commit(CommitId),
    Stop,
}

type QueryFn<T> = dyn Fn(&Snapshot<'_>) -> roster_db::Result<T> + Send + Sync;

/// A query plus the tables it reads.
///
/// The query must only read the declared tables; reading any other table
/// fails the query with [`roster_db::Error::UndeclaredTable`].
///
/// # Example
///
/// ```no_run
/// use roster_core::Ordering;
/// use roster_db::{StoredPlayer, Store, Tracked};
/// use roster_observe::{DispatchQueue, ValueObservation};
/// use std::sync::Arc;
///
/// let store = Arc::new(Store::in_memory()?);
/// let queue = DispatchQueue::new("ui")?;
/// let observation = ValueObservation::tracking([StoredPlayer::TABLE], |s| {
///     s.players(Ordering::ByScore)
/// });
/// let handle = observation.start(
///     &store,
///     Arc::new(queue),
///     |err| eprintln!("observation failed: {err}"),
///     |players| println!("{} players", players.len()),
/// )?;
/// handle.cancel();
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct ValueObservation<T> {
    region: BTreeSet<TableName>,
    fetch: Arc<QueryFn<T>>,
    config: ObservationConfig,
}

impl<T> Clone for ValueObservation<T> {
    fn clone(&self) -> Self {
        Self {
            region: self.region.clone(),
            fetch: self.fetch.clone(),
            config: self.config.clone(),
        }
    }
}

impl<T> fmt::Debug for ValueObservation<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueObservation")
            .field("region", &self.region)
            .field("config", &self.config)
            .finish()
    }
}

impl<T> ValueObservation<T>
where
    T: Clone + PartialEq + Send + 'static,
{
    /// Observe `fetch`, which reads only `tables`.
    pub fn tracking<I, F>(tables: I, fetch: F) -> Self
    where
        I: IntoIterator<Item = TableName>,
        F: Fn(&Snapshot<'_>) -> roster_db::Result<T> + Send + Sync + 'static,
    {
        Self {
            region: tables.into_iter().collect(),
            fetch: Arc::new(fetch),
            config: ObservationConfig::default(),
        }
    }

    /// Use `config` for workers started from this observation.
    pub fn with_config(mut self, config: ObservationConfig) -> Self {
        self.config = config;
        self
    }

    /// Declared tables.
    pub fn region(&self) -> &BTreeSet<TableName> {
        &self.region
    }

    /// Run the query once on a fresh snapshot.
    ///
    /// Fails with [`roster_db::Error::UndeclaredTable`] if the query read a
    /// table outside its region.
    pub fn fetch(&self, store: &Store) -> roster_db::Result<T> {
        store.read(|snapshot| {
            let value = match panic::catch_unwind(AssertUnwindSafe(|| (self.fetch)(snapshot))) {
                Ok(result) => result?,
                Err(_) => return Err(roster_db::Error::query("observed query panicked")),
            };
            if let Some(table) = snapshot
                .tables_read()
                .into_iter()
                .find(|t| !self.region.contains(t))
            {
                return Err(roster_db::Error::UndeclaredTable(table));
            }
            Ok(value)
        })
    }

    /// Start observing.
    ///
    /// The initial value is always delivered, first, through `on_change`.
    /// After that `on_change` receives each re-run result that differs from
    /// the one before it. A failed query delivers its error to `on_error`
    /// and terminates the observation. All callbacks run as jobs on
    /// `scheduler`.
    ///
    /// The returned handle cancels the observation when dropped.
    pub fn start<E, C>(
        &self,
        store: &Arc<Store>,
        scheduler: Arc<dyn Scheduler>,
        on_error: E,
        on_change: C,
    ) -> Result<ObservationHandle>
    where
        E: FnMut(roster_db::Error) + Send + 'static,
        C: FnMut(T) + Send + 'static,
    {
        let (events, receiver) = mpsc::channel();
        let lifecycle = Arc::new(Lifecycle::new(events.clone()));

        let registration = store.tracker().watch(self.region.iter().copied(), move |record| {
            let _ = events.send(Event::Commit(record.commit));
        });
        lifecycle.activate();

        let worker = Worker {
            observation: self.clone(),
            store: store.clone(),
            scheduler,
            lifecycle: lifecycle.clone(),
            watcher: registration.id,
            callbacks: Arc::new(Mutex::new(Callbacks {
                on_change: Box::new(on_change),
                on_error: Box::new(on_error),
            })),
            last: None,
        };
        let spawned = thread::Builder::new()
            .name(self.config.thread_name.clone())
            .spawn(move || worker.run(receiver));
        if let Err(e) = spawned {
            store.tracker().unwatch(registration.id);
            lifecycle.cancel();
            return Err(Error::spawn("observation worker", e));
        }

        debug!(
            observation = %lifecycle.id,
            watcher = %registration.id,
            since = %registration.since,
            region = ?self.region,
            "started observation"
        );
        Ok(ObservationHandle {
            lifecycle,
            store: store.clone(),
            watcher: registration.id,
        })
    }
}

struct Callbacks<T> {
    on_change: Box<dyn FnMut(T) + Send>,
    on_error: Box<dyn FnMut(roster_db::Error) + Send>,
}

struct Worker<T> {
    observation: ValueObservation<T>,
    store: Arc<Store>,
    scheduler: Arc<dyn Scheduler>,
    lifecycle: Arc<Lifecycle>,
    watcher: WatcherId,
    callbacks: Arc<Mutex<Callbacks<T>>>,
    last: Option<T>,
}

impl<T> Worker<T>
where
    T: Clone + PartialEq + Send + 'static,
{
    fn run(mut self, receiver: mpsc::Receiver<Event>) {
        if self.refresh(None) {
            'events: while let Ok(event) = receiver.recv() {
                let mut commit = match event {
                    Event::Commit(commit) => commit,
                    Event::Stop => break,
                };
                if self.observation.config.coalesce_pending {
                    while let Ok(pending) = receiver.try_recv() {
                        match pending {
                            Event::Commit(later) => commit = later,
                            Event::Stop => break 'events,
                        }
                    }
                }
                if !self.lifecycle.is_active() || !self.refresh(Some(commit)) {
                    break;
                }
            }
        }
        self.store.tracker().unwatch(self.watcher);
        trace!(observation = %self.lifecycle.id, "observation worker exited");
    }

    /// Re-run the query and schedule a delivery if needed.
    ///
    /// Returns false once the observation has failed.
    fn refresh(&mut self, commit: Option<CommitId>) -> bool {
        let id = self.lifecycle.id;
        match self.observation.fetch(&self.store) {
            Ok(value) => {
                if self.last.as_ref() == Some(&value) {
                    trace!(observation = %id, ?commit, "query result unchanged");
                    return true;
                }
                trace!(observation = %id, ?commit, "query result changed");
                self.last = Some(value.clone());
                let lifecycle = self.lifecycle.clone();
                let callbacks = self.callbacks.clone();
                self.scheduler.schedule(Box::new(move || {
                    lifecycle.deliver(Delivery::Change, || {
                        let mut callbacks = lock(&callbacks);
                        (callbacks.on_change)(value)
                    });
                }));
                true
            }
            Err(err) => {
                warn!(observation = %id, ?commit, error = %err, "observed query failed");
                // Terminated here, whether or not the error job ever runs
                if self.lifecycle.terminate(true) {
                    let lifecycle = self.lifecycle.clone();
                    let callbacks = self.callbacks.clone();
                    self.scheduler.schedule(Box::new(move || {
                        lifecycle.deliver(Delivery::Error, || {
                            let mut callbacks = lock(&callbacks);
                            (callbacks.on_error)(err)
                        });
                    }));
                }
                false
            }
        }
    }
}

/// Handle to a started observation.
///
/// Dropping the handle cancels the observation.
#[must_use = "dropping the handle cancels the observation"]
pub struct ObservationHandle {
    lifecycle: Arc<Lifecycle>,
    store: Arc<Store>,
    watcher: WatcherId,
}

impl ObservationHandle {
    /// Identifier used in logs.
    pub fn id(&self) -> ObservationId {
        self.lifecycle.id
    }

    /// Current lifecycle state.
    pub fn status(&self) -> Status {
        self.lifecycle.status()
    }

    /// Whether values are still being delivered.
    pub fn is_active(&self) -> bool {
        self.lifecycle.is_active()
    }

    /// Stop the observation.
    ///
    /// When this returns no callback of the observation is running, unless
    /// `cancel` was called from inside one, and none will run afterwards.
    /// Calling it again, or after the observation terminated, does nothing
    /// beyond discarding an error that has not been delivered yet.
    pub fn cancel(&self) {
        if self.lifecycle.cancel() {
            self.store.tracker().unwatch(self.watcher);
            debug!(observation = %self.lifecycle.id, "cancelled observation");
        }
        self.lifecycle.wait_for_delivery();
    }
}

impl Drop for ObservationHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl fmt::Debug for ObservationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservationHandle")
            .field("id", &self.lifecycle.id)
            .field("status", &self.status())
            .field("watcher", &self.watcher)
            .finish()
    }
}
