//! The observed player list.

use crate::config::RosterConfig;
use crate::error::{Error, Result};
use roster_core::{Ordering, Player, PlayerId, PlayerRng};
use roster_db::{Store, StoredPlayer, Tracked};
use roster_observe::{ObservationConfig, ObservationHandle, Scheduler, ValueObservation};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use tracing::{debug, info, warn};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Default)]
struct ListState {
    ordering: Ordering,
    players: Vec<Player>,
    last_error: Option<String>,
    revision: u64,
}

/// A sorted view of every player, kept current by an observation.
///
/// `players` stays empty until the first delivery after [`PlayerList::start`]
/// and is replaced wholesale by every later delivery. If the observation
/// fails, `players` keeps its last value and [`PlayerList::last_error`]
/// reports the failure.
pub struct PlayerList {
    store: Arc<Store>,
    scheduler: Arc<dyn Scheduler>,
    config: ObservationConfig,
    state: Arc<Mutex<ListState>>,
    observation: Mutex<Option<ObservationHandle>>,
    rng: Mutex<PlayerRng>,
}

impl PlayerList {
    /// Create a list over `store` delivering on `scheduler`. Not started.
    pub fn new(store: Arc<Store>, scheduler: Arc<dyn Scheduler>) -> Self {
        Self {
            store,
            scheduler,
            config: ObservationConfig::default(),
            state: Arc::new(Mutex::new(ListState::default())),
            observation: Mutex::new(None),
            rng: Mutex::new(PlayerRng::default()),
        }
    }

    /// Create a list using the ordering, seed and observation settings of `config`.
    pub fn from_config(
        store: Arc<Store>,
        scheduler: Arc<dyn Scheduler>,
        config: &RosterConfig,
    ) -> Self {
        let list = Self::new(store, scheduler)
            .with_observation_config(config.observation.clone())
            .with_rng(PlayerRng::new(config.seed));
        lock(&list.state).ordering = config.ordering;
        list
    }

    /// Use `config` for the list's observations.
    pub fn with_observation_config(mut self, config: ObservationConfig) -> Self {
        self.config = config;
        self
    }

    /// Use `rng` for random players.
    pub fn with_rng(self, rng: PlayerRng) -> Self {
        *lock(&self.rng) = rng;
        self
    }

    /// Start observing with the current ordering.
    pub fn start(&self) -> Result<()> {
        self.set_ordering(self.ordering())
    }

    /// Switch to `ordering`.
    ///
    /// The running observation is cancelled before the new one starts, so
    /// once this returns no delivery sorted the old way is applied.
    pub fn set_ordering(&self, ordering: Ordering) -> Result<()> {
        let mut slot = lock(&self.observation);
        if let Some(previous) = slot.take() {
            previous.cancel();
        }
        {
            let mut state = lock(&self.state);
            state.ordering = ordering;
            state.last_error = None;
        }
        *slot = Some(self.observe(ordering)?);
        debug!(%ordering, "player list ordering set");
        Ok(())
    }

    /// Switch to the other ordering.
    pub fn toggle_ordering(&self) -> Result<()> {
        self.set_ordering(self.ordering().toggled())
    }

    fn observe(&self, ordering: Ordering) -> Result<ObservationHandle> {
        let observation =
            ValueObservation::tracking([StoredPlayer::TABLE], move |s| s.players(ordering))
                .with_config(self.config.clone());

        let on_change = self.state.clone();
        let on_error = self.state.clone();
        let handle = observation.start(
            &self.store,
            self.scheduler.clone(),
            move |err| {
                warn!(error = %err, "player list observation failed");
                lock(&on_error).last_error = Some(err.to_string());
            },
            move |players| {
                let mut state = lock(&on_change);
                state.players = players;
                state.revision += 1;
            },
        )?;
        Ok(handle)
    }

    /// Stop observing. `players` keeps its last value.
    pub fn stop(&self) {
        if let Some(handle) = lock(&self.observation).take() {
            handle.cancel();
        }
    }

    /// Whether an observation is running.
    pub fn is_observing(&self) -> bool {
        lock(&self.observation)
            .as_ref()
            .is_some_and(ObservationHandle::is_active)
    }

    /// The last delivered players.
    pub fn players(&self) -> Vec<Player> {
        lock(&self.state).players.clone()
    }

    /// Current ordering.
    pub fn ordering(&self) -> Ordering {
        lock(&self.state).ordering
    }

    /// Message of the error that stopped the current observation.
    pub fn last_error(&self) -> Option<String> {
        lock(&self.state).last_error.clone()
    }

    /// Number of deliveries applied so far.
    pub fn revision(&self) -> u64 {
        lock(&self.state).revision
    }

    /// The store behind the list.
    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    /// Delete every player.
    pub fn delete_all(&self) -> Result<usize> {
        Ok(self.store.delete_all_players()?)
    }

    /// Delete the players at `offsets` in the current list.
    ///
    /// Offsets past the end are ignored.
    pub fn delete_at(&self, offsets: &[usize]) -> Result<usize> {
        let ids: Vec<PlayerId> = {
            let state = lock(&self.state);
            offsets
                .iter()
                .filter_map(|&i| state.players.get(i))
                .filter_map(|p| p.id)
                .collect()
        };
        Ok(self.store.delete_players(&ids)?)
    }

    /// Insert random players if the store is empty.
    pub fn seed_if_empty(&self, count: usize) -> Result<usize> {
        let mut rng = lock(&self.rng);
        Ok(self.store.create_random_players_if_empty(&mut rng, count)?)
    }

    /// Apply one random batch of changes.
    pub fn refresh(&self) -> Result<()> {
        let mut rng = lock(&self.rng);
        Ok(self.store.refresh_players(&mut rng)?)
    }

    /// Run `iterations` random refreshes concurrently, one thread each.
    pub fn stress_test(&self, iterations: usize) -> Result<()> {
        let seeds: Vec<u64> = {
            let mut rng = lock(&self.rng);
            (0..iterations).map(|_| rng.next_u64()).collect()
        };
        info!(iterations, "starting stress test");

        thread::scope(|scope| {
            let workers: Vec<_> = seeds
                .into_iter()
                .map(|seed| {
                    let store = &self.store;
                    scope.spawn(move || store.refresh_players(&mut PlayerRng::new(seed)))
                })
                .collect();
            for worker in workers {
                worker
                    .join()
                    .map_err(|_| Error::WorkerPanicked("stress test"))??;
            }
            Ok::<(), Error>(())
        })?;

        info!(iterations, "stress test finished");
        Ok(())
    }
}

impl Drop for PlayerList {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for PlayerList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = lock(&self.state);
        f.debug_struct("PlayerList")
            .field("ordering", &state.ordering)
            .field("players", &state.players.len())
            .field("revision", &state.revision)
            .finish()
    }
}
