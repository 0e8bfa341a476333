//! Player record operations.
//!
//! Each `Store` method is one read snapshot or one write commit. The
//! `Transaction` and `Snapshot` methods let callers compose several
//! operations into a single transaction or an observed query.

use crate::error::{Error, Result};
use crate::models::{StoredPlayer, Tracked};
use crate::snapshot::Snapshot;
use crate::store::Store;
use crate::transaction::Transaction;
use roster_core::{Ordering, Player, PlayerId, PlayerRng};
use tracing::debug;

/// Number of players created when seeding an empty table.
pub const DEFAULT_PLAYER_COUNT: usize = 8;

impl Store {
    /// Insert or update a player.
    ///
    /// A player without id is inserted and returned with its new id. A
    /// player with an id overwrites the stored row; if that id does not
    /// exist, returns [`Error::NotFound`] and nothing is written.
    pub fn save_player(&self, player: &Player) -> Result<Player> {
        self.write(|tx| tx.save_player(player))
    }

    /// Delete every player in one transaction, returning how many existed.
    pub fn delete_all_players(&self) -> Result<usize> {
        self.write(|tx| tx.delete_all_players())
    }

    /// Delete the given players in one transaction, returning how many existed.
    pub fn delete_players(&self, ids: &[PlayerId]) -> Result<usize> {
        self.write(|tx| tx.delete_players(ids))
    }

    /// All players, sorted.
    pub fn fetch_all_players(&self, ordering: Ordering) -> Result<Vec<Player>> {
        self.read(|s| s.players(ordering))
    }

    /// The player with the lowest id, if any.
    pub fn fetch_one_player(&self) -> Result<Option<Player>> {
        self.read(|s| s.first_player())
    }

    /// A player by id.
    pub fn fetch_player(&self, id: PlayerId) -> Result<Option<Player>> {
        self.read(|s| s.player(id))
    }

    /// Number of players.
    pub fn fetch_player_count(&self) -> Result<usize> {
        self.read(|s| s.player_count())
    }

    /// Insert `count` random players if the table is empty.
    ///
    /// Returns the number of players inserted.
    pub fn create_random_players_if_empty(
        &self,
        rng: &mut PlayerRng,
        count: usize,
    ) -> Result<usize> {
        self.write(|tx| {
            if tx.all::<StoredPlayer>()?.is_empty() {
                tx.insert_random_players(rng, count)
            } else {
                Ok(0)
            }
        })
    }

    /// Apply a random batch of changes in one transaction.
    ///
    /// An empty table is seeded with [`DEFAULT_PLAYER_COUNT`] players.
    /// Otherwise one to three changes are made, each either a new score,
    /// a deletion or an insertion.
    pub fn refresh_players(&self, rng: &mut PlayerRng) -> Result<()> {
        self.write(|tx| tx.refresh_players(rng))
    }
}

impl Transaction<'_> {
    /// See [`Store::save_player`].
    pub fn save_player(&mut self, player: &Player) -> Result<Player> {
        match player.id {
            None => {
                let id = PlayerId::new(self.next_id(StoredPlayer::TABLE)?);
                self.insert(StoredPlayer::from_player(id, player))?;
                debug!(player = %id, "inserted player");
                Ok(player.clone().with_id(id))
            }
            Some(id) => {
                let existing = self
                    .get::<StoredPlayer>(id.raw())?
                    .ok_or(Error::NotFound(id))?;
                self.update(existing, StoredPlayer::from_player(id, player))?;
                debug!(player = %id, "updated player");
                Ok(player.clone())
            }
        }
    }

    /// See [`Store::delete_all_players`].
    pub fn delete_all_players(&mut self) -> Result<usize> {
        let rows = self.all::<StoredPlayer>()?;
        let count = rows.len();
        for row in rows {
            self.remove(row)?;
        }
        debug!(count, "deleted all players");
        Ok(count)
    }

    /// See [`Store::delete_players`].
    pub fn delete_players(&mut self, ids: &[PlayerId]) -> Result<usize> {
        let mut count = 0;
        for id in ids {
            if let Some(row) = self.get::<StoredPlayer>(id.raw())? {
                self.remove(row)?;
                count += 1;
            }
        }
        Ok(count)
    }

    fn insert_random_players(&mut self, rng: &mut PlayerRng, count: usize) -> Result<usize> {
        for _ in 0..count {
            self.save_player(&Player::random(rng))?;
        }
        Ok(count)
    }

    /// See [`Store::refresh_players`].
    pub fn refresh_players(&mut self, rng: &mut PlayerRng) -> Result<()> {
        let rows = self.all::<StoredPlayer>()?;
        if rows.is_empty() {
            self.insert_random_players(rng, DEFAULT_PLAYER_COUNT)?;
            return Ok(());
        }

        let mut remaining: Vec<Player> = rows.iter().map(StoredPlayer::to_player).collect();
        let changes = rng.range_i64(1, 3);
        for _ in 0..changes {
            match rng.range_i64(0, 2) {
                0 => {
                    if let Some(i) = rng.index(remaining.len()) {
                        let mut player = remaining[i].clone();
                        player.score = Player::random_score(rng);
                        remaining[i] = self.save_player(&player)?;
                    }
                }
                1 => {
                    if let Some(i) = rng.index(remaining.len()) {
                        let player = remaining.swap_remove(i);
                        if let Some(id) = player.id {
                            self.delete_players(&[id])?;
                        }
                    }
                }
                _ => {
                    let player = self.save_player(&Player::random(rng))?;
                    remaining.push(player);
                }
            }
        }
        Ok(())
    }
}

impl Snapshot<'_> {
    /// All players, sorted.
    pub fn players(&self, ordering: Ordering) -> Result<Vec<Player>> {
        let mut players: Vec<Player> = self
            .all::<StoredPlayer>()?
            .iter()
            .map(StoredPlayer::to_player)
            .collect();
        ordering.sort(&mut players);
        Ok(players)
    }

    /// The player with the lowest id, if any.
    pub fn first_player(&self) -> Result<Option<Player>> {
        Ok(self.first::<StoredPlayer>()?.map(|s| s.to_player()))
    }

    /// A player by id.
    pub fn player(&self, id: PlayerId) -> Result<Option<Player>> {
        Ok(self.get::<StoredPlayer>(id.raw())?.map(|s| s.to_player()))
    }

    /// Number of players.
    pub fn player_count(&self) -> Result<usize> {
        Ok(self.count::<StoredPlayer>()? as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::CommitId;

    fn store() -> Store {
        Store::in_memory().unwrap()
    }

    #[test]
    fn test_insert_assigns_id() {
        let store = store();
        let saved = store.save_player(&Player::new("Arthur", 100)).unwrap();

        let id = saved.id.expect("saved player has an id");
        assert_eq!(saved.name, "Arthur");
        assert_eq!(saved.score, 100);
        assert_eq!(store.fetch_player(id).unwrap(), Some(saved));
    }

    #[test]
    fn test_insert_ids_are_distinct() {
        let store = store();
        let a = store.save_player(&Player::new("Arthur", 1)).unwrap();
        let b = store.save_player(&Player::new("Barbara", 2)).unwrap();
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_update_preserves_identity() {
        let store = store();
        let saved = store.save_player(&Player::new("Arthur", 100)).unwrap();
        store.save_player(&Player::new("Barbara", 50)).unwrap();

        let mut changed = saved.clone();
        changed.name = "Arthur II".to_string();
        changed.score = 300;
        let updated = store.save_player(&changed).unwrap();

        assert_eq!(updated.id, saved.id);
        assert_eq!(store.fetch_player_count().unwrap(), 2);
        assert_eq!(store.fetch_player(saved.id.unwrap()).unwrap(), Some(changed));
    }

    #[test]
    fn test_update_nonexistent_fails() {
        let store = store();
        let ghost = Player::new("Ghost", 1).with_id(PlayerId::new(99));

        let result = store.save_player(&ghost);

        assert!(matches!(result, Err(Error::NotFound(id)) if id == PlayerId::new(99)));
        assert_eq!(store.fetch_player_count().unwrap(), 0);
        assert_eq!(store.fetch_player(PlayerId::new(99)).unwrap(), None);
        assert_eq!(store.tracker().last_commit(), CommitId(0));
    }

    #[test]
    fn test_delete_all_empties_table() {
        let store = store();
        for i in 0..5 {
            store.save_player(&Player::new(format!("P{i}"), i)).unwrap();
        }

        assert_eq!(store.delete_all_players().unwrap(), 5);
        assert_eq!(store.fetch_player_count().unwrap(), 0);
        assert_eq!(store.delete_all_players().unwrap(), 0);
    }

    #[test]
    fn test_delete_all_on_empty_table_touches_nothing() {
        let store = store();
        let (count, record) = store
            .write_recorded(|tx| tx.delete_all_players())
            .unwrap();
        assert_eq!(count, 0);
        assert!(record.is_empty());
    }

    #[test]
    fn test_ids_not_reused_after_delete() {
        let store = store();
        let first = store.save_player(&Player::new("A", 1)).unwrap();
        store.delete_all_players().unwrap();
        let second = store.save_player(&Player::new("B", 2)).unwrap();
        assert!(second.id > first.id);
    }

    #[test]
    fn test_delete_players() {
        let store = store();
        let a = store.save_player(&Player::new("A", 1)).unwrap();
        let b = store.save_player(&Player::new("B", 2)).unwrap();

        let deleted = store
            .delete_players(&[a.id.unwrap(), PlayerId::new(1000)])
            .unwrap();

        assert_eq!(deleted, 1);
        assert_eq!(store.fetch_all_players(Ordering::ByName).unwrap(), vec![b]);
    }

    #[test]
    fn test_fetch_all_sorted() {
        let store = store();
        store.save_player(&Player::new("carol", 30)).unwrap();
        store.save_player(&Player::new("Alice", 10)).unwrap();
        store.save_player(&Player::new("bob", 20)).unwrap();

        let by_name: Vec<String> = store
            .fetch_all_players(Ordering::ByName)
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        let by_score: Vec<i64> = store
            .fetch_all_players(Ordering::ByScore)
            .unwrap()
            .into_iter()
            .map(|p| p.score)
            .collect();

        assert_eq!(by_name, vec!["Alice", "bob", "carol"]);
        assert_eq!(by_score, vec![30, 20, 10]);
    }

    #[test]
    fn test_fetch_one() {
        let store = store();
        assert_eq!(store.fetch_one_player().unwrap(), None);
        let first = store.save_player(&Player::new("Zed", 1)).unwrap();
        store.save_player(&Player::new("Amy", 2)).unwrap();
        assert_eq!(store.fetch_one_player().unwrap(), Some(first));
    }

    #[test]
    fn test_create_random_players_if_empty() {
        let store = store();
        let mut rng = PlayerRng::new(42);

        assert_eq!(store.create_random_players_if_empty(&mut rng, 4).unwrap(), 4);
        assert_eq!(store.create_random_players_if_empty(&mut rng, 4).unwrap(), 0);
        assert_eq!(store.fetch_player_count().unwrap(), 4);
    }

    #[test]
    fn test_refresh_seeds_empty_table() {
        let store = store();
        let mut rng = PlayerRng::new(7);
        store.refresh_players(&mut rng).unwrap();
        assert_eq!(store.fetch_player_count().unwrap(), DEFAULT_PLAYER_COUNT);
    }

    #[test]
    fn test_refresh_is_one_commit() {
        let store = store();
        let mut rng = PlayerRng::new(7);
        store.refresh_players(&mut rng).unwrap();
        let before = store.tracker().last_commit();

        for _ in 0..20 {
            store.refresh_players(&mut rng).unwrap();
        }

        assert_eq!(store.tracker().last_commit().0, before.0 + 20);
    }

    #[test]
    fn test_snapshot_reads_are_consistent() {
        let store = store();
        store.save_player(&Player::new("A", 1)).unwrap();
        let (count, players) = store
            .read(|s| Ok((s.player_count()?, s.players(Ordering::ByName)?)))
            .unwrap();
        assert_eq!(count, players.len());
    }
}
