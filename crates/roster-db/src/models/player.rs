//! Player model for database storage.

use super::{TableName, Tracked};
use native_db::*;
use native_model::{native_model, Model};
use roster_core::{Player, PlayerId};
use serde::{Deserialize, Serialize};

/// Stored player row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[native_model(id = 1, version = 1)]
#[native_db]
pub struct StoredPlayer {
    /// Primary key - assigned from the player sequence.
    #[primary_key]
    pub id: u64,
    /// Display name.
    pub name: String,
    /// Current score.
    pub score: i64,
}

impl StoredPlayer {
    /// Create from a player and the id it is stored under.
    pub fn from_player(id: PlayerId, player: &Player) -> Self {
        Self {
            id: id.raw(),
            name: player.name.clone(),
            score: player.score,
        }
    }

    /// Convert to a persisted player.
    pub fn to_player(&self) -> Player {
        Player::new(self.name.clone(), self.score).with_id(PlayerId::new(self.id))
    }
}

impl Tracked for StoredPlayer {
    const TABLE: TableName = "player";
}
