//! The player record

use crate::identity::PlayerId;
use crate::rng::PlayerRng;
use serde::{Deserialize, Serialize};

/// Names drawn by [`Player::random`].
pub const PLAYER_NAMES: &[&str] = &[
    "Arthur", "Anita", "Barbara", "Bernard", "Craig", "Chiara", "David", "Dean", "Éric", "Elena",
    "Fatima", "Frederik", "Gilbert", "Georgette", "Henriette", "Hassan", "Ignacio", "Irene",
    "Julie", "Jack", "Karl", "Kristel", "Louis", "Liz", "Masashi", "Mary", "Noam", "Nicole",
    "Ophelie", "Oleg", "Pascal", "Patricia", "Quentin", "Quinn", "Raoul", "Rachel", "Stephan",
    "Susie", "Tristan", "Tatiana", "Ursule", "Urbain", "Victor", "Violette", "Wilfried",
    "Wilhelmina", "Yvon", "Yann", "Zazie", "Zoé",
];

/// Upper bound (inclusive) of random scores.
const MAX_RANDOM_SCORE: i64 = 1000;

/// A player record
///
/// `id` is `None` until the record has been saved once. Equality compares
/// every field, so an unsaved player never equals its saved copy.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Player {
    /// Store-assigned primary key
    pub id: Option<PlayerId>,
    /// Display name
    pub name: String,
    /// Current score
    pub score: i64,
}

impl Player {
    /// Create an unsaved player
    pub fn new(name: impl Into<String>, score: i64) -> Self {
        Self {
            id: None,
            name: name.into(),
            score,
        }
    }

    /// Return a copy carrying the given id
    pub fn with_id(mut self, id: PlayerId) -> Self {
        self.id = Some(id);
        self
    }

    /// Whether the player has been saved
    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    /// Create an unsaved player with a random name and score
    pub fn random(rng: &mut PlayerRng) -> Self {
        let name = rng.pick(PLAYER_NAMES).copied().unwrap_or("Player");
        Self::new(name, Self::random_score(rng))
    }

    /// A random score in `0..=1000`
    pub fn random_score(rng: &mut PlayerRng) -> i64 {
        rng.range_i64(0, MAX_RANDOM_SCORE)
    }
}
