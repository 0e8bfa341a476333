//! Sort orders for player lists

use crate::player::Player;
use icu_collator::options::{CollatorOptions, Strength};
use icu_collator::{Collator, CollatorBorrowed};
use serde::{Deserialize, Serialize};
use std::cmp;
use std::sync::LazyLock;

// Root-locale collation; secondary strength ignores case but not accents
static NAME_COLLATOR: LazyLock<CollatorBorrowed<'static>> = LazyLock::new(|| {
    let mut options = CollatorOptions::default();
    options.strength = Some(Strength::Secondary);
    Collator::try_new(Default::default(), options).expect("root collation data")
});

/// How a player list is sorted
///
/// - `ByName`: ascending, case-insensitive, locale-aware
/// - `ByScore`: descending score, ties broken by case-insensitive name
///
/// Both orders fall back to the id so that the result is total and two
/// fetches of the same data always agree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ordering {
    ByName,
    #[default]
    ByScore,
}

impl Ordering {
    /// The other ordering
    pub fn toggled(self) -> Self {
        match self {
            Ordering::ByName => Ordering::ByScore,
            Ordering::ByScore => Ordering::ByName,
        }
    }

    /// Compare two players under this ordering
    pub fn compare(self, a: &Player, b: &Player) -> cmp::Ordering {
        match self {
            Ordering::ByName => compare_names(&a.name, &b.name).then_with(|| a.id.cmp(&b.id)),
            Ordering::ByScore => b
                .score
                .cmp(&a.score)
                .then_with(|| compare_names(&a.name, &b.name))
                .then_with(|| a.id.cmp(&b.id)),
        }
    }

    /// Sort players in place
    pub fn sort(self, players: &mut [Player]) {
        players.sort_by(|a, b| self.compare(a, b));
    }
}

impl std::fmt::Display for Ordering {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Ordering::ByName => write!(f, "name"),
            Ordering::ByScore => write!(f, "score"),
        }
    }
}

/// Locale-aware, case-insensitive name comparison
///
/// Names equal under collation are then ordered by their original spelling.
fn compare_names(a: &str, b: &str) -> cmp::Ordering {
    NAME_COLLATOR.compare(a, b).then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PlayerId;

    fn player(id: u64, name: &str, score: i64) -> Player {
        Player::new(name, score).with_id(PlayerId::new(id))
    }

    fn names(players: &[Player]) -> Vec<&str> {
        players.iter().map(|p| p.name.as_str()).collect()
    }

    #[test]
    fn test_by_name_is_case_insensitive() {
        let mut players = vec![
            player(1, "bob", 10),
            player(2, "Alice", 20),
            player(3, "carol", 5),
            player(4, "Bea", 7),
        ];
        Ordering::ByName.sort(&mut players);
        assert_eq!(names(&players), vec!["Alice", "Bea", "bob", "carol"]);
    }

    #[test]
    fn test_by_score_descending_with_name_ties() {
        let mut players = vec![
            player(1, "bob", 10),
            player(2, "Alice", 20),
            player(3, "arthur", 10),
            player(4, "Carol", 5),
        ];
        Ordering::ByScore.sort(&mut players);
        assert_eq!(names(&players), vec!["Alice", "arthur", "bob", "Carol"]);
    }

    #[test]
    fn test_accented_names_sort_with_base_letter() {
        let mut players = vec![
            player(1, "Zoé", 1),
            player(2, "élodie", 1),
            player(3, "Éric", 1),
            player(4, "bob", 1),
        ];
        Ordering::ByName.sort(&mut players);
        assert_eq!(names(&players), vec!["bob", "élodie", "Éric", "Zoé"]);
    }

    #[test]
    fn test_accent_difference_outranks_case() {
        let mut players = vec![player(1, "Éric", 1), player(2, "ERIC", 1), player(3, "eric", 1)];
        Ordering::ByName.sort(&mut players);
        // Unaccented before accented; case only breaks the remaining tie
        assert_eq!(names(&players), vec!["ERIC", "eric", "Éric"]);
    }

    #[test]
    fn test_same_name_falls_back_to_id() {
        let a = player(2, "Anna", 3);
        let b = player(1, "Anna", 3);
        assert_eq!(Ordering::ByName.compare(&a, &b), cmp::Ordering::Greater);
        assert_eq!(Ordering::ByScore.compare(&a, &b), cmp::Ordering::Greater);
    }

    #[test]
    fn test_toggled() {
        assert_eq!(Ordering::ByName.toggled(), Ordering::ByScore);
        assert_eq!(Ordering::ByScore.toggled(), Ordering::ByName);
        assert_eq!(Ordering::default(), Ordering::ByScore);
    }

    #[test]
    fn test_serde_names() {
        let parsed: Ordering = ron::from_str("by_name").unwrap();
        assert_eq!(parsed, Ordering::ByName);
        assert_eq!(ron::to_string(&Ordering::ByScore).unwrap(), "by_score");
    }
}
