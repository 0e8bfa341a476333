//! Roster Core - Domain types shared by the roster crates
//!
//! This crate has no storage or threading concerns. It provides:
//! - `Player`, the single record type persisted by `roster-db`
//! - `PlayerId`, the store-assigned primary key
//! - `Ordering`, the two sort orders a player list can be observed in
//! - `PlayerRng`, a deterministic generator for sample players

mod identity;
mod ordering;
mod player;
mod rng;

pub use identity::PlayerId;
pub use ordering::Ordering;
pub use player::{Player, PLAYER_NAMES};
pub use rng::PlayerRng;
