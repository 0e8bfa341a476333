//! Roster Model - The observed player list
//!
//! [`PlayerList`] keeps a sorted copy of the player table up to date by
//! running a [`roster_observe::ValueObservation`] over it. Changing the
//! ordering cancels the running observation and starts a new one.
//! [`RosterConfig`] bundles the settings an application needs to open a
//! store and run a list, loaded from RON.

mod config;
mod error;
mod player_list;

pub use config::RosterConfig;
pub use error::{Error, Result};
pub use player_list::PlayerList;
