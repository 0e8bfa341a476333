//! Leaderboard Demo
//!
//! Keeps a sorted player list in sync with the store while random writes,
//! an ordering switch and a burst of concurrent refreshes go through it.
//!
//! Usage: `leaderboard [config.ron]`

use roster_core::Player;
use roster_db::Store;
use roster_model::{PlayerList, RosterConfig};
use roster_observe::{wait_until, DispatchQueue};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const SETTLE: Duration = Duration::from_secs(1);

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = match std::env::args().nth(1) {
        Some(path) => RosterConfig::load(path)?,
        None => RosterConfig::default(),
    };

    // RUST_LOG wins over the configured filter
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    println!("=== Roster Leaderboard Demo ===\n");

    let store = Arc::new(Store::from_config(&config.database)?);
    let queue = DispatchQueue::new("leaderboard-ui")?;
    let list = PlayerList::from_config(store, Arc::new(queue), &config);

    let seeded = list.seed_if_empty(config.initial_players)?;
    info!(seeded, "store ready");
    list.start()?;
    settle(&list, 0);
    print_board("Initial", &list);

    for round in 1..=3 {
        let revision = list.revision();
        list.refresh()?;
        settle(&list, revision);
        print_board(&format!("After refresh {round}"), &list);
    }

    let revision = list.revision();
    list.toggle_ordering()?;
    settle(&list, revision);
    print_board("Switched ordering", &list);

    let revision = list.revision();
    list.stress_test(20)?;
    settle(&list, revision);
    print_board("After 20 concurrent refreshes", &list);

    let revision = list.revision();
    let deleted = list.delete_at(&[0])?;
    settle(&list, revision);
    print_board(&format!("Deleted {deleted} from the top"), &list);

    let revision = list.revision();
    let deleted = list.delete_all()?;
    settle(&list, revision);
    print_board(&format!("Deleted all {deleted}"), &list);

    if let Some(error) = list.last_error() {
        println!("Observation stopped: {error}");
    }
    println!("=== Demo Complete ===");
    Ok(())
}

/// Wait for a delivery newer than `revision`, if one comes.
fn settle(list: &PlayerList, revision: u64) {
    wait_until(SETTLE, || list.revision() > revision);
}

fn print_board(title: &str, list: &PlayerList) {
    let players = list.players();
    println!("{title} (by {}, {} players):", list.ordering(), players.len());
    for (rank, player) in players.iter().enumerate() {
        print_row(rank + 1, player);
    }
    println!();
}

fn print_row(rank: usize, player: &Player) {
    let id = player
        .id
        .map(|id| id.to_string())
        .unwrap_or_else(|| "unsaved".to_string());
    println!("  {rank:>2}. {:<12} {:>5}  ({id})", player.name, player.score);
}
