//! Bounded polling
//!
//! Deliveries are asynchronous relative to the commit that caused them.
//! Code that needs to see the effect of a known write polls for it.

use std::thread;
use std::time::{Duration, Instant};

/// Interval between checks in [`wait_until`].
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Poll `condition` until it holds or `timeout` elapses.
///
/// Returns whether the condition was met. The condition is always checked
/// at least once, and once more after the deadline.
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(DEFAULT_POLL_INTERVAL);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_immediate_success() {
        assert!(wait_until(Duration::ZERO, || true));
    }

    #[test]
    fn test_timeout() {
        let started = Instant::now();
        assert!(!wait_until(Duration::from_millis(20), || false));
        assert!(started.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn test_eventual_success() {
        let mut calls = 0;
        assert!(wait_until(Duration::from_secs(1), || {
            calls += 1;
            calls == 3
        }));
        assert_eq!(calls, 3);
    }
}
