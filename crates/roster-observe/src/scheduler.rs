//! Delivery schedulers
//!
//! Observations never call their callbacks directly: every delivery is
//! wrapped in a [`Job`] and handed to a [`Scheduler`]. Schedulers must run
//! the jobs they receive one at a time, in the order received.

/// A unit of work handed to a scheduler.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Runs delivery jobs in submission order, one at a time.
pub trait Scheduler: Send + Sync {
    /// Run `job`, now or later.
    fn schedule(&self, job: Job);
}

/// Runs each job inline on the scheduling thread.
///
/// With this scheduler callbacks run on the observation's worker thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImmediateScheduler;

impl Scheduler for ImmediateScheduler {
    fn schedule(&self, job: Job) {
        job()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_immediate_runs_inline() {
        let ran = Arc::new(AtomicUsize::new(0));
        let counter = ran.clone();
        ImmediateScheduler.schedule(Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }
}
