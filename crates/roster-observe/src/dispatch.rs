//! Serial dispatch queue
//!
//! A [`DispatchQueue`] owns one named thread and runs submitted jobs on it
//! in FIFO order. It plays the role of a UI thread: observation callbacks
//! scheduled on it never run concurrently with each other or with other
//! work submitted to the same queue.

use crate::error::{Error, Result};
use crate::scheduler::{Job, Scheduler};
use std::panic::{self, AssertUnwindSafe};
use std::sync::{mpsc, Arc};
use std::thread::{self, ThreadId};
use tracing::{debug, warn};

struct QueueInner {
    name: String,
    sender: mpsc::Sender<Job>,
    thread: ThreadId,
}

/// A serial queue backed by a dedicated thread.
///
/// Clones share the same thread. The thread exits once every clone has been
/// dropped and the jobs already queued have run.
#[derive(Clone)]
pub struct DispatchQueue {
    inner: Arc<QueueInner>,
}

impl DispatchQueue {
    /// Spawn a queue whose thread carries `name`.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let (sender, receiver) = mpsc::channel::<Job>();
        let thread_name = name.clone();
        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                for job in receiver {
                    if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
                        warn!(queue = %thread_name, "dispatched job panicked");
                    }
                }
                debug!(queue = %thread_name, "dispatch queue stopped");
            })
            .map_err(|e| Error::spawn("dispatch queue", e))?;
        let thread = handle.thread().id();
        debug!(queue = %name, "started dispatch queue");
        Ok(Self {
            inner: Arc::new(QueueInner {
                name,
                sender,
                thread,
            }),
        })
    }

    /// Name of the queue's thread.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Whether the calling thread is this queue's thread.
    pub fn is_current(&self) -> bool {
        thread::current().id() == self.inner.thread
    }

    /// Queue `f` and wait for its result.
    ///
    /// Runs `f` inline when called from the queue's own thread. Returns
    /// `None` if the job could not run to completion.
    pub fn sync<R, F>(&self, f: F) -> Option<R>
    where
        R: Send + 'static,
        F: FnOnce() -> R + Send + 'static,
    {
        if self.is_current() {
            return Some(f());
        }
        let (tx, rx) = mpsc::sync_channel(1);
        self.schedule(Box::new(move || {
            let _ = tx.send(f());
        }));
        rx.recv().ok()
    }
}

impl Scheduler for DispatchQueue {
    fn schedule(&self, job: Job) {
        if self.inner.sender.send(job).is_err() {
            warn!(queue = %self.inner.name, "dispatch queue stopped, dropping job");
        }
    }
}

impl std::fmt::Debug for DispatchQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchQueue")
            .field("name", &self.inner.name)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_jobs_run_in_order() {
        let queue = DispatchQueue::new("test-order").unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        for i in 0..10 {
            let seen = seen.clone();
            queue.schedule(Box::new(move || seen.lock().unwrap().push(i)));
        }
        queue.sync(|| ()).unwrap();
        assert_eq!(*seen.lock().unwrap(), (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_is_current() {
        let queue = DispatchQueue::new("test-current").unwrap();
        assert!(!queue.is_current());
        let handle = queue.clone();
        assert_eq!(queue.sync(move || handle.is_current()), Some(true));
    }

    #[test]
    fn test_thread_name() {
        let queue = DispatchQueue::new("test-name").unwrap();
        assert_eq!(queue.name(), "test-name");
        let name = queue.sync(|| thread::current().name().map(str::to_string));
        assert_eq!(name, Some(Some("test-name".to_string())));
    }

    #[test]
    fn test_sync_from_queue_runs_inline() {
        let queue = DispatchQueue::new("test-reentrant").unwrap();
        let inner = queue.clone();
        let value = queue.sync(move || inner.sync(|| 7));
        assert_eq!(value, Some(Some(7)));
    }

    #[test]
    fn test_panicking_job_keeps_queue_alive() {
        let queue = DispatchQueue::new("test-panic").unwrap();
        queue.schedule(Box::new(|| panic!("boom")));
        assert_eq!(queue.sync(|| 1), Some(1));
    }
}
