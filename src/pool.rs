use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex};
use std::thread;

use log::{debug, error};

use crate::queue::{Job, JobQueue, QueueClosed};
use crate::task::Task;
use crate::{PoolError, Result};

/// State shared between the pool handle, its workers, and every task.
pub(crate) struct PoolShared {
    queue: JobQueue,
}

impl PoolShared {
    /// True once shutdown has begun. The flag is monotonic.
    pub(crate) fn is_stopping(&self) -> bool {
        self.queue.is_closed()
    }

    /// Hands a job to the work queue so it is load-balanced across the
    /// workers, or runs it on the current thread if the pool is shutting
    /// down. Continuation dispatch goes through here: a continuation may
    /// lose the race with shutdown, but it is never dropped.
    pub(crate) fn dispatch(&self, job: Job) {
        if let Err(QueueClosed(job)) = self.queue.push(job) {
            debug!("pool is stopping; running continuation inline");
            job();
        }
    }
}

/// A fixed-size pool of worker threads executing submitted computations.
///
/// Workers block on a shared FIFO queue; [`submit`](ThreadPool::submit)
/// returns a [`Task`] handle immediately. The worker count is fixed at
/// construction and never changes.
pub struct ThreadPool {
    shared: Arc<PoolShared>,
    thread_count: usize,
    workers: Mutex<Vec<thread::JoinHandle<()>>>,
}

impl ThreadPool {
    /// Creates a pool with `threads` worker threads.
    ///
    /// # Panics
    ///
    /// Panics if `threads` is zero.
    pub fn new(threads: usize) -> ThreadPool {
        assert!(threads > 0, "thread pool requires at least one worker");

        let shared = Arc::new(PoolShared {
            queue: JobQueue::new(),
        });
        let workers = (0..threads)
            .map(|id| spawn_worker(id, shared.clone()))
            .collect();

        ThreadPool {
            shared,
            thread_count: threads,
            workers: Mutex::new(workers),
        }
    }

    /// The fixed number of worker threads.
    pub fn threads(&self) -> usize {
        self.thread_count
    }

    /// Submits a computation, returning a handle to its eventual outcome.
    ///
    /// Non-blocking; the computation runs on whichever worker dequeues
    /// it. Fails with [`PoolError::PoolStopped`] once shutdown has begun.
    pub fn submit<T, F>(&self, f: F) -> Result<Task<T>>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        if self.shared.is_stopping() {
            return Err(PoolError::PoolStopped);
        }

        let task = Task::pending(self.shared.clone());
        // The push re-checks the shutdown flag under the queue lock.
        match self.shared.queue.push(task.execution_job(f)) {
            Ok(()) => Ok(task),
            Err(QueueClosed(_)) => Err(PoolError::PoolStopped),
        }
    }

    /// Stops the pool and joins every worker thread.
    ///
    /// Idempotent and safe to call from multiple threads; every call
    /// returns only after all workers have exited. Jobs still queued
    /// when shutdown begins are drained by the exiting workers and
    /// resolve their tasks to [`PoolError::Cancelled`] without running
    /// user code. A job already mid-execution runs to completion.
    pub fn shutdown(&self) {
        // Serializes concurrent callers: a second call blocks here until
        // the first has joined the workers, then finds nothing to do.
        let mut workers = self.workers.lock().expect("worker list lock poisoned");
        if !self.shared.queue.close() {
            return;
        }

        debug!("shutting down, joining {} workers", workers.len());
        for handle in workers.drain(..) {
            if handle.join().is_err() {
                error!("worker thread panicked during shutdown");
            }
        }
    }
}

impl Default for ThreadPool {
    /// A pool sized to the host's available parallelism.
    fn default() -> ThreadPool {
        ThreadPool::new(num_cpus::get())
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Spawns one named worker that pulls jobs until the queue closes.
fn spawn_worker(id: usize, shared: Arc<PoolShared>) -> thread::JoinHandle<()> {
    thread::Builder::new()
        .name(format!("pool-worker-{id}"))
        .spawn(move || {
            debug!("worker {id} started");
            while let Some(job) = shared.queue.pop_blocking() {
                // Catch panics so one failing job never kills a worker.
                if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
                    error!("worker {id}: job panicked, continuing");
                }
            }
            debug!("worker {id}: queue closed, shutting down");
        })
        .expect("failed to spawn worker thread")
}
