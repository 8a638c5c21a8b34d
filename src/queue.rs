use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex};

/// A unit of work executed by a pool worker.
pub(crate) type Job = Box<dyn FnOnce() + Send + 'static>;

/// Error returned by [`JobQueue::push`] once the queue has closed.
///
/// Carries the rejected job back to the caller, the way a channel's
/// send error returns the unsent value.
pub(crate) struct QueueClosed(pub(crate) Job);

/// A blocking FIFO of jobs shared between submitters and workers.
///
/// The queue owns the pool's shutdown flag: the closed check in `push`
/// and the flag transition in `close` serialize on the queue mutex, so
/// a job can never slip in after the workers have been told to stop
/// waiting. After `close`, consumers drain whatever is still queued and
/// then receive `None`.
pub(crate) struct JobQueue {
    jobs: Mutex<VecDeque<Job>>,
    ready: Condvar,
    closed: AtomicBool,
}

impl JobQueue {
    pub(crate) fn new() -> Self {
        JobQueue {
            jobs: Mutex::new(VecDeque::new()),
            ready: Condvar::new(),
            closed: AtomicBool::new(false),
        }
    }

    /// Appends a job and wakes one idle worker.
    pub(crate) fn push(&self, job: Job) -> Result<(), QueueClosed> {
        let mut jobs = self.jobs.lock().expect("job queue lock poisoned");
        if self.closed.load(Ordering::SeqCst) {
            return Err(QueueClosed(job));
        }
        jobs.push_back(job);
        self.ready.notify_one();
        Ok(())
    }

    /// Blocks until a job is available or the queue is closed and empty.
    ///
    /// Jobs still queued when the queue closes are handed out in FIFO
    /// order before `None` is returned.
    pub(crate) fn pop_blocking(&self) -> Option<Job> {
        let mut jobs = self.jobs.lock().expect("job queue lock poisoned");
        loop {
            if let Some(job) = jobs.pop_front() {
                return Some(job);
            }
            if self.closed.load(Ordering::SeqCst) {
                return None;
            }
            jobs = self.ready.wait(jobs).expect("job queue lock poisoned");
        }
    }

    /// Closes the queue and wakes every blocked worker.
    ///
    /// Returns `true` if this call performed the open -> closed
    /// transition. Called once per pool shutdown.
    pub(crate) fn close(&self) -> bool {
        let _jobs = self.jobs.lock().expect("job queue lock poisoned");
        let was_closed = self.closed.swap(true, Ordering::SeqCst);
        self.ready.notify_all();
        !was_closed
    }

    /// Lock-free read of the shutdown flag.
    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    fn job(f: impl FnOnce() + Send + 'static) -> Job {
        Box::new(f)
    }

    #[test]
    fn pops_in_fifo_order() {
        let queue = JobQueue::new();
        let (tx, rx) = mpsc::channel();
        for i in 0..3 {
            let tx = tx.clone();
            queue.push(job(move || tx.send(i).unwrap())).ok().unwrap();
        }

        for expected in 0..3 {
            queue.pop_blocking().unwrap()();
            assert_eq!(rx.try_recv().unwrap(), expected);
        }
    }

    #[test]
    fn push_after_close_returns_the_job() {
        let queue = JobQueue::new();
        assert!(queue.close());

        let (tx, rx) = mpsc::channel();
        let rejected = match queue.push(job(move || tx.send(()).unwrap())) {
            Err(QueueClosed(job)) => job,
            Ok(()) => panic!("push succeeded on a closed queue"),
        };
        rejected();
        assert!(rx.try_recv().is_ok());
    }

    #[test]
    fn close_wakes_blocked_consumer() {
        let queue = std::sync::Arc::new(JobQueue::new());
        let waiter = {
            let queue = queue.clone();
            thread::spawn(move || queue.pop_blocking().is_none())
        };

        thread::sleep(Duration::from_millis(50));
        queue.close();
        assert!(waiter.join().unwrap());
    }

    #[test]
    fn close_is_a_one_shot_transition() {
        let queue = JobQueue::new();
        assert!(queue.close());
        assert!(!queue.close());
        assert!(queue.is_closed());
    }

    #[test]
    fn remaining_jobs_drain_after_close() {
        let queue = JobQueue::new();
        queue.push(job(|| {})).ok().unwrap();
        queue.push(job(|| {})).ok().unwrap();
        queue.close();

        assert!(queue.pop_blocking().is_some());
        assert!(queue.pop_blocking().is_some());
        assert!(queue.pop_blocking().is_none());
    }
}
