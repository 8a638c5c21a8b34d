use std::any::Any;
use std::collections::VecDeque;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex};

use crate::pool::PoolShared;
use crate::queue::Job;
use crate::{PoolError, Result};

/// A handle to a computation's eventual outcome.
///
/// Returned by [`ThreadPool::submit`](crate::ThreadPool::submit) and by
/// [`continue_with`](Task::continue_with). Handles are cheap to clone;
/// every clone observes the same outcome.
pub struct Task<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for Task<T> {
    fn clone(&self) -> Self {
        Task {
            inner: self.inner.clone(),
        }
    }
}

impl<T> fmt::Debug for Task<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("completed", &self.is_completed())
            .finish()
    }
}

/// Waiting for a computation, or settled exactly once into an outcome.
/// Continuations registered before completion accumulate in `Pending`
/// and are drained by [`Inner::complete`].
enum State<T> {
    Pending { continuations: VecDeque<Job> },
    Done(Result<T>),
}

/// One mutex guards both the outcome and the continuation queue, so a
/// registration cannot interleave with the completion drain; the condvar
/// is the completion signal.
struct Inner<T> {
    state: Mutex<State<T>>,
    completed: Condvar,
    pool: Arc<PoolShared>,
}

impl<T> Task<T> {
    /// Blocks until the task settles, then returns its outcome.
    ///
    /// Idempotent: any number of callers, before or after completion,
    /// observe the same result; the value is cloned out of the outcome
    /// slot. A panicking computation surfaces as
    /// [`PoolError::ComputationFailed`], a task preempted by shutdown as
    /// [`PoolError::Cancelled`].
    ///
    /// Calling this from inside a pool job can starve the pool if the
    /// awaited task is queued behind the caller.
    pub fn result(&self) -> Result<T>
    where
        T: Clone,
    {
        self.inner.wait_outcome()
    }

    /// Returns `true` once the task has settled. Never blocks.
    pub fn is_completed(&self) -> bool {
        matches!(
            *self.inner.state.lock().expect("task lock poisoned"),
            State::Done(_)
        )
    }
}

impl<T: Send + 'static> Task<T> {
    /// A task with no outcome yet.
    pub(crate) fn pending(pool: Arc<PoolShared>) -> Task<T> {
        Task {
            inner: Arc::new(Inner {
                state: Mutex::new(State::Pending {
                    continuations: VecDeque::new(),
                }),
                completed: Condvar::new(),
                pool,
            }),
        }
    }

    /// Builds the job that runs `f` and settles this task.
    ///
    /// If shutdown has begun by the time the job runs, `f` is never
    /// invoked and the task settles to `Cancelled`.
    pub(crate) fn execution_job<F>(&self, f: F) -> Job
    where
        F: FnOnce() -> T + Send + 'static,
    {
        let inner = self.inner.clone();
        Box::new(move || {
            let outcome = if inner.pool.is_stopping() {
                Err(PoolError::Cancelled)
            } else {
                run_user(f)
            };
            Inner::complete(&inner, outcome);
        })
    }

    /// Registers `f` to run on this task's value once it settles,
    /// returning a handle to the new task.
    ///
    /// The continuation is scheduled through the same pool, never on a
    /// fresh thread. If this task failed or was cancelled, `f` is not
    /// invoked and the new task adopts the same error.
    ///
    /// Fails with [`PoolError::PoolStopped`] once shutdown has begun.
    pub fn continue_with<U, F>(&self, f: F) -> Result<Task<U>>
    where
        T: Clone,
        U: Send + 'static,
        F: FnOnce(T) -> U + Send + 'static,
    {
        let pool = self.inner.pool.clone();
        if pool.is_stopping() {
            return Err(PoolError::PoolStopped);
        }

        let child: Task<U> = Task::pending(pool.clone());
        let parent = self.inner.clone();
        let child_inner = child.inner.clone();
        let job: Job = Box::new(move || {
            // The parent has settled by the time this job runs.
            let outcome = match parent.wait_outcome() {
                Ok(value) => {
                    if parent.pool.is_stopping() {
                        Err(PoolError::Cancelled)
                    } else {
                        run_user(move || f(value))
                    }
                }
                // A failed or cancelled parent short-circuits the chain.
                Err(err) => Err(err),
            };
            Inner::complete(&child_inner, outcome);
        });

        {
            let mut state = self.inner.state.lock().expect("task lock poisoned");
            if let State::Pending { continuations } = &mut *state {
                continuations.push_back(job);
                return Ok(child);
            }
        }

        // Already settled: hand the job straight to the pool.
        pool.dispatch(job);
        Ok(child)
    }
}

impl<T> Inner<T> {
    fn wait_outcome(&self) -> Result<T>
    where
        T: Clone,
    {
        let mut state = self.state.lock().expect("task lock poisoned");
        loop {
            match &*state {
                State::Done(outcome) => return outcome.clone(),
                State::Pending { .. } => {
                    state = self.completed.wait(state).expect("task lock poisoned");
                }
            }
        }
    }

    /// Settles the task and dispatches its continuations.
    fn complete(inner: &Arc<Inner<T>>, outcome: Result<T>) {
        let pending = {
            let mut state = inner.state.lock().expect("task lock poisoned");
            let previous = std::mem::replace(&mut *state, State::Done(outcome));
            inner.completed.notify_all();
            match previous {
                State::Pending { continuations } => continuations,
                State::Done(_) => unreachable!("task settled twice"),
            }
        };

        // Dispatch outside the lock: continuations run user code and
        // must never execute under a task's mutex.
        for job in pending {
            inner.pool.dispatch(job);
        }
    }
}

/// Runs a user computation, converting a panic into a failed outcome.
fn run_user<T>(f: impl FnOnce() -> T) -> Result<T> {
    panic::catch_unwind(AssertUnwindSafe(f))
        .map_err(|payload| PoolError::ComputationFailed(panic_message(payload)))
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "opaque panic payload".to_owned()
    }
}
