#![deny(missing_docs)]

//! A fixed-size worker-thread pool with chainable task handles.
//!
//! Submitted computations run on a fixed set of worker threads sharing
//! one FIFO queue. [`ThreadPool::submit`] returns a [`Task`] handle to
//! the eventual outcome, and [`Task::continue_with`] chains a follow-up
//! computation onto it, scheduled back through the same pool.
//!
//! # Example
//!
//! ```
//! use workpool::ThreadPool;
//!
//! let pool = ThreadPool::new(2);
//! let task = pool.submit(|| 6 * 7).unwrap();
//! assert_eq!(task.result(), Ok(42));
//! pool.shutdown();
//! ```

mod error;
mod pool;
mod queue;
mod task;

pub use error::{PoolError, Result};
pub use pool::ThreadPool;
pub use task::Task;
