use thiserror::Error;

/// Error type for pool operations.
///
/// A task's outcome is shared between every [`result`](crate::Task::result)
/// caller and any continuation built on it, so the type is `Clone` and a
/// failed computation is carried as its panic message rather than the raw
/// payload.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// Submission or continuation attempted after shutdown began.
    #[error("thread pool is stopped")]
    PoolStopped,

    /// The task never ran because shutdown preempted it.
    #[error("task cancelled by pool shutdown")]
    Cancelled,

    /// The computation panicked.
    #[error("computation failed: {0}")]
    ComputationFailed(String),
}

/// Result type alias for pool operations.
pub type Result<T> = std::result::Result<T, PoolError>;
