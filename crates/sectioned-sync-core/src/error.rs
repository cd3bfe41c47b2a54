//! Error types for the execution-context primitives.

use thiserror::Error;

/// Errors raised when submitting work to a queue or executor.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    /// The queue has been stopped and no longer accepts tasks.
    #[error("queue '{name}' has been stopped")]
    Stopped {
        /// Name of the stopped queue.
        name: String,
    },

    /// The worker thread backing the queue could not be spawned.
    #[error("failed to spawn worker thread '{name}': {reason}")]
    SpawnFailed {
        /// Name of the thread that failed to spawn.
        name: String,
        /// The OS error message.
        reason: String,
    },

    /// The worker thread disconnected while a synchronous task was pending.
    #[error("worker thread '{name}' disconnected")]
    Disconnected {
        /// Name of the disconnected queue.
        name: String,
    },
}

/// Result type for queue operations.
pub type QueueResult<T> = std::result::Result<T, QueueError>;
