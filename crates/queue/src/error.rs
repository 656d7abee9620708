//! Queue error types.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueueError {
    #[error("queue full (capacity {capacity})")]
    Full { capacity: usize },

    #[error("queue index {index} out of range ({len} queues)")]
    NoSuchQueue { index: usize, len: usize },

    #[error("a queue set needs at least one queue")]
    EmptySet,

    #[error("queue capacity must be at least 1")]
    ZeroCapacity,
}
