//! The queues one scheduler feeds: one per worker, or a single shared one.

use std::sync::Arc;

use tracing::debug;

use crate::error::QueueError;
use crate::queue::ScanQueue;

/// Shared handles to a worker pool's queues.
///
/// Cloning the set clones the handles, not the queues. Exactly one
/// scheduler should push into a given set; any number of workers may pop.
#[derive(Debug, Clone)]
pub struct QueueSet {
    queues: Vec<Arc<ScanQueue>>,
}

impl QueueSet {
    /// Create `count` queues, each with the same optional bound.
    pub fn new(count: usize, capacity: Option<usize>) -> Result<Self, QueueError> {
        if count == 0 {
            return Err(QueueError::EmptySet);
        }
        let queues = (0..count)
            .map(|_| ScanQueue::with_capacity(capacity).map(Arc::new))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { queues })
    }

    /// A set holding one unbounded queue shared by every worker.
    pub fn single() -> Self {
        Self {
            queues: vec![Arc::new(ScanQueue::unbounded())],
        }
    }

    /// Wrap queues created elsewhere.
    pub fn from_queues(queues: Vec<Arc<ScanQueue>>) -> Result<Self, QueueError> {
        if queues.is_empty() {
            return Err(QueueError::EmptySet);
        }
        Ok(Self { queues })
    }

    pub fn len(&self) -> usize {
        self.queues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queues.iter().all(|q| q.is_empty())
    }

    /// The queue schedulers currently fill.
    pub fn primary(&self) -> &Arc<ScanQueue> {
        &self.queues[0]
    }

    pub fn get(&self, index: usize) -> Result<&Arc<ScanQueue>, QueueError> {
        self.queues.get(index).ok_or(QueueError::NoSuchQueue {
            index,
            len: self.queues.len(),
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<ScanQueue>> {
        self.queues.iter()
    }

    /// Drain every queue. Cheap when they are already empty.
    pub fn drain_all(&self) -> usize {
        let removed: usize = self
            .queues
            .iter()
            .filter(|q| !q.is_empty())
            .map(|q| q.drain_all())
            .sum();
        if removed > 0 {
            debug!("Drained {} queued items", removed);
        }
        removed
    }
}
