//! Thread-safe FIFO shared by one producer (a scheduler) and many
//! consuming workers.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use serde::Serialize;

use hexsweep_core::ScanItem;

use crate::error::QueueError;

/// Point-in-time counters for one queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    /// Items currently waiting.
    pub len: usize,
    /// Bound, if any.
    pub capacity: Option<usize>,
    /// Items accepted since creation.
    pub pushed: u64,
    /// Items handed to consumers since creation.
    pub popped: u64,
    /// Items discarded by drains since creation.
    pub drained: u64,
}

impl fmt::Display for QueueStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "QueueStats {{ len: {}, capacity: {:?}, pushed: {}, popped: {}, drained: {} }}",
            self.len, self.capacity, self.pushed, self.popped, self.drained
        )
    }
}

struct Inner<T> {
    items: VecDeque<T>,
    pushed: u64,
    popped: u64,
    drained: u64,
}

/// FIFO queue with non-blocking push, pop and drain.
///
/// Every operation takes the internal lock once, so an item is removed by
/// exactly one caller: either a consumer's pop or a drain, never both.
pub struct WorkQueue<T> {
    inner: Mutex<Inner<T>>,
    available: Condvar,
    capacity: Option<usize>,
}

/// The queue type workers poll.
pub type ScanQueue = WorkQueue<ScanItem>;

impl<T> WorkQueue<T> {
    pub fn unbounded() -> Self {
        Self {
            inner: Mutex::new(Inner {
                items: VecDeque::new(),
                pushed: 0,
                popped: 0,
                drained: 0,
            }),
            available: Condvar::new(),
            capacity: None,
        }
    }

    /// A queue that rejects pushes once `capacity` items are waiting.
    pub fn bounded(capacity: usize) -> Result<Self, QueueError> {
        if capacity == 0 {
            return Err(QueueError::ZeroCapacity);
        }
        let mut queue = Self::unbounded();
        queue.capacity = Some(capacity);
        Ok(queue)
    }

    /// Create a queue with an optional bound.
    pub fn with_capacity(capacity: Option<usize>) -> Result<Self, QueueError> {
        match capacity {
            Some(c) => Self::bounded(c),
            None => Ok(Self::unbounded()),
        }
    }

    // A panicking consumer cannot leave the deque half-modified, so the
    // data behind a poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, Inner<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append an item. Never blocks; a full bounded queue returns
    /// [`QueueError::Full`] and the item is dropped.
    pub fn push(&self, item: T) -> Result<(), QueueError> {
        let mut inner = self.lock();
        if let Some(capacity) = self.capacity {
            if inner.items.len() >= capacity {
                return Err(QueueError::Full { capacity });
            }
        }
        inner.items.push_back(item);
        inner.pushed += 1;
        drop(inner);
        self.available.notify_one();
        Ok(())
    }

    /// Take the oldest item, or `None` if the queue is empty.
    pub fn pop_or_empty(&self) -> Option<T> {
        let mut inner = self.lock();
        let item = inner.items.pop_front();
        if item.is_some() {
            inner.popped += 1;
        }
        item
    }

    /// Wait up to `timeout` for an item. For consumers only; the producer
    /// side never waits.
    pub fn pop_timeout(&self, timeout: Duration) -> Option<T> {
        let deadline = Instant::now() + timeout;
        let mut inner = self.lock();
        loop {
            if let Some(item) = inner.items.pop_front() {
                inner.popped += 1;
                return Some(item);
            }
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            inner = self
                .available
                .wait_timeout(inner, deadline - now)
                .map(|(guard, _)| guard)
                .unwrap_or_else(|e| e.into_inner().0);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Discard everything currently queued and return how many items were
    /// removed. Items a consumer popped first are not counted.
    pub fn drain_all(&self) -> usize {
        let mut inner = self.lock();
        let removed = inner.items.len();
        inner.items.clear();
        inner.drained += removed as u64;
        removed
    }

    pub fn stats(&self) -> QueueStats {
        let inner = self.lock();
        QueueStats {
            len: inner.items.len(),
            capacity: self.capacity,
            pushed: inner.pushed,
            popped: inner.popped,
            drained: inner.drained,
        }
    }
}

impl<T> Default for WorkQueue<T> {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl<T> fmt::Debug for WorkQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkQueue").field("stats", &self.stats()).finish()
    }
}
