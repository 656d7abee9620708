//! Simulated scan workers: pop items from the shared queue and report what
//! they did through the worker status list.
//!
//! Timed items are checked against the clock when popped. A worker that is
//! early for an item waits for its window to open; an item whose window has
//! already closed is skipped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{debug, error, info};

use hexsweep_core::item::seconds_into_hour;
use hexsweep_core::{ScanItem, SharedWorkerStatus};
use hexsweep_queue::ScanQueue;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// What a worker should do with an item at a given second of the hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// Untimed, or inside its window.
    Due,
    /// The window opens in `wait_secs`.
    Early { wait_secs: u32 },
    /// The window closed more recently than it will next open.
    Late,
}

pub fn readiness(item: &ScanItem, now: u32) -> Readiness {
    let Some(window) = item.window() else {
        return Readiness::Due;
    };
    let Some(since_close) = window.seconds_since_close(now) else {
        return Readiness::Due;
    };
    let until_open = window.seconds_until_open(now);
    if until_open <= since_close {
        Readiness::Early {
            wait_secs: until_open,
        }
    } else {
        Readiness::Late
    }
}

pub struct WorkerPool {
    shutdown: Arc<AtomicBool>,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Start one thread per status entry, all popping from `queue`.
    pub fn spawn(queue: Arc<ScanQueue>, statuses: SharedWorkerStatus, scan_time: Duration) -> Self {
        let shutdown = Arc::new(AtomicBool::new(false));
        let count = statuses.read().unwrap_or_else(PoisonError::into_inner).len();

        let handles = (0..count)
            .map(|id| {
                let queue = Arc::clone(&queue);
                let statuses = Arc::clone(&statuses);
                let shutdown = Arc::clone(&shutdown);
                thread::spawn(move || run_worker(id, &queue, &statuses, scan_time, &shutdown))
            })
            .collect();

        info!("Started {} scan workers", count);
        Self { shutdown, handles }
    }

    /// Signal every worker to stop and wait for them.
    pub fn shutdown(self) {
        self.shutdown.store(true, Ordering::Relaxed);
        for handle in self.handles {
            if handle.join().is_err() {
                error!("scan worker panicked");
            }
        }
    }
}

fn set_message(statuses: &SharedWorkerStatus, id: usize, message: String) {
    let mut list = statuses.write().unwrap_or_else(PoisonError::into_inner);
    if let Some(status) = list.get_mut(id) {
        status.message = message;
    }
}

/// Sleep for `wait`, waking every poll interval to check `shutdown`.
/// Returns false if shutdown was requested first.
fn wait_for(wait: Duration, shutdown: &AtomicBool) -> bool {
    let deadline = Instant::now() + wait;
    loop {
        if shutdown.load(Ordering::Relaxed) {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        thread::sleep(POLL_INTERVAL.min(deadline - now));
    }
}

fn run_worker(
    id: usize,
    queue: &ScanQueue,
    statuses: &SharedWorkerStatus,
    scan_time: Duration,
    shutdown: &AtomicBool,
) {
    while !shutdown.load(Ordering::Relaxed) {
        let Some(item) = queue.pop_timeout(POLL_INTERVAL) else {
            continue;
        };

        match readiness(&item, seconds_into_hour(Utc::now())) {
            Readiness::Due => {}
            Readiness::Early { wait_secs } => {
                debug!(worker = id, step = item.step, wait_secs, "early for item, waiting");
                set_message(
                    statuses,
                    id,
                    format!("Waiting {}s for step {} to appear", wait_secs, item.step),
                );
                if !wait_for(Duration::from_secs(u64::from(wait_secs)), shutdown) {
                    break;
                }
            }
            Readiness::Late => {
                debug!(worker = id, step = item.step, "window closed, skipping item");
                set_message(
                    statuses,
                    id,
                    format!("Skipped step {}: its time window has closed", item.step),
                );
                continue;
            }
        }

        thread::sleep(scan_time);

        let mut list = statuses.write().unwrap_or_else(PoisonError::into_inner);
        let Some(status) = list.get_mut(id) else {
            return;
        };
        status.record_scan(item.location, Utc::now(), true);
        status.message = format!("Scanned step {} at {}", item.step, item.location);
    }
    debug!(worker = id, "worker stopped");
}

#[cfg(test)]
mod tests {
    use hexsweep_core::item::SECONDS_PER_HOUR;
    use hexsweep_core::status::new_shared_status;
    use hexsweep_core::Coordinate;

    use super::*;

    fn timed(appear: u32, disappear: u32) -> ScanItem {
        ScanItem {
            step: 1,
            location: Coordinate::new(0.0, 0.0),
            appear_seconds: appear,
            disappear_seconds: disappear,
        }
    }

    /// Item whose 15-minute window starts `offset` seconds from the current
    /// second of the hour (negative for the past).
    fn item_opening_in(offset: i64) -> ScanItem {
        let hour = i64::from(SECONDS_PER_HOUR);
        let now = i64::from(seconds_into_hour(Utc::now()));
        let appear = (now + offset).rem_euclid(hour) as u32;
        let disappear = match (appear + 900) % SECONDS_PER_HOUR {
            0 => SECONDS_PER_HOUR - 1,
            d => d,
        };
        timed(appear, disappear)
    }

    fn wait_until(limit: Duration, mut done: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + limit;
        while Instant::now() < deadline {
            if done() {
                return true;
            }
            thread::sleep(Duration::from_millis(20));
        }
        done()
    }

    fn successes(statuses: &SharedWorkerStatus) -> u64 {
        statuses.read().unwrap().iter().map(|s| s.success_count).sum()
    }

    #[test]
    fn untimed_items_are_always_due() {
        let item = ScanItem::untimed(1, Coordinate::new(0.0, 0.0));
        assert_eq!(readiness(&item, 0), Readiness::Due);
        assert_eq!(readiness(&item, 3599), Readiness::Due);
    }

    #[test]
    fn open_window_is_due() {
        let item = timed(3300, 600);
        assert_eq!(readiness(&item, 3400), Readiness::Due);
        assert_eq!(readiness(&item, 100), Readiness::Due);
    }

    #[test]
    fn upcoming_window_is_waited_for() {
        let item = timed(1200, 2100);
        assert_eq!(readiness(&item, 1198), Readiness::Early { wait_secs: 2 });
        // Closed 1200 s ago, opens in 1500 s: still nearer the last close.
        assert_eq!(readiness(&item, 3300), Readiness::Late);
        // Closed 1400 s ago, opens in 1300 s.
        assert_eq!(readiness(&item, 3500), Readiness::Early { wait_secs: 1300 });
    }

    #[test]
    fn just_closed_window_is_late() {
        let item = timed(1200, 2100);
        assert_eq!(readiness(&item, 2160), Readiness::Late);

        let wrapping = timed(3300, 600);
        assert_eq!(readiness(&wrapping, 660), Readiness::Late);
    }

    #[test]
    fn pool_drains_queue_and_records_scans() {
        let queue = Arc::new(ScanQueue::unbounded());
        for step in 1..=10 {
            queue.push(ScanItem::untimed(step, Coordinate::new(0.0, f64::from(step)))).unwrap();
        }
        let statuses = new_shared_status(3);
        let pool = WorkerPool::spawn(Arc::clone(&queue), Arc::clone(&statuses), Duration::ZERO);

        assert!(wait_until(Duration::from_secs(2), || successes(&statuses) == 10));
        pool.shutdown();
        assert_eq!(successes(&statuses), 10);
    }

    #[test]
    fn worker_waits_for_item_that_opens_soon() {
        let queue = Arc::new(ScanQueue::unbounded());
        queue.push(item_opening_in(2)).unwrap();
        let statuses = new_shared_status(1);
        let pool = WorkerPool::spawn(Arc::clone(&queue), Arc::clone(&statuses), Duration::ZERO);

        assert!(wait_until(Duration::from_secs(6), || successes(&statuses) == 1));
        pool.shutdown();
        assert!(statuses.read().unwrap()[0].message.starts_with("Scanned step 1"));
    }

    #[test]
    fn worker_skips_item_whose_window_closed() {
        let queue = Arc::new(ScanQueue::unbounded());
        let late = item_opening_in(-960);
        let next = Coordinate::new(1.0, 1.0);
        queue.push(late).unwrap();
        queue.push(ScanItem::untimed(2, next)).unwrap();
        let statuses = new_shared_status(1);
        let pool = WorkerPool::spawn(Arc::clone(&queue), Arc::clone(&statuses), Duration::ZERO);

        // Waiting on the late item would hold the worker for most of an hour.
        assert!(wait_until(Duration::from_secs(2), || successes(&statuses) == 1));
        pool.shutdown();
        let list = statuses.read().unwrap();
        assert_eq!(list[0].success_count, 1);
        assert_eq!(list[0].last_scan_location, Some(next));
    }

    #[test]
    fn shutdown_interrupts_a_wait() {
        let queue = Arc::new(ScanQueue::unbounded());
        queue.push(item_opening_in(1200)).unwrap();
        let statuses = new_shared_status(1);
        let pool = WorkerPool::spawn(Arc::clone(&queue), Arc::clone(&statuses), Duration::ZERO);

        assert!(wait_until(Duration::from_secs(2), || queue.is_empty()));
        let started = Instant::now();
        pool.shutdown();
        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(successes(&statuses), 0);
    }
}
