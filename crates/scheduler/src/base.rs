//! The scheduler contract and the state every variant shares.
//!
//! A scheduler is driven from a single control thread: the outer loop calls
//! [`Scheduler::schedule`] whenever the queues need refilling, and forwards
//! location and pause changes from the UI. Workers never touch the
//! scheduler; they only pop from the queues it fills.

use hexsweep_core::{Coordinate, ScanItem, SharedWorkerStatus};
use hexsweep_queue::{QueueError, QueueSet};
use tracing::{debug, info, warn};

use crate::error::SchedulerError;

/// Everything the rest of the system may call on a scheduler.
pub trait Scheduler: Send {
    /// Refill the queues. Logs and does nothing until a location is set.
    fn schedule(&mut self) -> Result<(), SchedulerError>;

    /// Move the scan area. Discards the cached plan and everything queued.
    fn location_changed(&mut self, location: Coordinate);

    /// Called on every tick while scanning is paused; drains the queues.
    fn pause_notify(&mut self);

    /// Called once when scanning resumes, before the next `schedule`.
    fn resume_notify(&mut self);
}

/// Where a scheduler is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No scan location yet.
    Unset,
    /// Location known, no plan cached.
    Idle,
    /// Plan cached and pushed at least once.
    Planned,
    /// Queues are being drained every tick.
    Paused,
}

/// Result of pushing one plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PushOutcome {
    pub pushed: usize,
    /// False when a bounded queue filled up before the plan was exhausted.
    pub complete: bool,
}

/// Location, phase and queue handles shared by every scheduler variant.
#[derive(Debug)]
pub struct SchedulerCore {
    queues: QueueSet,
    statuses: SharedWorkerStatus,
    center: Option<Coordinate>,
    phase: Phase,
}

impl SchedulerCore {
    pub fn new(queues: QueueSet, statuses: SharedWorkerStatus) -> Self {
        Self {
            queues,
            statuses,
            center: None,
            phase: Phase::Unset,
        }
    }

    pub fn center(&self) -> Option<Coordinate> {
        self.center
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn set_phase(&mut self, phase: Phase) {
        self.phase = phase;
    }

    pub fn queues(&self) -> &QueueSet {
        &self.queues
    }

    pub fn statuses(&self) -> &SharedWorkerStatus {
        &self.statuses
    }

    /// Number of workers reporting status; 0 if the list is unreadable.
    pub fn worker_count(&self) -> usize {
        self.statuses.read().map(|s| s.len()).unwrap_or(0)
    }

    /// The center to plan around, or `None` after logging why scheduling
    /// should be skipped this tick.
    pub fn ready_center(&self) -> Option<Coordinate> {
        if self.phase == Phase::Paused {
            debug!("Scanning paused, skipping refill");
            return None;
        }
        if self.center.is_none() {
            warn!("Cannot schedule work until scan location has been set");
        }
        self.center
    }

    /// Store a new center and drain the queues. Every variant routes its
    /// cache invalidation through here via `on_reset`.
    pub fn reset_location(&mut self, location: Coordinate, on_reset: impl FnOnce()) {
        info!("Scan location changed to {}", location);
        self.center = Some(location);
        on_reset();
        self.queues.drain_all();
        self.phase = Phase::Idle;
    }

    pub fn pause(&mut self) {
        self.queues.drain_all();
        if self.phase != Phase::Paused {
            info!("Scanning paused, draining queues");
            self.phase = Phase::Paused;
        }
    }

    /// Leave the paused phase. Returns whether the scheduler was paused.
    pub fn resume(&mut self) -> bool {
        if self.phase != Phase::Paused {
            return false;
        }
        self.phase = if self.center.is_some() {
            Phase::Idle
        } else {
            Phase::Unset
        };
        info!("Scanning resumed");
        true
    }

    /// Push `plan` in order onto the first queue. Stops at the first full
    /// queue instead of waiting for room.
    pub fn push_plan(&self, plan: &[ScanItem]) -> PushOutcome {
        // Only the first queue is filled; workers share it.
        let queue = self.queues.primary();
        let mut pushed = 0;
        for item in plan {
            match queue.push(*item) {
                Ok(()) => {
                    debug!("Added location {:?}", item);
                    pushed += 1;
                }
                Err(QueueError::Full { capacity }) => {
                    warn!(
                        "Queue full at capacity {}; {} of {} items pushed this round",
                        capacity,
                        pushed,
                        plan.len()
                    );
                    return PushOutcome { pushed, complete: false };
                }
                Err(e) => {
                    warn!("Failed to queue item: {}", e);
                    return PushOutcome { pushed, complete: false };
                }
            }
        }
        PushOutcome { pushed, complete: true }
    }
}

#[cfg(test)]
mod tests {
    use hexsweep_core::status::new_shared_status;

    use super::*;

    fn core_with(capacity: Option<usize>) -> SchedulerCore {
        SchedulerCore::new(QueueSet::new(1, capacity).unwrap(), new_shared_status(1))
    }

    fn plan(n: u32) -> Vec<ScanItem> {
        (1..=n).map(|i| ScanItem::untimed(i, Coordinate::new(0.0, f64::from(i)))).collect()
    }

    #[test]
    fn starts_unset() {
        let core = core_with(None);
        assert_eq!(core.phase(), Phase::Unset);
        assert!(core.ready_center().is_none());
        assert_eq!(core.worker_count(), 1);
    }

    #[test]
    fn reset_location_runs_hook_and_drains() {
        let mut core = core_with(None);
        core.push_plan(&plan(3));
        let mut hook_ran = false;
        core.reset_location(Coordinate::new(1.0, 2.0), || hook_ran = true);
        assert!(hook_ran);
        assert!(core.queues().is_empty());
        assert_eq!(core.phase(), Phase::Idle);
        assert_eq!(core.center(), Some(Coordinate::new(1.0, 2.0)));
    }

    #[test]
    fn push_plan_stops_when_full() {
        let core = core_with(Some(2));
        let outcome = core.push_plan(&plan(5));
        assert_eq!(outcome, PushOutcome { pushed: 2, complete: false });
        assert_eq!(core.queues().primary().len(), 2);
    }

    #[test]
    fn resume_only_from_paused() {
        let mut core = core_with(None);
        assert!(!core.resume());
        core.pause();
        assert!(core.resume());
        assert_eq!(core.phase(), Phase::Unset);

        core.reset_location(Coordinate::new(0.0, 0.0), || {});
        core.pause();
        assert!(core.ready_center().is_none());
        core.resume();
        assert!(core.ready_center().is_some());
        assert_eq!(core.phase(), Phase::Idle);
    }
}
