use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::geo::Coordinate;

/// Latest self-reported state of one worker.
///
/// Workers write their own entry; schedulers only read.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkerStatus {
    pub worker_id: usize,
    /// Free-form progress message for display.
    pub message: String,
    pub last_scan_location: Option<Coordinate>,
    pub last_scan_at: Option<DateTime<Utc>>,
    pub success_count: u64,
    pub fail_count: u64,
}

impl WorkerStatus {
    pub fn new(worker_id: usize) -> Self {
        Self {
            worker_id,
            message: "idle".to_string(),
            ..Default::default()
        }
    }

    /// Record a finished scan at `location`.
    pub fn record_scan(&mut self, location: Coordinate, at: DateTime<Utc>, ok: bool) {
        self.last_scan_location = Some(location);
        self.last_scan_at = Some(at);
        if ok {
            self.success_count += 1;
        } else {
            self.fail_count += 1;
        }
    }
}

/// Thread-safe handle to the status list of a worker pool.
pub type SharedWorkerStatus = Arc<RwLock<Vec<WorkerStatus>>>;

/// Create a status list with one idle entry per worker.
pub fn new_shared_status(workers: usize) -> SharedWorkerStatus {
    Arc::new(RwLock::new((0..workers).map(WorkerStatus::new).collect()))
}
