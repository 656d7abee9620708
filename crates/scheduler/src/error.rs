use thiserror::Error;

use hexsweep_core::GeoError;

/// Failure of the points-of-interest datastore.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("query failed: {0}")]
    Query(String),
}

/// Hard failures surfaced by `Scheduler::schedule`.
///
/// Missing preconditions and empty store results are not errors; they are
/// logged and scheduling continues.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SchedulerError {
    #[error("geodesic step failed: {0}")]
    Geo(#[from] GeoError),

    #[error("points-of-interest store failed: {0}")]
    Store(#[from] StoreError),
}
