//! Scan schedulers: turn a center point into an ordered list of scan
//! locations and keep the worker queues filled with it.

pub mod base;
pub mod error;
pub mod factory;
pub mod hex;
pub mod plan;
pub mod store;
pub mod timed;

pub use base::{Phase, PushOutcome, Scheduler, SchedulerCore};
pub use error::{SchedulerError, StoreError};
pub use factory::build_scheduler;
pub use hex::{FilteredHexSearch, HexSearch};
pub use plan::{
    PlanCache, PlanSource, PoiFilter, PoiFilteredPlanner, SpiralPlanner, POI_MATCH_RADIUS_M,
};
pub use store::{InMemoryPoiStore, PoiStore, PointOfInterest};
pub use timed::{Clock, SystemClock, TimeWindowed, WINDOW_SECONDS};
