pub mod config;
pub mod error;
pub mod geo;
pub mod item;
pub mod status;

pub use config::{ScanConfig, SchedulerConfig, SchedulerKind};
pub use error::*;
pub use geo::{Bounds, Coordinate, Geodesic, SphericalEarth};
pub use item::{ScanItem, TimeWindow};
pub use status::{SharedWorkerStatus, WorkerStatus};
