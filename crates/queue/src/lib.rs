pub mod error;
pub mod queue;
pub mod set;

pub use error::QueueError;
pub use queue::{QueueStats, ScanQueue, WorkQueue};
pub use set::QueueSet;
