//! Spiral schedulers: plain hex coverage, and the variant that only keeps
//! cells near known points of interest.


use std::sync::Arc;

use tracing::debug;

use hexsweep_core::{Coordinate, Geodesic, SchedulerConfig, SharedWorkerStatus};
use hexsweep_queue::QueueSet;

use crate::base::{Phase, Scheduler, SchedulerCore};
use crate::error::SchedulerError;
use crate::plan::{PlanCache, PlanSource, PoiFilteredPlanner, SpiralPlanner};
use crate::store::PoiStore;

/// Scans a hex grid around the center, re-pushing the same cached route on
/// every refill until the location changes.
pub struct HexSearch<P: PlanSource = SpiralPlanner> {
    core: SchedulerCore,
    planner: P,
    cache: PlanCache,
}

/// Hex search restricted to cells near known points of interest.
pub type FilteredHexSearch = HexSearch<PoiFilteredPlanner>;

impl HexSearch<SpiralPlanner> {
    pub fn new(
        queues: QueueSet,
        statuses: SharedWorkerStatus,
        config: &SchedulerConfig,
        geo: Arc<dyn Geodesic>,
    ) -> Self {
        Self::with_planner(queues, statuses, SpiralPlanner::from_config(geo, config))
    }
}

impl HexSearch<PoiFilteredPlanner> {
    pub fn filtered(
        queues: QueueSet,
        statuses: SharedWorkerStatus,
        config: &SchedulerConfig,
        geo: Arc<dyn Geodesic>,
        store: Arc<dyn PoiStore>,
    ) -> Self {
        let planner = PoiFilteredPlanner::new(SpiralPlanner::from_config(geo, config), store);
        Self::with_planner(queues, statuses, planner)
    }
}

impl<P: PlanSource> HexSearch<P> {
    pub fn with_planner(queues: QueueSet, statuses: SharedWorkerStatus, planner: P) -> Self {
        Self {
            core: SchedulerCore::new(queues, statuses),
            planner,
            cache: PlanCache::default(),
        }
    }
}

impl<P: PlanSource> Scheduler for HexSearch<P> {
    fn schedule(&mut self) -> Result<(), SchedulerError> {
        let Some(center) = self.core.ready_center() else {
            return Ok(());
        };

        let planner = &self.planner;
        let plan = self.cache.get_or_try_insert_with(|| planner.generate(&center))?;
        self.core.set_phase(Phase::Planned);

        let outcome = self.core.push_plan(&plan);
        debug!(
            "Queued {} of {} planned items for {} workers",
            outcome.pushed,
            plan.len(),
            self.core.worker_count()
        );
        Ok(())
    }

    fn location_changed(&mut self, location: Coordinate) {
        let cache = &mut self.cache;
        self.core.reset_location(location, || cache.invalidate());
    }

    fn pause_notify(&mut self) {
        self.core.pause();
    }

    fn resume_notify(&mut self) {
        self.core.resume();
    }
}
