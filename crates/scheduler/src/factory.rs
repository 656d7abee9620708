use std::sync::Arc;

use tracing::info;

use hexsweep_core::{Geodesic, SchedulerConfig, SchedulerKind, SharedWorkerStatus};
use hexsweep_queue::QueueSet;

use crate::base::Scheduler;
use crate::hex::HexSearch;
use crate::store::PoiStore;
use crate::timed::TimeWindowed;

/// Construct the scheduler variant named by `kind`.
///
/// `store` is only consulted by the filtered and time-windowed variants.
pub fn build_scheduler(
    kind: SchedulerKind,
    queues: QueueSet,
    statuses: SharedWorkerStatus,
    config: &SchedulerConfig,
    geo: Arc<dyn Geodesic>,
    store: Arc<dyn PoiStore>,
) -> Box<dyn Scheduler + Send> {
    info!(
        "Using {} scheduler: {} rings at {} km",
        kind,
        config.step_limit,
        config.step_distance_km()
    );
    match kind {
        SchedulerKind::HexSearch => Box::new(HexSearch::new(queues, statuses, config, geo)),
        SchedulerKind::Filtered => {
            Box::new(HexSearch::filtered(queues, statuses, config, geo, store))
        }
        SchedulerKind::TimeWindowed => {
            Box::new(TimeWindowed::new(queues, statuses, config, geo, store))
        }
    }
}

#[cfg(test)]
mod tests {
    use hexsweep_core::status::new_shared_status;
    use hexsweep_core::{Coordinate, SphericalEarth};

    use super::*;
    use crate::store::{InMemoryPoiStore, PointOfInterest};

    fn run(kind: SchedulerKind, store: InMemoryPoiStore) -> usize {
        let queues = QueueSet::single();
        let config = SchedulerConfig::new(false, 2).unwrap();
        let mut scheduler = build_scheduler(
            kind,
            queues.clone(),
            new_shared_status(2),
            &config,
            Arc::new(SphericalEarth),
            Arc::new(store),
        );
        scheduler.location_changed(Coordinate::new(40.0, -75.0));
        scheduler.schedule().unwrap();
        queues.primary().len()
    }

    #[test]
    fn each_kind_builds_its_variant() {
        let center = Coordinate::new(40.0, -75.0);
        let store = || InMemoryPoiStore::from_points([PointOfInterest::timed(center, 120)]);

        assert_eq!(run(SchedulerKind::HexSearch, InMemoryPoiStore::new()), 7);
        assert_eq!(run(SchedulerKind::Filtered, store()), 1);
        assert_eq!(run(SchedulerKind::TimeWindowed, store()), 1);
    }

    #[test]
    fn hex_search_ignores_the_store() {
        let far = Coordinate::new(10.0, 10.0);
        let store = InMemoryPoiStore::from_points([PointOfInterest::at(far)]);
        assert_eq!(run(SchedulerKind::HexSearch, store), 7);
    }
}
