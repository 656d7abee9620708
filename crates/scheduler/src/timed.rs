//! Time-windowed scheduling: visit known points when they are active rather
//! than sweeping the whole area.
//!
//! Every point of interest with a known appearance second produces one item
//! whose window is `[appear, appear + 15 min]` (mod one hour). Items are
//! queued in the order their windows next open, relative to the clock. On
//! the first scan after start, relocation or resume, windows that are
//! already open go first so points that appeared before the process started
//! are still picked up.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use hexsweep_core::geo::hex_bounds;
use hexsweep_core::item::{seconds_into_hour, SECONDS_PER_HOUR};
use hexsweep_core::{Coordinate, Geodesic, ScanItem, SchedulerConfig, SharedWorkerStatus};
use hexsweep_queue::QueueSet;

use crate::base::{Phase, Scheduler, SchedulerCore};
use crate::error::SchedulerError;
use crate::plan::PlanCache;
use crate::store::PoiStore;

/// How long a point stays worth scanning after it appears.
pub const WINDOW_SECONDS: u32 = 15 * 60;

/// Source of wall-clock time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// End of the window opened at `appear`. Never 0, since a zero
/// `disappear_seconds` marks an item as untimed.
pub fn window_end(appear: u32) -> u32 {
    match (appear + WINDOW_SECONDS) % SECONDS_PER_HOUR {
        0 => SECONDS_PER_HOUR - 1,
        end => end,
    }
}

/// Order `candidates` for a refill at `now` seconds-into-hour and number
/// the result from 1.
///
/// Outside the first scan, a window that is open at `now` sorts as next
/// hour's appearance. A refill only happens once the previous pass is used
/// up, and workers wait through that pass in appearance order, so every
/// window that opened since the last push has already been scanned.
pub fn order_for(now: u32, first_scan: bool, candidates: &[ScanItem]) -> Vec<ScanItem> {
    let mut ordered: Vec<ScanItem> = candidates.to_vec();
    ordered.sort_by_key(|item| {
        let Some(window) = item.window() else {
            return (2, 0);
        };
        match window.seconds_since_open(now) {
            // Open windows closing soonest first.
            Some(since) if first_scan => (0, WINDOW_SECONDS.saturating_sub(since)),
            _ => (
                1,
                (window.appear + SECONDS_PER_HOUR - now) % SECONDS_PER_HOUR,
            ),
        }
    });
    for (item, step) in ordered.iter_mut().zip(1..) {
        item.step = step;
    }
    ordered
}

pub struct TimeWindowed {
    core: SchedulerCore,
    geo: Arc<dyn Geodesic>,
    store: Arc<dyn PoiStore>,
    clock: Arc<dyn Clock>,
    config: SchedulerConfig,
    /// Timed items for the current area, in store order with step 0.
    candidates: PlanCache,
    first_scan: bool,
}

impl TimeWindowed {
    pub fn new(
        queues: QueueSet,
        statuses: SharedWorkerStatus,
        config: &SchedulerConfig,
        geo: Arc<dyn Geodesic>,
        store: Arc<dyn PoiStore>,
    ) -> Self {
        Self::with_clock(queues, statuses, config, geo, store, Arc::new(SystemClock))
    }

    pub fn with_clock(
        queues: QueueSet,
        statuses: SharedWorkerStatus,
        config: &SchedulerConfig,
        geo: Arc<dyn Geodesic>,
        store: Arc<dyn PoiStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            core: SchedulerCore::new(queues, statuses),
            geo,
            store,
            clock,
            config: *config,
            candidates: PlanCache::default(),
            first_scan: true,
        }
    }
}

/// Timed items for every point with a known appearance inside the scan area.
fn load_candidates(
    geo: &dyn Geodesic,
    store: &dyn PoiStore,
    config: &SchedulerConfig,
    center: &Coordinate,
) -> Result<Vec<ScanItem>, SchedulerError> {
    let bounds = hex_bounds(geo, center, config.step_limit, config.step_distance_km())?;
    let points = store.points_in(&bounds)?;

    let items: Vec<ScanItem> = points
        .iter()
        .filter_map(|p| {
            p.appear_seconds.map(|appear| ScanItem {
                step: 0,
                location: Coordinate::new(p.location.lat, p.location.lng),
                appear_seconds: appear,
                disappear_seconds: window_end(appear),
            })
        })
        .collect();

    if items.is_empty() {
        warn!(
            "No timed points of interest found around {}! (Was this area ever scanned without the filter?)",
            center
        );
    } else {
        info!(
            "Loaded {} timed points of interest ({} without a known appearance time)",
            items.len(),
            points.len() - items.len()
        );
    }
    Ok(items)
}

impl Scheduler for TimeWindowed {
    fn schedule(&mut self) -> Result<(), SchedulerError> {
        let Some(center) = self.core.ready_center() else {
            return Ok(());
        };

        let (geo, store, config) = (self.geo.as_ref(), self.store.as_ref(), &self.config);
        let candidates = self
            .candidates
            .get_or_try_insert_with(|| load_candidates(geo, store, config, &center))?;
        self.core.set_phase(Phase::Planned);

        let now = seconds_into_hour(self.clock.now());
        let plan = order_for(now, self.first_scan, &candidates);
        let outcome = self.core.push_plan(&plan);
        debug!(
            "Queued {} of {} timed items at {}s into the hour (first scan: {}, {} workers)",
            outcome.pushed,
            plan.len(),
            now,
            self.first_scan,
            self.core.worker_count()
        );

        if outcome.complete {
            self.first_scan = false;
        }
        Ok(())
    }

    fn location_changed(&mut self, location: Coordinate) {
        let candidates = &mut self.candidates;
        let first_scan = &mut self.first_scan;
        self.core.reset_location(location, || {
            candidates.invalidate();
            *first_scan = true;
        });
    }

    fn pause_notify(&mut self) {
        self.core.pause();
    }

    fn resume_notify(&mut self) {
        if self.core.resume() {
            self.first_scan = true;
        }
    }
}
