//! Drops spiral cells that have no known point of interest nearby.

use std::sync::Arc;

use tracing::{info, warn};

use hexsweep_core::geo::{great_circle_m, hex_bounds};
use hexsweep_core::{Coordinate, ScanItem};

use super::{PlanSource, SpiralPlanner};
use crate::error::SchedulerError;
use crate::store::{PoiStore, PointOfInterest};

/// A cell is kept if some point of interest lies within this distance.
pub const POI_MATCH_RADIUS_M: f64 = 70.0;

/// Keeps only plan items within [`POI_MATCH_RADIUS_M`] of a known point.
#[derive(Clone)]
pub struct PoiFilter {
    store: Arc<dyn PoiStore>,
    radius_m: f64,
}

impl PoiFilter {
    pub fn new(store: Arc<dyn PoiStore>) -> Self {
        Self {
            store,
            radius_m: POI_MATCH_RADIUS_M,
        }
    }

    pub fn radius_m(&self) -> f64 {
        self.radius_m
    }

    fn any_in_range(&self, location: &Coordinate, points: &[PointOfInterest]) -> bool {
        points
            .iter()
            .any(|p| great_circle_m(location, &p.location) <= self.radius_m)
    }

    /// Remove every item with no point in range. Steps keep the numbers
    /// they had in the unfiltered plan.
    pub fn apply(&self, plan: Vec<ScanItem>, points: &[PointOfInterest]) -> Vec<ScanItem> {
        plan.into_iter()
            .filter(|item| self.any_in_range(&item.location, points))
            .collect()
    }
}

/// The spiral planner followed by the points-of-interest filter.
#[derive(Clone)]
pub struct PoiFilteredPlanner {
    spiral: SpiralPlanner,
    filter: PoiFilter,
}

impl PoiFilteredPlanner {
    pub fn new(spiral: SpiralPlanner, store: Arc<dyn PoiStore>) -> Self {
        Self {
            spiral,
            filter: PoiFilter::new(store),
        }
    }
}

impl PlanSource for PoiFilteredPlanner {
    fn generate(&self, center: &Coordinate) -> Result<Vec<ScanItem>, SchedulerError> {
        let bounds = hex_bounds(
            self.spiral.geo().as_ref(),
            center,
            self.spiral.step_limit(),
            self.spiral.step_distance_km(),
        )?;
        let points = self.filter.store.points_in(&bounds)?;

        if points.is_empty() {
            warn!(
                "No points of interest found around {}! (Was this area ever scanned without the filter?)",
                center
            );
        }

        let plan = self.spiral.generate(center)?;
        let before = plan.len();
        let plan = self.filter.apply(plan, &points);
        info!(
            "Kept {} of {} spiral points near {} points of interest",
            plan.len(),
            before,
            points.len()
        );
        Ok(plan)
    }
}
