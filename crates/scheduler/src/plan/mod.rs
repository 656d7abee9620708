//! Plan generation: the spiral walk, the points-of-interest filter and the
//! cache schedulers keep between refills.

pub mod filter;
pub mod spiral;

use std::sync::Arc;

use hexsweep_core::{Coordinate, ScanItem};

use crate::error::SchedulerError;

pub use filter::{PoiFilter, PoiFilteredPlanner, POI_MATCH_RADIUS_M};
pub use spiral::SpiralPlanner;

/// Produces the ordered scan plan for a center point.
///
/// Implementations must be deterministic: the same center always yields the
/// same plan, which is what makes caching it valid.
pub trait PlanSource: Send + Sync {
    fn generate(&self, center: &Coordinate) -> Result<Vec<ScanItem>, SchedulerError>;
}

/// A plan that is either present or must be regenerated.
#[derive(Debug, Clone, Default)]
pub struct PlanCache {
    plan: Option<Arc<[ScanItem]>>,
}

impl PlanCache {
    pub fn is_present(&self) -> bool {
        self.plan.is_some()
    }

    pub fn get(&self) -> Option<Arc<[ScanItem]>> {
        self.plan.clone()
    }

    /// Return the cached plan, running `generate` only on a miss. A failed
    /// generation leaves the cache absent.
    pub fn get_or_try_insert_with<F>(
        &mut self,
        generate: F,
    ) -> Result<Arc<[ScanItem]>, SchedulerError>
    where
        F: FnOnce() -> Result<Vec<ScanItem>, SchedulerError>,
    {
        if let Some(plan) = &self.plan {
            return Ok(Arc::clone(plan));
        }
        let plan: Arc<[ScanItem]> = generate()?.into();
        self.plan = Some(Arc::clone(&plan));
        Ok(plan)
    }

    pub fn invalidate(&mut self) {
        self.plan = None;
    }
}

#[cfg(test)]
mod tests {
    use hexsweep_core::GeoError;

    use super::*;

    fn items(n: u32) -> Vec<ScanItem> {
        (1..=n).map(|i| ScanItem::untimed(i, Coordinate::new(0.0, 0.0))).collect()
    }

    #[test]
    fn cache_generates_once() {
        let mut cache = PlanCache::default();
        let mut calls = 0;
        for _ in 0..3 {
            let plan = cache
                .get_or_try_insert_with(|| {
                    calls += 1;
                    Ok(items(4))
                })
                .unwrap();
            assert_eq!(plan.len(), 4);
        }
        assert_eq!(calls, 1);
    }

    #[test]
    fn failed_generation_is_not_cached() {
        let mut cache = PlanCache::default();
        let err = cache
            .get_or_try_insert_with(|| Err(GeoError::Other("boom".into()).into()))
            .unwrap_err();
        assert!(matches!(err, SchedulerError::Geo(_)));
        assert!(!cache.is_present());

        cache.get_or_try_insert_with(|| Ok(items(1))).unwrap();
        assert!(cache.is_present());
    }

    #[test]
    fn invalidate_forces_regeneration() {
        let mut cache = PlanCache::default();
        cache.get_or_try_insert_with(|| Ok(items(2))).unwrap();
        cache.invalidate();
        assert!(cache.get().is_none());
        let plan = cache.get_or_try_insert_with(|| Ok(items(5))).unwrap();
        assert_eq!(plan.len(), 5);
    }
}
