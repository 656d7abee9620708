//! Points-of-interest lookup consumed by the filtered and time-windowed
//! schedulers.

use std::sync::{PoisonError, RwLock};

use serde::{Deserialize, Serialize};

use hexsweep_core::{Bounds, Coordinate};

use crate::error::StoreError;

/// A previously observed location worth scanning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointOfInterest {
    pub location: Coordinate,
    /// Second of the hour the point becomes active, when known.
    pub appear_seconds: Option<u32>,
}

impl PointOfInterest {
    pub fn at(location: Coordinate) -> Self {
        Self {
            location,
            appear_seconds: None,
        }
    }

    pub fn timed(location: Coordinate, appear_seconds: u32) -> Self {
        Self {
            location,
            appear_seconds: Some(appear_seconds % hexsweep_core::item::SECONDS_PER_HOUR),
        }
    }
}

/// Bounding-box query over known points of interest.
pub trait PoiStore: Send + Sync {
    /// Every known point inside `bounds`, edges inclusive.
    fn points_in(&self, bounds: &Bounds) -> Result<Vec<PointOfInterest>, StoreError>;
}

/// A store held entirely in memory. Used by the driver and in tests.
#[derive(Debug, Default)]
pub struct InMemoryPoiStore {
    points: RwLock<Vec<PointOfInterest>>,
}

impl InMemoryPoiStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_points(points: impl IntoIterator<Item = PointOfInterest>) -> Self {
        Self {
            points: RwLock::new(points.into_iter().collect()),
        }
    }

    pub fn insert(&self, point: PointOfInterest) {
        self.points
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(point);
    }

    pub fn len(&self) -> usize {
        self.points.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PoiStore for InMemoryPoiStore {
    fn points_in(&self, bounds: &Bounds) -> Result<Vec<PointOfInterest>, StoreError> {
        let points = self
            .points
            .read()
            .map_err(|e| StoreError::Unavailable(format!("point list lock: {}", e)))?;
        Ok(points
            .iter()
            .filter(|p| bounds.contains(&p.location))
            .copied()
            .collect())
    }
}
