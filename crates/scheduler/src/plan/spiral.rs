//! Center-out hexagonal spiral.
//!
//! Points are laid on a hex grid whose neighbours are `sqrt(3) * d` apart
//! (`d` is the step distance, the scan radius of one worker). The walk
//! covers the upper half of each ring on the way out, then sweeps the lower
//! half on the way back in, so consecutive points are always neighbours.

use std::sync::Arc;

use tracing::{debug, info};

use hexsweep_core::geo::{EAST, NORTH, SOUTH, WEST};
use hexsweep_core::{Coordinate, GeoError, Geodesic, ScanItem, SchedulerConfig};

use super::PlanSource;
use crate::error::SchedulerError;

/// Generates the spiral plan for a fixed step distance and ring count.
#[derive(Clone)]
pub struct SpiralPlanner {
    geo: Arc<dyn Geodesic>,
    step_distance_km: f64,
    step_limit: u32,
}

impl std::fmt::Debug for SpiralPlanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpiralPlanner")
            .field("step_distance_km", &self.step_distance_km)
            .field("step_limit", &self.step_limit)
            .finish()
    }
}

impl SpiralPlanner {
    /// `step_limit` must be at least 1; [`SchedulerConfig::new`] enforces it.
    pub fn new(geo: Arc<dyn Geodesic>, step_distance_km: f64, step_limit: u32) -> Self {
        Self {
            geo,
            step_distance_km,
            step_limit: step_limit.max(1),
        }
    }

    pub fn from_config(geo: Arc<dyn Geodesic>, config: &SchedulerConfig) -> Self {
        Self::new(geo, config.step_distance_km(), config.step_limit)
    }

    pub fn step_distance_km(&self) -> f64 {
        self.step_distance_km
    }

    pub fn step_limit(&self) -> u32 {
        self.step_limit
    }

    pub fn geo(&self) -> &Arc<dyn Geodesic> {
        &self.geo
    }

    /// Number of points in a spiral of `step_limit` rings.
    pub fn expected_len(step_limit: u32) -> usize {
        let n = step_limit.max(1) as usize;
        1 + 3 * n * (n - 1)
    }

    /// The spiral in walk order, before the center is moved to the front.
    pub fn walk(&self, center: &Coordinate) -> Result<Vec<Coordinate>, GeoError> {
        let col = 3f64.sqrt() * self.step_distance_km;
        let row = 1.5 * self.step_distance_km;
        let half_col = col / 2.0;

        let mut walker = Walker {
            geo: self.geo.as_ref(),
            at: *center,
            points: Vec::with_capacity(Self::expected_len(self.step_limit)),
        };
        walker.points.push(Coordinate::new(center.lat, center.lng));

        if self.step_limit == 1 {
            return Ok(walker.points);
        }

        // Upper half, outward. Odd rings start west and sweep east.
        for ring in 1..self.step_limit {
            let (out, back) = leg_directions(ring);
            walker.step(&[(col, out)])?;
            for _ in 0..ring {
                walker.step(&[(row, NORTH), (half_col, back)])?;
            }
            for _ in 0..ring {
                walker.step(&[(col, back)])?;
            }
            for _ in 0..ring {
                walker.step(&[(row, SOUTH), (half_col, back)])?;
            }
        }

        // Lower half, inward, starting one row below the end of the last ring.
        let mut ring = self.step_limit - 1;
        walker.step(&[(row, SOUTH), (half_col, leg_directions(ring).0)])?;

        while ring > 0 {
            if ring == 1 {
                walker.step(&[(col, WEST)])?;
            } else {
                let (out, back) = leg_directions(ring);
                for _ in 0..ring - 1 {
                    walker.step(&[(row, SOUTH), (half_col, out)])?;
                }
                for _ in 0..ring {
                    walker.step(&[(col, out)])?;
                }
                for _ in 0..ring - 1 {
                    walker.step(&[(row, NORTH), (half_col, out)])?;
                }
                walker.step(&[(col, back)])?;
            }
            ring -= 1;
        }

        debug_assert_eq!(walker.points.len(), Self::expected_len(self.step_limit));
        Ok(walker.points)
    }
}

impl PlanSource for SpiralPlanner {
    fn generate(&self, center: &Coordinate) -> Result<Vec<ScanItem>, SchedulerError> {
        let mut points = self.walk(center)?;
        rotate_center_first(&mut points, self.step_limit);

        info!(
            "Generated spiral of {} points around {} (step {} km, {} rings)",
            points.len(),
            center,
            self.step_distance_km,
            self.step_limit
        );

        Ok(points
            .into_iter()
            .zip(1..)
            .map(|(location, step)| ScanItem::untimed(step, location))
            .collect())
    }
}

/// The walk ends in the lower half just south of the center. Moving that
/// tail to the front starts every scan with a compact block around the
/// center instead of the whole northern half.
pub fn rotate_center_first<T>(points: &mut [T], step_limit: u32) {
    let tail = match step_limit {
        0..=2 => return,
        3 => 2,
        _ => 7,
    };
    points.rotate_right(tail);
}

/// (outward, return) column directions for a ring.
fn leg_directions(ring: u32) -> (f64, f64) {
    if ring % 2 == 1 {
        (WEST, EAST)
    } else {
        (EAST, WEST)
    }
}

struct Walker<'a> {
    geo: &'a dyn Geodesic,
    at: Coordinate,
    points: Vec<Coordinate>,
}

impl Walker<'_> {
    /// Apply each `(distance_km, bearing)` move in turn and record the
    /// resulting point once.
    fn step(&mut self, moves: &[(f64, f64)]) -> Result<(), GeoError> {
        for &(distance_km, bearing) in moves {
            self.at = self.geo.destination(&self.at, distance_km, bearing)?;
        }
        debug!("spiral point {}: {}", self.points.len() + 1, self.at);
        self.points.push(Coordinate::new(self.at.lat, self.at.lng));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use hexsweep_core::geo::great_circle_m;
    use hexsweep_core::SphericalEarth;

    use super::*;

    fn center() -> Coordinate {
        Coordinate::new(40.0, -75.0)
    }

    fn planner(step_limit: u32) -> SpiralPlanner {
        SpiralPlanner::new(Arc::new(SphericalEarth), 0.070, step_limit)
    }

    /// Geodesic that records every bearing it is asked for.
    struct BearingAudit {
        calls: AtomicUsize,
        bad_bearings: AtomicUsize,
    }

    impl Geodesic for BearingAudit {
        fn destination(
            &self,
            origin: &Coordinate,
            km: f64,
            bearing: f64,
        ) -> Result<Coordinate, GeoError> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            if ![NORTH, EAST, SOUTH, WEST].contains(&bearing) {
                self.bad_bearings.fetch_add(1, Ordering::Relaxed);
            }
            SphericalEarth.destination(origin, km, bearing)
        }
    }

    struct FailingGeo;

    impl Geodesic for FailingGeo {
        fn destination(&self, _: &Coordinate, _: f64, _: f64) -> Result<Coordinate, GeoError> {
            Err(GeoError::Other("geodesic backend offline".into()))
        }
    }

    #[test]
    fn single_ring_is_just_the_center() {
        let plan = planner(1).generate(&center()).unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].step, 1);
        assert_eq!(plan[0].location, center());
        assert_eq!(plan[0].appear_seconds, 0);
        assert_eq!(plan[0].disappear_seconds, 0);
    }

    #[test]
    fn point_count_matches_hex_rings() {
        for n in 1..=8 {
            let points = planner(n).walk(&center()).unwrap();
            assert_eq!(points.len(), 1 + 3 * (n as usize) * (n as usize - 1), "step_limit {}", n);
            assert_eq!(points.len(), SpiralPlanner::expected_len(n));
        }
    }

    #[test]
    fn two_rings_form_a_hexagon() {
        let points = planner(2).walk(&center()).unwrap();
        assert_eq!(points.len(), 7);
        let spacing = 3f64.sqrt() * 70.0;
        for p in &points[1..] {
            let d = great_circle_m(&center(), p);
            assert!((d - spacing).abs() < 0.05, "ring point {} m from center", d);
        }
        // Ring 1 starts due west of the center and closes on the last point.
        assert!(points[1].lng < center().lng);
        assert!((points[1].lat - center().lat).abs() < 1e-6);
    }

    #[test]
    fn consecutive_points_are_neighbours() {
        let points = planner(5).walk(&center()).unwrap();
        let spacing = 3f64.sqrt() * 70.0;
        for pair in points.windows(2) {
            let d = great_circle_m(&pair[0], &pair[1]);
            assert!((d - spacing).abs() < 0.1, "step of {} m", d);
        }
    }

    #[test]
    fn no_cell_is_visited_twice() {
        let points = planner(6).walk(&center()).unwrap();
        let spacing = 3f64.sqrt() * 70.0;
        for (i, a) in points.iter().enumerate() {
            for b in &points[i + 1..] {
                assert!(great_circle_m(a, b) > spacing * 0.99);
            }
        }
    }

    #[test]
    fn outer_ring_radius() {
        let n = 5;
        let points = planner(n).walk(&center()).unwrap();
        let max = points
            .iter()
            .map(|p| great_circle_m(&center(), p))
            .fold(0.0, f64::max);
        let expected = f64::from(n - 1) * 3f64.sqrt() * 70.0;
        assert!((max - expected).abs() < 0.5, "max radius {} m", max);
    }

    #[test]
    fn rotation_law() {
        for n in 1..=6 {
            let raw = planner(n).walk(&center()).unwrap();
            let plan = planner(n).generate(&center()).unwrap();
            let located: Vec<Coordinate> = plan.iter().map(|i| i.location).collect();

            let expected: Vec<Coordinate> = match n {
                1 | 2 => raw.clone(),
                3 => [&raw[raw.len() - 2..], &raw[..raw.len() - 2]].concat(),
                _ => [&raw[raw.len() - 7..], &raw[..raw.len() - 7]].concat(),
            };
            assert_eq!(located, expected, "step_limit {}", n);
        }
    }

    #[test]
    fn rotation_preserves_membership() {
        let raw = planner(4).walk(&center()).unwrap();
        let plan = planner(4).generate(&center()).unwrap();
        assert_eq!(plan.len(), raw.len());
        for p in &raw {
            assert_eq!(plan.iter().filter(|i| i.location == *p).count(), 1);
        }
    }

    #[test]
    fn steps_are_one_based_and_untimed() {
        let plan = planner(4).generate(&center()).unwrap();
        for (i, item) in plan.iter().enumerate() {
            assert_eq!(item.step as usize, i + 1);
            assert_eq!(item.location.alt, 0.0);
            assert_eq!((item.appear_seconds, item.disappear_seconds), (0, 0));
        }
    }

    #[test]
    fn generation_is_deterministic() {
        let a = planner(5).generate(&center()).unwrap();
        let b = planner(5).generate(&center()).unwrap();
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(&b) {
            assert_eq!(x.step, y.step);
            assert_eq!(x.location.lat.to_bits(), y.location.lat.to_bits());
            assert_eq!(x.location.lng.to_bits(), y.location.lng.to_bits());
        }
    }

    #[test]
    fn center_altitude_is_dropped() {
        let high = Coordinate::with_alt(40.0, -75.0, 300.0);
        let plan = planner(3).generate(&high).unwrap();
        assert!(plan.iter().all(|i| i.location.alt == 0.0));
    }

    #[test]
    fn only_cardinal_bearings_are_used() {
        let audit = Arc::new(BearingAudit {
            calls: AtomicUsize::new(0),
            bad_bearings: AtomicUsize::new(0),
        });
        let planner = SpiralPlanner::new(audit.clone(), 0.9, 4);
        planner.generate(&center()).unwrap();
        assert!(audit.calls.load(Ordering::Relaxed) > 0);
        assert_eq!(audit.bad_bearings.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn geodesic_failure_propagates() {
        let planner = SpiralPlanner::new(Arc::new(FailingGeo), 0.070, 3);
        let err = planner.generate(&center()).unwrap_err();
        assert!(matches!(err, SchedulerError::Geo(GeoError::Other(_))));

        // A single ring never steps, so it cannot fail.
        let planner = SpiralPlanner::new(Arc::new(FailingGeo), 0.070, 1);
        assert_eq!(planner.generate(&center()).unwrap().len(), 1);
    }

    #[test]
    fn wide_step_scales_the_spiral() {
        let wide = SpiralPlanner::new(Arc::new(SphericalEarth), 0.900, 2);
        let points = wide.walk(&center()).unwrap();
        let d = great_circle_m(&points[0], &points[1]);
        assert!((d - 3f64.sqrt() * 900.0).abs() < 0.5);
    }

    #[test]
    fn rotate_helper_on_plain_slices() {
        let mut v: Vec<u32> = (0..19).collect();
        rotate_center_first(&mut v, 3);
        assert_eq!(&v[..3], &[17, 18, 0]);

        let mut v: Vec<u32> = (0..37).collect();
        rotate_center_first(&mut v, 4);
        assert_eq!(&v[..8], &[30, 31, 32, 33, 34, 35, 36, 0]);

        let mut v: Vec<u32> = (0..7).collect();
        rotate_center_first(&mut v, 2);
        assert_eq!(v, (0..7).collect::<Vec<_>>());
    }
}
