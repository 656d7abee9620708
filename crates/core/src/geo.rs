//! Geodesic primitives: destination point, great-circle distance and the
//! bounding box that circumscribes a hex spiral.

use serde::{Deserialize, Serialize};

use crate::error::GeoError;

/// Mean Earth radius (IUGG) in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0088;

pub const NORTH: f64 = 0.0;
pub const EAST: f64 = 90.0;
pub const SOUTH: f64 = 180.0;
pub const WEST: f64 = 270.0;

/// A point on the globe: degrees latitude/longitude and altitude in meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
    /// Reserved; every scheduler currently emits 0.
    #[serde(default)]
    pub alt: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng, alt: 0.0 }
    }

    pub fn with_alt(lat: f64, lng: f64, alt: f64) -> Self {
        Self { lat, lng, alt }
    }

    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lng.is_finite()
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.6}, {:.6}, {})", self.lat, self.lng, self.alt)
    }
}

/// Rectangle in degrees, as consumed by bounding-box store queries.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl Bounds {
    /// Whether the point lies inside the rectangle (edges inclusive).
    /// Does not handle boxes that straddle the antimeridian.
    pub fn contains(&self, point: &Coordinate) -> bool {
        point.lat >= self.south
            && point.lat <= self.north
            && point.lng >= self.west
            && point.lng <= self.east
    }
}

/// The destination-point calculation every planner steps with.
pub trait Geodesic: Send + Sync {
    /// Walk `distance_km` from `origin` along the initial `bearing_deg`
    /// (clockwise from north). The altitude of `origin` is carried over.
    fn destination(
        &self,
        origin: &Coordinate,
        distance_km: f64,
        bearing_deg: f64,
    ) -> Result<Coordinate, GeoError>;
}

/// Great-circle navigation on a spherical Earth of radius [`EARTH_RADIUS_KM`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SphericalEarth;

impl Geodesic for SphericalEarth {
    fn destination(
        &self,
        origin: &Coordinate,
        distance_km: f64,
        bearing_deg: f64,
    ) -> Result<Coordinate, GeoError> {
        if !origin.is_finite() {
            return Err(GeoError::NonFiniteCoordinate {
                lat: origin.lat,
                lng: origin.lng,
            });
        }
        if !distance_km.is_finite() || distance_km < 0.0 {
            return Err(GeoError::InvalidDistance(distance_km));
        }

        let delta = distance_km / EARTH_RADIUS_KM;
        let theta = bearing_deg.to_radians();
        let phi1 = origin.lat.to_radians();
        let lambda1 = origin.lng.to_radians();

        let sin_phi2 = phi1.sin() * delta.cos() + phi1.cos() * delta.sin() * theta.cos();
        let phi2 = sin_phi2.clamp(-1.0, 1.0).asin();
        let lambda2 = lambda1
            + (theta.sin() * delta.sin() * phi1.cos()).atan2(delta.cos() - phi1.sin() * sin_phi2);

        Ok(Coordinate::with_alt(
            phi2.to_degrees(),
            normalize_lng(lambda2.to_degrees()),
            origin.alt,
        ))
    }
}

/// Wrap a longitude into [-180, 180).
fn normalize_lng(lng: f64) -> f64 {
    (lng + 540.0).rem_euclid(360.0) - 180.0
}

/// Haversine distance between two points, in meters.
pub fn great_circle_m(a: &Coordinate, b: &Coordinate) -> f64 {
    let phi1 = a.lat.to_radians();
    let phi2 = b.lat.to_radians();
    let d_phi = (b.lat - a.lat).to_radians();
    let d_lambda = (b.lng - a.lng).to_radians();

    let h = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * 1000.0 * h.sqrt().min(1.0).asin()
}

/// Box around a spiral of `steps` rings spaced `step_distance_km` apart,
/// padded by 70 m so points just outside the outer ring still match.
pub fn hex_bounds(
    geo: &dyn Geodesic,
    center: &Coordinate,
    steps: u32,
    step_distance_km: f64,
) -> Result<Bounds, GeoError> {
    let reach = 2.0 * step_distance_km * f64::from(steps) + 0.070;
    Ok(Bounds {
        north: geo.destination(center, reach, NORTH)?.lat,
        east: geo.destination(center, reach, EAST)?.lng,
        south: geo.destination(center, reach, SOUTH)?.lat,
        west: geo.destination(center, reach, WEST)?.lng,
    })
}
