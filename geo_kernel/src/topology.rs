//! `TopologyCalculator`: the explicit context object that supplies distance,
//! bearing and projection semantics for a coordinate system. Geometry
//! operations take one as a parameter instead of `Point` carrying a
//! borrowed reference to one (see the "global singletons" redesign note).

use std::f64::consts::PI;

use log::warn;

use crate::errors::{GeoError, GeoResult};
use crate::point::Point;
use crate::polyline::Polyline;

/// Supplies the distance/bearing/projection semantics a coordinate system
/// needs. Implemented twice in this crate (`EuclideanTopology`,
/// `VincentyTopology`); callers hold one by reference and pass it through,
/// so the spatial index, graph and matcher are calculator-agnostic.
pub trait TopologyCalculator {
    /// Distance between two points, in meters (or plane units, for a
    /// Euclidean calculator operating on already-projected coordinates).
    fn distance(&self, a: Point, b: Point) -> f64;

    /// Initial bearing from `a` to `b`, in compass degrees `[0, 360)`.
    fn initial_bearing(&self, a: Point, b: Point) -> f64;

    /// The point reached by travelling `distance` along `bearing` (compass
    /// degrees) from `origin`.
    fn destination(&self, origin: Point, bearing_degrees: f64, distance: f64) -> Point;

    /// Cumulative distance from the polyline's start to the foot of the
    /// perpendicular from `p`. The default implementation walks segments
    /// and accumulates; override for a closed-form or cached variant.
    fn along_track_distance(&self, polyline: &Polyline, p: Point) -> f64 {
        polyline.along_track_distance_generic(self, p)
    }

    /// The foot of the perpendicular from `p` onto the polyline.
    fn on_track_closest_point(&self, polyline: &Polyline, p: Point) -> Point {
        polyline.on_track_closest_point_generic(self, p)
    }
}

/// Plane geometry: `distance` is the L2 norm, bearing is `atan2` converted
/// to compass degrees, `destination` is a direct trigonometric offset. Used
/// for already-projected coordinates and for small synthetic test grids.
#[derive(Debug, Clone, Copy, Default)]
pub struct EuclideanTopology;

impl TopologyCalculator for EuclideanTopology {
    fn distance(&self, a: Point, b: Point) -> f64 {
        a.plane_distance_squared(&b).sqrt()
    }

    fn initial_bearing(&self, a: Point, b: Point) -> f64 {
        let dx = b.x - a.x;
        let dy = b.y - a.y;
        // Compass bearing: 0 = +y (north), clockwise positive.
        let theta = dx.atan2(dy).to_degrees();
        (theta + 360.0) % 360.0
    }

    fn destination(&self, origin: Point, bearing_degrees: f64, distance: f64) -> Point {
        let theta = bearing_degrees.to_radians();
        Point::new(origin.x + distance * theta.sin(), origin.y + distance * theta.cos())
    }
}

/// WGS84 reference ellipsoid parameters used by `VincentyTopology` unless a
/// different `Ellipsoid` is supplied.
#[derive(Debug, Clone, Copy)]
pub struct Ellipsoid {
    pub semi_major_axis: f64,
    pub flattening: f64,
}

impl Ellipsoid {
    pub const WGS84: Ellipsoid = Ellipsoid {
        semi_major_axis: 6_378_137.0,
        flattening: 1.0 / 298.257_223_563,
    };
}

impl Default for Ellipsoid {
    fn default() -> Self {
        Ellipsoid::WGS84
    }
}

const DEFAULT_MAX_ITERATIONS: usize = 200;
const CONVERGENCE_EPSILON: f64 = 1e-12;

/// Ellipsoidal geodesy on a configurable `Ellipsoid` (WGS84 by default),
/// implementing Vincenty's direct and inverse formulae with an iteration
/// cap. Points are `(longitude, latitude)` in degrees.
#[derive(Debug, Clone, Copy)]
pub struct VincentyTopology {
    ellipsoid: Ellipsoid,
    max_iterations: usize,
}

impl Default for VincentyTopology {
    fn default() -> Self {
        VincentyTopology {
            ellipsoid: Ellipsoid::default(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

impl VincentyTopology {
    pub fn new(ellipsoid: Ellipsoid) -> Self {
        VincentyTopology {
            ellipsoid,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Inverse Vincenty formula: distance and forward azimuth from `a` to
    /// `b`. Raises `ConvergenceFailure` for near-antipodal points that do
    /// not converge within the iteration cap.
    pub fn inverse(&self, a: Point, b: Point) -> GeoResult<(f64, f64)> {
        let f = self.ellipsoid.flattening;
        let major = self.ellipsoid.semi_major_axis;
        let minor = major * (1.0 - f);

        let u1 = ((1.0 - f) * a.y.to_radians().tan()).atan();
        let u2 = ((1.0 - f) * b.y.to_radians().tan()).atan();
        let l = (b.x - a.x).to_radians();

        let (sin_u1, cos_u1) = u1.sin_cos();
        let (sin_u2, cos_u2) = u2.sin_cos();

        let mut lambda = l;
        let mut iteration = 0;
        let (mut sin_sigma, mut cos_sigma, mut sigma, mut cos_sq_alpha, mut cos_2sigma_m);
        loop {
            let (sin_lambda, cos_lambda) = lambda.sin_cos();
            sin_sigma = ((cos_u2 * sin_lambda).powi(2)
                + (cos_u1 * sin_u2 - sin_u1 * cos_u2 * cos_lambda).powi(2))
            .sqrt();
            if sin_sigma == 0.0 {
                // Coincident points.
                return Ok((0.0, 0.0));
            }
            cos_sigma = sin_u1 * sin_u2 + cos_u1 * cos_u2 * cos_lambda;
            sigma = sin_sigma.atan2(cos_sigma);
            let sin_alpha = cos_u1 * cos_u2 * sin_lambda / sin_sigma;
            cos_sq_alpha = 1.0 - sin_alpha * sin_alpha;
            cos_2sigma_m = if cos_sq_alpha.abs() < f64::EPSILON {
                0.0
            } else {
                cos_sigma - 2.0 * sin_u1 * sin_u2 / cos_sq_alpha
            };
            let c = f / 16.0 * cos_sq_alpha * (4.0 + f * (4.0 - 3.0 * cos_sq_alpha));
            let lambda_prev = lambda;
            lambda = l
                + (1.0 - c)
                    * f
                    * sin_alpha
                    * (sigma
                        + c * sin_sigma
                            * (cos_2sigma_m + c * cos_sigma * (-1.0 + 2.0 * cos_2sigma_m * cos_2sigma_m)));
            iteration += 1;
            if (lambda - lambda_prev).abs() < CONVERGENCE_EPSILON {
                break;
            }
            if iteration >= self.max_iterations {
                warn!(
                    "vincenty inverse did not converge after {} iterations (near-antipodal points)",
                    self.max_iterations
                );
                return Err(GeoError::ConvergenceFailure);
            }
        }

        let u_sq = cos_sq_alpha * (major * major - minor * minor) / (minor * minor);
        let cap_a = 1.0 + u_sq / 16384.0 * (4096.0 + u_sq * (-768.0 + u_sq * (320.0 - 175.0 * u_sq)));
        let cap_b = u_sq / 1024.0 * (256.0 + u_sq * (-128.0 + u_sq * (74.0 - 47.0 * u_sq)));
        let delta_sigma = cap_b
            * sin_sigma
            * (cos_2sigma_m
                + cap_b / 4.0
                    * (cos_sigma * (-1.0 + 2.0 * cos_2sigma_m * cos_2sigma_m)
                        - cap_b / 6.0
                            * cos_2sigma_m
                            * (-3.0 + 4.0 * sin_sigma * sin_sigma)
                            * (-3.0 + 4.0 * cos_2sigma_m * cos_2sigma_m)));
        let distance = minor * cap_a * (sigma - delta_sigma);

        let (sin_lambda, cos_lambda) = lambda.sin_cos();
        let alpha1 = (cos_u2 * sin_lambda).atan2(cos_u1 * sin_u2 - sin_u1 * cos_u2 * cos_lambda);
        let bearing_degrees = (alpha1.to_degrees() + 360.0) % 360.0;

        Ok((distance, bearing_degrees))
    }

    /// Direct Vincenty formula: the point reached by travelling `distance`
    /// meters along `bearing_degrees` from `origin`.
    pub fn direct(&self, origin: Point, bearing_degrees: f64, distance: f64) -> GeoResult<Point> {
        let f = self.ellipsoid.flattening;
        let major = self.ellipsoid.semi_major_axis;
        let minor = major * (1.0 - f);

        let alpha1 = bearing_degrees.to_radians();
        let u1 = ((1.0 - f) * origin.y.to_radians().tan()).atan();
        let (sin_u1, cos_u1) = u1.sin_cos();
        let (sin_alpha1, cos_alpha1) = alpha1.sin_cos();

        let sigma1 = sin_u1.atan2(cos_u1 * cos_alpha1);
        let sin_alpha = cos_u1 * sin_alpha1;
        let cos_sq_alpha = 1.0 - sin_alpha * sin_alpha;
        let u_sq = cos_sq_alpha * (major * major - minor * minor) / (minor * minor);
        let cap_a = 1.0 + u_sq / 16384.0 * (4096.0 + u_sq * (-768.0 + u_sq * (320.0 - 175.0 * u_sq)));
        let cap_b = u_sq / 1024.0 * (256.0 + u_sq * (-128.0 + u_sq * (74.0 - 47.0 * u_sq)));

        let mut sigma = distance / (minor * cap_a);
        let mut iteration = 0;
        let mut cos_2sigma_m;
        loop {
            cos_2sigma_m = (2.0 * sigma1 + sigma).cos();
            let sin_sigma = sigma.sin();
            let cos_sigma = sigma.cos();
            let delta_sigma = cap_b
                * sin_sigma
                * (cos_2sigma_m
                    + cap_b / 4.0
                        * (cos_sigma * (-1.0 + 2.0 * cos_2sigma_m * cos_2sigma_m)
                            - cap_b / 6.0
                                * cos_2sigma_m
                                * (-3.0 + 4.0 * sin_sigma * sin_sigma)
                                * (-3.0 + 4.0 * cos_2sigma_m * cos_2sigma_m)));
            let sigma_prev = sigma;
            sigma = distance / (minor * cap_a) + delta_sigma;
            iteration += 1;
            if (sigma - sigma_prev).abs() < CONVERGENCE_EPSILON {
                break;
            }
            if iteration >= self.max_iterations {
                warn!(
                    "vincenty direct did not converge after {} iterations",
                    self.max_iterations
                );
                return Err(GeoError::ConvergenceFailure);
            }
        }

        let (sin_sigma, cos_sigma) = sigma.sin_cos();
        let tmp = sin_u1 * sin_sigma - cos_u1 * cos_sigma * cos_alpha1;
        let lat2 = (sin_u1 * cos_sigma + cos_u1 * sin_sigma * cos_alpha1)
            .atan2((1.0 - f) * (sin_alpha * sin_alpha + tmp * tmp).sqrt());
        let lambda = (sin_sigma * sin_alpha1).atan2(cos_u1 * cos_sigma - sin_u1 * sin_sigma * cos_alpha1);
        let c = f / 16.0 * cos_sq_alpha * (4.0 + f * (4.0 - 3.0 * cos_sq_alpha));
        let l = lambda
            - (1.0 - c)
                * f
                * sin_alpha
                * (sigma + c * sin_sigma * (cos_2sigma_m + c * cos_sigma * (-1.0 + 2.0 * cos_2sigma_m * cos_2sigma_m)));
        let lon2 = origin.x.to_radians() + l;

        Ok(Point::new(
            normalize_longitude(lon2.to_degrees()),
            lat2.to_degrees(),
        ))
    }
}

fn normalize_longitude(mut deg: f64) -> f64 {
    while deg > 180.0 {
        deg -= 360.0;
    }
    while deg < -180.0 {
        deg += 360.0;
    }
    deg
}

impl TopologyCalculator for VincentyTopology {
    fn distance(&self, a: Point, b: Point) -> f64 {
        self.inverse(a, b)
            .map(|(distance, _)| distance)
            .unwrap_or(f64::INFINITY)
    }

    fn initial_bearing(&self, a: Point, b: Point) -> f64 {
        self.inverse(a, b).map(|(_, bearing)| bearing).unwrap_or(0.0)
    }

    fn destination(&self, origin: Point, bearing_degrees: f64, distance: f64) -> Point {
        self.direct(origin, bearing_degrees, distance).unwrap_or(origin)
    }
}

#[allow(dead_code)]
pub(crate) const TWO_PI: f64 = 2.0 * PI;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn euclidean_distance_is_pythagorean() {
        let calc = EuclideanTopology;
        let a = Point::new(0.0, 0.0);
        let b = Point::new(3.0, 4.0);
        assert_eq!(calc.distance(a, b), 5.0);
    }

    #[test]
    fn euclidean_bearing_due_north_is_zero() {
        let calc = EuclideanTopology;
        let a = Point::new(0.0, 0.0);
        let b = Point::new(0.0, 5.0);
        assert!((calc.initial_bearing(a, b) - 0.0).abs() < 1e-9);
    }

    #[test]
    fn euclidean_destination_round_trips_distance() {
        let calc = EuclideanTopology;
        let origin = Point::new(1.0, 1.0);
        let dest = calc.destination(origin, 90.0, 10.0);
        assert!((calc.distance(origin, dest) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn vincenty_coincident_points_have_zero_distance() {
        let calc = VincentyTopology::default();
        let p = Point::new(-122.4, 37.8);
        assert_eq!(calc.distance(p, p), 0.0);
    }

    #[test]
    fn vincenty_known_distance_sf_to_la_is_approximately_right() {
        let calc = VincentyTopology::default();
        let sf = Point::new(-122.4194, 37.7749);
        let la = Point::new(-118.2437, 34.0522);
        let distance = calc.distance(sf, la);
        // Straight-line distance is roughly 559 km; allow a generous band.
        assert!(distance > 550_000.0 && distance < 570_000.0);
    }

    #[test]
    fn vincenty_direct_then_inverse_recovers_distance() {
        let calc = VincentyTopology::default();
        let origin = Point::new(2.35, 48.85);
        let dest = calc.destination(origin, 45.0, 50_000.0);
        let recovered = calc.distance(origin, dest);
        assert!((recovered - 50_000.0).abs() < 1.0);
    }
}
