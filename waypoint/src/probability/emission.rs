//! Emission probability: how well a candidate edge explains one GPS fix.

use std::f64::consts::PI;

use geo_kernel::{Point, TopologyCalculator};

/// Log-probability of observing `obs` given a snap to `edge` at
/// perpendicular distance `d`, under a zero-mean Gaussian with standard
/// deviation `sigma`. `tau` stretches the exponent to discount a
/// direction-disagreeing fit; pass `1.0` when no heading information is
/// available.
pub fn log_pr_emit(distance: f64, sigma: f64, tau: f64) -> f64 {
    let z = distance / sigma;
    -0.5 * tau * z * z - ((2.0 * PI).sqrt() * sigma).ln()
}

/// The direction-agreement weight `tau` used to stretch the emission
/// exponent: `exp(|theta_road - theta_gps| - 2/pi)`, with both bearings in
/// degrees converted to radians for the comparison. `1.0` when there is no
/// previous observation to derive a GPS heading from.
pub fn direction_weight<C: TopologyCalculator + ?Sized>(
    calc: &C,
    previous_observation: Option<Point>,
    observation: Point,
    road_bearing_degrees: f64,
) -> f64 {
    let previous = match previous_observation {
        Some(p) => p,
        None => return 1.0,
    };
    let gps_bearing_degrees = calc.initial_bearing(previous, observation);
    let theta_road = road_bearing_degrees.to_radians();
    let theta_gps = gps_bearing_degrees.to_radians();
    ((theta_road - theta_gps).abs() - 2.0 / PI).exp()
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_kernel::EuclideanTopology;

    #[test]
    fn closer_observation_has_higher_log_probability() {
        let near = log_pr_emit(5.0, 10.0, 1.0);
        let far = log_pr_emit(20.0, 10.0, 1.0);
        assert!(near > far);
    }

    #[test]
    fn zero_distance_peaks_at_the_gaussian_normalizer() {
        let p = log_pr_emit(0.0, 10.0, 1.0);
        assert!((p - (-((2.0 * PI).sqrt() * 10.0).ln())).abs() < 1e-9);
    }

    #[test]
    fn larger_tau_penalizes_nonzero_distance_more() {
        let low_tau = log_pr_emit(5.0, 10.0, 1.0);
        let high_tau = log_pr_emit(5.0, 10.0, 3.0);
        assert!(high_tau < low_tau);
    }

    #[test]
    fn direction_weight_is_one_without_a_previous_observation() {
        let calc = EuclideanTopology;
        let weight = direction_weight(&calc, None, Point::new(0.0, 0.0), 90.0);
        assert_eq!(weight, 1.0);
    }

    #[test]
    fn direction_weight_reacts_to_bearing_mismatch() {
        let calc = EuclideanTopology;
        let previous = Point::new(0.0, 0.0);
        let observation = Point::new(0.0, 10.0); // due north: bearing 0
        let aligned = direction_weight(&calc, Some(previous), observation, 0.0);
        let opposed = direction_weight(&calc, Some(previous), observation, 180.0);
        assert!(opposed > aligned);
    }
}
