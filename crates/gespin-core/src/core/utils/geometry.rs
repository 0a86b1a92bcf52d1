use nalgebra::{Point3, Vector3};

/// Converts a Cartesian point into spherical coordinates `(r, theta, phi)`.
///
/// `theta` is the polar angle measured from the +z axis and `phi` the azimuth in the
/// xy-plane measured from +x. The origin maps to `(0, 0, 0)`.
pub fn to_spherical(point: &Point3<f64>) -> (f64, f64, f64) {
    let r = point.coords.norm();
    if r == 0.0 {
        return (0.0, 0.0, 0.0);
    }
    let theta = (point.z / r).clamp(-1.0, 1.0).acos();
    let phi = point.y.atan2(point.x);
    (r, theta, phi)
}

pub fn from_spherical(r: f64, theta: f64, phi: f64) -> Point3<f64> {
    let (sin_theta, cos_theta) = theta.sin_cos();
    let (sin_phi, cos_phi) = phi.sin_cos();
    Point3::new(
        r * sin_theta * cos_phi,
        r * sin_theta * sin_phi,
        r * cos_theta,
    )
}

/// Folds a displacement onto its nearest periodic image in a cubic box of side `box_length`.
pub fn minimum_image(delta: &Vector3<f64>, box_length: f64) -> Vector3<f64> {
    delta.map(|d| d - box_length * (d / box_length).round())
}

pub fn minimum_image_distance(a: &Point3<f64>, b: &Point3<f64>, box_length: f64) -> f64 {
    minimum_image(&(b - a), box_length).norm()
}

/// The whole-period offset that moves `to` onto its periodic image nearest to `from`.
///
/// Every component is an integer multiple of `box_length`, so adding it to a position
/// changes the image without changing the point it represents.
pub fn nearest_image_shift(
    from: &Point3<f64>,
    to: &Point3<f64>,
    box_length: f64,
) -> Vector3<f64> {
    (to - from).map(|d| -box_length * (d / box_length).round())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, PI};

    const TOLERANCE: f64 = 1e-12;

    #[test]
    fn origin_has_zero_spherical_coordinates() {
        assert_eq!(to_spherical(&Point3::origin()), (0.0, 0.0, 0.0));
    }

    #[test]
    fn axis_points_have_expected_angles() {
        let (r, theta, phi) = to_spherical(&Point3::new(0.0, 2.0, 0.0));
        assert!((r - 2.0).abs() < TOLERANCE);
        assert!((theta - FRAC_PI_2).abs() < TOLERANCE);
        assert!((phi - FRAC_PI_2).abs() < TOLERANCE);

        let (_, theta, _) = to_spherical(&Point3::new(0.0, 0.0, -3.0));
        assert!((theta - PI).abs() < TOLERANCE);
    }

    #[test]
    fn spherical_conversion_round_trips_a_generic_point() {
        let point = Point3::new(0.3, -1.2, 0.7);
        let (r, theta, phi) = to_spherical(&point);
        let back = from_spherical(r, theta, phi);
        assert!((back - point).norm() < TOLERANCE);
    }

    #[test]
    fn minimum_image_wraps_long_displacements() {
        let folded = minimum_image(&Vector3::new(1.8, -1.5, 0.3), 2.0);
        assert!((folded.x + 0.2).abs() < TOLERANCE);
        assert!((folded.y - 0.5).abs() < TOLERANCE);
        assert!((folded.z - 0.3).abs() < TOLERANCE);
    }

    #[test]
    fn minimum_image_distance_crosses_the_boundary() {
        let a = Point3::new(-0.9, 0.0, 0.0);
        let b = Point3::new(0.9, 0.0, 0.0);
        assert!((minimum_image_distance(&a, &b, 2.0) - 0.2).abs() < TOLERANCE);
    }

    #[test]
    fn nearest_image_shift_moves_by_whole_periods() {
        let from = Point3::new(-0.9, 0.5, 0.0);
        let to = Point3::new(0.9, 0.25, -5.5);
        let shift = nearest_image_shift(&from, &to, 2.0);
        assert_eq!(shift, Vector3::new(-2.0, 0.0, 6.0));

        let image = to + shift;
        let distance = minimum_image_distance(&from, &to, 2.0);
        assert!(((image - from).norm() - distance).abs() < TOLERANCE);
    }
}
