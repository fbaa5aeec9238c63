//! Vector geometry on body keypoints.
//!
//! The vertex angle is computed in 3D; 2D sources simply carry `z = 0`.

use crate::landmark::Landmark;
use crate::utils::round_to_tenth;
use log::debug;
use nalgebra::{Point2, Vector3};

/// Angle at vertex `b` between the rays `b→a` and `b→c`, in degrees.
///
/// The result is rounded to one decimal and always lies in `[0, 180]`.
/// A zero-length ray (coincident keypoints, typically an occluded joint)
/// yields exactly `0.0`.
#[must_use]
pub fn vertex_angle(a: &Landmark, b: &Landmark, c: &Landmark) -> f64 {
    angle_between(a.position() - b.position(), c.position() - b.position())
}

/// Angle between two vectors in degrees, rounded to one decimal
#[must_use]
pub fn angle_between(ba: Vector3<f64>, bc: Vector3<f64>) -> f64 {
    let magnitude_ba = ba.norm();
    let magnitude_bc = bc.norm();

    if magnitude_ba == 0.0 || magnitude_bc == 0.0 {
        debug!("Degenerate geometry: zero-length segment, reporting 0°");
        return 0.0;
    }

    // Rounding can push the ratio just outside [-1, 1], where acos is NaN
    let cos_angle = (ba.dot(&bc) / (magnitude_ba * magnitude_bc)).clamp(-1.0, 1.0);
    let angle = round_to_tenth(cos_angle.acos().to_degrees());

    if angle.is_finite() {
        angle
    } else {
        debug!("Non-finite angle from non-finite keypoints, reporting 0°");
        0.0
    }
}

/// Euclidean distance between two image-plane positions
#[must_use]
pub fn planar_distance(from: &Point2<f64>, to: &Point2<f64>) -> f64 {
    nalgebra::distance(from, to)
}

/// Inclination of the line from `left` to `right` against the horizontal, in degrees
#[must_use]
pub fn line_tilt(left: &Landmark, right: &Landmark) -> f64 {
    (right.y - left.y).atan2(right.x - left.x).to_degrees()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn p(x: f64, y: f64) -> Landmark {
        Landmark::planar(x, y, 1.0)
    }

    #[test]
    fn test_right_angle() {
        assert_eq!(vertex_angle(&p(0.0, 1.0), &p(0.0, 0.0), &p(1.0, 0.0)), 90.0);
    }

    #[test]
    fn test_straight_line() {
        assert_eq!(vertex_angle(&p(1.0, 0.0), &p(0.0, 0.0), &p(-1.0, 0.0)), 180.0);
    }

    #[test]
    fn test_degenerate_segment() {
        assert_eq!(vertex_angle(&p(0.0, 0.0), &p(0.0, 0.0), &p(1.0, 0.0)), 0.0);
        assert_eq!(vertex_angle(&p(1.0, 0.0), &p(0.0, 0.0), &p(0.0, 0.0)), 0.0);
    }

    #[test]
    fn test_rounds_to_one_decimal() {
        // atan(1/3) = 18.4349...°
        let angle = vertex_angle(&p(3.0, 1.0), &p(0.0, 0.0), &p(1.0, 0.0));
        assert_eq!(angle, 18.4);
    }

    #[test]
    fn test_uses_depth() {
        let a = Landmark::new(0.0, 0.0, 1.0, 1.0);
        let b = Landmark::new(0.0, 0.0, 0.0, 1.0);
        let c = Landmark::new(1.0, 0.0, 0.0, 1.0);
        assert_eq!(vertex_angle(&a, &b, &c), 90.0);
    }

    #[test]
    fn test_nearly_collinear_does_not_produce_nan() {
        let angle = vertex_angle(&p(1e-9, 1.0), &p(0.0, 0.0), &p(-1e-9, -1.0));
        assert!(angle.is_finite());
        assert!((angle - 180.0).abs() < 0.1);
    }

    #[test]
    fn test_planar_distance() {
        let anchor = Point2::new(100.0, 100.0);
        assert!((planar_distance(&anchor, &Point2::new(249.0, 100.0)) - 149.0).abs() < 1e-9);
        assert!((planar_distance(&anchor, &Point2::new(103.0, 104.0)) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_line_tilt() {
        assert_eq!(line_tilt(&p(0.0, 0.0), &p(1.0, 0.0)), 0.0);
        assert!((line_tilt(&p(0.0, 0.0), &p(1.0, 1.0)) - 45.0).abs() < 1e-9);
        assert!((line_tilt(&p(0.0, 0.0), &p(1.0, -1.0)) + 45.0).abs() < 1e-9);
    }

    proptest! {
        #[test]
        fn prop_angle_within_bounds(
            ax in -1e3..1e3f64, ay in -1e3..1e3f64, az in -1e3..1e3f64,
            bx in -1e3..1e3f64, by in -1e3..1e3f64, bz in -1e3..1e3f64,
            cx in -1e3..1e3f64, cy in -1e3..1e3f64, cz in -1e3..1e3f64,
        ) {
            let angle = vertex_angle(
                &Landmark::new(ax, ay, az, 1.0),
                &Landmark::new(bx, by, bz, 1.0),
                &Landmark::new(cx, cy, cz, 1.0),
            );
            prop_assert!(angle.is_finite());
            prop_assert!((0.0..=180.0).contains(&angle));
        }

        #[test]
        fn prop_angle_is_symmetric(
            ax in -10.0..10.0f64, ay in -10.0..10.0f64,
            cx in -10.0..10.0f64, cy in -10.0..10.0f64,
        ) {
            let b = p(0.0, 0.0);
            prop_assert_eq!(
                vertex_angle(&p(ax, ay), &b, &p(cx, cy)),
                vertex_angle(&p(cx, cy), &b, &p(ax, ay))
            );
        }
    }
}
