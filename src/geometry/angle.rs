//! Planar angle and polar-coordinate helpers.
//!
//! All angles are radians. Stored orientations ("twists") are kept
//! normalized to the half-open interval (−π, π].

use std::f64::consts::{PI, TAU};

use nalgebra::{Point2, Vector2};

/// Shifts `angle` into (−π, π].
///
/// Exactly −π maps to π, so the normalized form is unique.
#[inline]
pub fn normalize_angle(mut angle: f64) -> f64 {
    while angle > PI {
        angle -= TAU;
    }
    while angle <= -PI {
        angle += TAU;
    }
    angle
}

/// Polar decomposition (ρ, φ) of `point` about `center`.
///
/// ρ is the pixel distance from `center`, φ the angle of the ray from
/// `center` through `point`.
#[inline]
pub fn polar_about(center: Point2<f64>, point: Point2<f64>) -> (f64, f64) {
    let d: Vector2<f64> = point - center;
    (d.norm(), d.y.atan2(d.x))
}

/// Projects a polar pixel measurement onto the floor plane.
///
/// `distance_per_pixel` converts pixel radius to floor distance for a
/// marker at a known ceiling height; the camera is treated as sitting at
/// the floor origin.
#[inline]
pub fn floor_projection(distance_per_pixel: f64, rho: f64, phi: f64) -> Point2<f64> {
    Point2::new(
        distance_per_pixel * rho * phi.cos(),
        distance_per_pixel * rho * phi.sin(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-12;

    #[test]
    fn test_normalize_angle_identity_range() {
        assert_eq!(normalize_angle(0.0), 0.0);
        assert!((normalize_angle(1.0) - 1.0).abs() < EPS);
        assert!((normalize_angle(-3.0) - (-3.0)).abs() < EPS);
    }

    #[test]
    fn test_normalize_angle_wraps() {
        assert!((normalize_angle(TAU) - 0.0).abs() < EPS);
        assert!((normalize_angle(3.0 * PI) - PI).abs() < EPS);
        assert!((normalize_angle(-TAU - 0.5) - (-0.5)).abs() < EPS);
    }

    #[test]
    fn test_normalize_angle_boundary() {
        // π stays π; −π folds up to π.
        assert_eq!(normalize_angle(PI), PI);
        assert_eq!(normalize_angle(-PI), PI);
    }

    #[test]
    fn test_polar_about() {
        let center = Point2::new(100.0, 100.0);
        let (rho, phi) = polar_about(center, Point2::new(100.0, 150.0));
        assert!((rho - 50.0).abs() < EPS);
        assert!((phi - PI / 2.0).abs() < EPS);

        let (rho, phi) = polar_about(center, Point2::new(60.0, 100.0));
        assert!((rho - 40.0).abs() < EPS);
        assert!((phi - PI).abs() < EPS);
    }

    #[test]
    fn test_floor_projection() {
        let p = floor_projection(2.0, 50.0, PI / 2.0);
        assert!(p.x.abs() < 1e-9);
        assert!((p.y - 100.0).abs() < 1e-9);
    }
}
