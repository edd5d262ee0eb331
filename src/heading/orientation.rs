//! Device orientation from gravity and geomagnetic vectors.
//!
//! The rotation matrix maps device coordinates into a world frame whose rows
//! are east (H), magnetic north (M) and up (A):
//!
//! ```text
//!     H = E x A / |E x A|
//!     A = A / |A|
//!     M = A x H
//!
//!     R = | Hx Hy Hz |
//!         | Mx My Mz |
//!         | Ax Ay Az |
//! ```

use nalgebra::{Matrix3, Vector3};

use crate::constants::{FREE_FALL_GRAVITY_FRACTION, MIN_EAST_VECTOR_NORM, STANDARD_GRAVITY};

/// Rotation matrix for the given accelerometer and magnetometer readings.
///
/// Returns `None` in free fall (gravity too weak to define "up") or when the
/// magnetic field is close to parallel with gravity.
pub fn rotation_matrix(gravity: &Vector3<f32>, geomagnetic: &Vector3<f32>) -> Option<Matrix3<f32>> {
    let free_fall_sq = FREE_FALL_GRAVITY_FRACTION * STANDARD_GRAVITY * STANDARD_GRAVITY;
    if gravity.norm_squared() < free_fall_sq {
        return None;
    }

    let east = geomagnetic.cross(gravity);
    let east_norm = east.norm();
    if east_norm < MIN_EAST_VECTOR_NORM {
        return None;
    }

    let h = east / east_norm;
    let a = gravity.normalize();
    let m = a.cross(&h);

    Some(Matrix3::from_rows(&[
        h.transpose(),
        m.transpose(),
        a.transpose(),
    ]))
}

/// Azimuth (rotation around the up axis) in radians, in (-π, π]
pub fn azimuth(rotation: &Matrix3<f32>) -> f64 {
    (rotation[(0, 1)] as f64).atan2(rotation[(1, 1)] as f64)
}
