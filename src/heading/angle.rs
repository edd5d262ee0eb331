use crate::config::DisplayRotation;
use crate::constants::TWO_PI;

/// Add `correction` to `angle` and wrap the result into [0, 2π)
pub fn normalize_angle(angle: f64, correction: f64) -> f64 {
    let mut angle = (angle + correction) % TWO_PI;
    if angle < 0.0 {
        angle += TWO_PI;
    }
    // -tiny + 2π rounds to 2π
    if angle >= TWO_PI {
        angle -= TWO_PI;
    }
    angle
}

/// Convert a bearing in degrees into a heading in radians [0, 2π)
pub fn bearing_to_heading(bearing_degrees: f64) -> f64 {
    normalize_angle(0.0, bearing_degrees.to_radians())
}

/// Rotate compass angles into the display's frame.
///
/// Negative values mean "no direction available" and are left untouched.
pub fn correct_angles(angles: &mut [f64], rotation: DisplayRotation) {
    let correction = rotation.correction_radians();
    for angle in angles.iter_mut().filter(|a| **a >= 0.0) {
        *angle = normalize_angle(*angle, correction);
    }
}
