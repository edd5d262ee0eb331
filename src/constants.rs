//! Numeric constants for location arbitration and heading fusion
//!
//! Defaults for the tunable values live in `config`; the constants here are the
//! fixed physical and numerical thresholds shared across modules.

use std::f64::consts::PI;

/// Assumed relative speed in m/s when comparing two fixes.
pub const DEFAULT_SPEED_MPS: f64 = 5.0;

/// Distance in meters a fix must move before the declination model is rebuilt.
pub const DECLINATION_REBUILD_DISTANCE_M: f64 = 1000.0;

/// Minimum speed in m/s for the GPS bearing to override the compass.
pub const MIN_TRAVEL_SPEED_MPS: f64 = 1.0;

/// Heading changes smaller than this (degrees) are not re-emitted.
pub const HEADING_NOISE_THRESHOLD_DEGREES: f64 = 3.0;

/// Accepted fixes older than this are considered expired.
pub const LOCATION_EXPIRATION_SECS: u64 = 5 * 60;

/// Provider tag of the aggregated (fused) location provider.
pub const AGGREGATED_PROVIDER: &str = "fused";

/// Mean Earth radius in meters, used for great-circle distances.
pub const EARTH_MEAN_RADIUS_M: f64 = 6_371_000.0;

/// Standard gravity in m/s^2.
pub const STANDARD_GRAVITY: f32 = 9.806_65;

/// Accelerometer readings with a squared norm below this fraction of g^2 are
/// treated as free fall.
pub const FREE_FALL_GRAVITY_FRACTION: f32 = 0.01;

/// Minimum norm of the east vector (magnetic x gravity) for a usable rotation.
pub const MIN_EAST_VECTOR_NORM: f32 = 0.1;

pub const TWO_PI: f64 = 2.0 * PI;

pub const NANOS_PER_SEC: f64 = 1.0e9;
