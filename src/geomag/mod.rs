//! Geomagnetic declination.
//!
//! The declination (angle from true north to magnetic north, positive east)
//! converts a magnetometer heading into a true heading. It changes slowly
//! with position, so a `DeclinationModel` is built from one fix and reused
//! until the device has moved far enough from that fix.

mod dipole;

pub use dipole::DipoleModel;

use chrono::{DateTime, Utc};

use crate::location::LocationFix;

/// Source of magnetic declination values
pub trait GeomagneticModel: Send {
    /// Declination in degrees (positive east) at a point and time
    fn declination_degrees(
        &self,
        latitude: f64,
        longitude: f64,
        altitude_m: f64,
        at: DateTime<Utc>,
    ) -> f64;
}

/// Declination computed for one anchor fix
#[derive(Debug, Clone, PartialEq)]
pub struct DeclinationModel {
    anchor: LocationFix,
    declination: f64,
}

impl DeclinationModel {
    /// Evaluate `model` at the fix's position, altitude and time
    pub fn build(fix: &LocationFix, model: &dyn GeomagneticModel) -> Self {
        let degrees = model.declination_degrees(fix.latitude, fix.longitude, fix.altitude, fix.time);
        Self {
            anchor: fix.clone(),
            declination: degrees.to_radians(),
        }
    }

    /// Declination in radians
    pub fn declination(&self) -> f64 {
        self.declination
    }

    /// The fix the model was built from
    pub fn anchor(&self) -> &LocationFix {
        &self.anchor
    }

    /// A model is rebuilt when none exists or the fix is at least
    /// `rebuild_distance_m` away from the current anchor.
    pub fn needs_rebuild(
        current: Option<&DeclinationModel>,
        fix: &LocationFix,
        rebuild_distance_m: f64,
    ) -> bool {
        match current {
            None => true,
            Some(model) => model.anchor.distance_to(fix) >= rebuild_distance_m,
        }
    }
}
