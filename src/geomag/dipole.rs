use chrono::{DateTime, TimeZone, Utc};

use super::GeomagneticModel;
use crate::location::fix::initial_bearing_degrees;

/// Tilted dipole approximation of the geomagnetic field
///
/// Magnetic north is taken to be the geomagnetic (dipole) north pole, so the
/// declination at a point is the initial great-circle bearing from the point
/// to the pole. The pole position drifts linearly from its epoch position.
///
/// This is accurate to a few degrees over most populated latitudes, which is
/// well inside compass noise on handheld devices. Hosts that need a full
/// spherical-harmonic model can implement `GeomagneticModel` themselves.
#[derive(Debug, Clone)]
pub struct DipoleModel {
    epoch: DateTime<Utc>,
    pole_latitude: f64,
    pole_longitude: f64,
    latitude_drift_per_year: f64,
    longitude_drift_per_year: f64,
}

impl DipoleModel {
    pub fn new(
        epoch: DateTime<Utc>,
        pole_latitude: f64,
        pole_longitude: f64,
        latitude_drift_per_year: f64,
        longitude_drift_per_year: f64,
    ) -> Self {
        Self {
            epoch,
            pole_latitude,
            pole_longitude,
            latitude_drift_per_year,
            longitude_drift_per_year,
        }
    }

    /// Geomagnetic north pole (latitude, longitude) in degrees at `at`
    pub fn pole_at(&self, at: DateTime<Utc>) -> (f64, f64) {
        let years = (at - self.epoch).num_seconds() as f64 / (365.25 * 86_400.0);
        let latitude = (self.pole_latitude + self.latitude_drift_per_year * years).min(90.0);
        let longitude = self.pole_longitude + self.longitude_drift_per_year * years;
        (latitude, longitude)
    }
}

impl Default for DipoleModel {
    /// Epoch 2020.0 dipole pole with its 2020-2025 drift rate
    fn default() -> Self {
        let epoch = Utc
            .with_ymd_and_hms(2020, 1, 1, 0, 0, 0)
            .single()
            .unwrap_or_default();
        Self::new(epoch, 80.65, -72.68, 0.03, -0.024)
    }
}

impl GeomagneticModel for DipoleModel {
    fn declination_degrees(
        &self,
        latitude: f64,
        longitude: f64,
        _altitude_m: f64,
        at: DateTime<Utc>,
    ) -> f64 {
        let (pole_lat, pole_lon) = self.pole_at(at);
        let bearing = initial_bearing_degrees(latitude, longitude, pole_lat, pole_lon);

        if bearing > 180.0 {
            bearing - 360.0
        } else {
            bearing
        }
    }
}
