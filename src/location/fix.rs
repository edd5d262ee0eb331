use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{EARTH_MEAN_RADIUS_M, NANOS_PER_SEC};

/// A single position sample reported by a location provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationFix {
    /// Latitude in degrees
    pub latitude: f64,
    /// Longitude in degrees
    pub longitude: f64,
    /// Altitude in meters
    #[serde(default)]
    pub altitude: f64,
    /// Horizontal accuracy radius in meters (<= 0 means invalid)
    pub accuracy: f64,
    /// Ground speed in m/s
    #[serde(default)]
    pub speed: f64,
    /// Direction of travel in degrees, when the provider derived one
    #[serde(default)]
    pub bearing: Option<f64>,
    /// Provider-reported wall-clock time
    pub time: DateTime<Utc>,
    /// Boot-relative monotonic timestamp in nanoseconds
    #[serde(default)]
    pub elapsed_realtime_nanos: Option<u64>,
    /// Provider tag (e.g. "gps", "network", "fused")
    #[serde(default)]
    pub provider: Option<String>,
}

impl LocationFix {
    pub fn new(latitude: f64, longitude: f64, accuracy: f64, time: DateTime<Utc>) -> Self {
        Self {
            latitude,
            longitude,
            altitude: 0.0,
            accuracy,
            speed: 0.0,
            bearing: None,
            time,
            elapsed_realtime_nanos: None,
            provider: None,
        }
    }

    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = speed;
        self
    }

    pub fn with_bearing(mut self, bearing_degrees: f64) -> Self {
        self.bearing = Some(bearing_degrees);
        self
    }

    pub fn with_altitude(mut self, altitude: f64) -> Self {
        self.altitude = altitude;
        self
    }

    pub fn with_elapsed_realtime_nanos(mut self, nanos: u64) -> Self {
        self.elapsed_realtime_nanos = Some(nanos);
        self
    }

    /// Fixes without a positive accuracy carry no usable position
    pub fn is_valid(&self) -> bool {
        self.accuracy > 0.0
    }

    pub fn has_bearing(&self) -> bool {
        self.bearing.is_some()
    }

    /// Great-circle distance in meters (haversine)
    pub fn distance_to(&self, other: &LocationFix) -> f64 {
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let dlat = (other.latitude - self.latitude).to_radians();
        let dlon = (other.longitude - self.longitude).to_radians();

        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().min(1.0).asin();

        EARTH_MEAN_RADIUS_M * c
    }

    /// Initial great-circle bearing towards `other` in degrees [0, 360)
    pub fn initial_bearing_to(&self, other: &LocationFix) -> f64 {
        initial_bearing_degrees(self.latitude, self.longitude, other.latitude, other.longitude)
    }

    /// Whether both fixes come from the same provider tag.
    ///
    /// Tags are compared as opaque strings; a missing tag never matches.
    pub fn same_provider(&self, other: &LocationFix) -> bool {
        match (&self.provider, &other.provider) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

pub(crate) fn initial_bearing_degrees(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dlon = (lon2 - lon1).to_radians();

    let y = dlon.sin() * phi2.cos();
    let x = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * dlon.cos();
    let bearing = y.atan2(x).to_degrees();

    (bearing + 360.0) % 360.0
}

/// The fix currently accepted by the coordinator
#[derive(Debug, Clone, PartialEq)]
pub struct AcceptedLocation {
    pub fix: LocationFix,
    /// Local wall-clock time at which the fix was accepted
    pub accepted_at: DateTime<Utc>,
}

impl AcceptedLocation {
    pub fn new(fix: LocationFix, accepted_at: DateTime<Utc>) -> Self {
        Self { fix, accepted_at }
    }

    /// Time since acceptance in seconds.
    ///
    /// Uses the monotonic clock when both the fix and the caller have one,
    /// otherwise local wall-clock time since acceptance.
    pub fn age_secs(&self, wall_now: DateTime<Utc>, monotonic_now: Option<u64>) -> f64 {
        match (monotonic_now, self.fix.elapsed_realtime_nanos) {
            (Some(now), Some(then)) => (now as f64 - then as f64) / NANOS_PER_SEC,
            _ => millis_between(self.accepted_at, wall_now) * 1.0e-3,
        }
    }

    pub fn is_expired(
        &self,
        wall_now: DateTime<Utc>,
        monotonic_now: Option<u64>,
        window: Duration,
    ) -> bool {
        self.age_secs(wall_now, monotonic_now) > window.as_secs_f64()
    }
}

pub(crate) fn millis_between(earlier: DateTime<Utc>, later: DateTime<Utc>) -> f64 {
    (later - earlier).num_milliseconds() as f64
}
