use chrono::{DateTime, TimeZone, Utc};
use rand::RngExt;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};

use super::sensors::{MagneticField, SensorNoise, SensorNoiseSource, flat_device_samples};
use crate::constants::{EARTH_MEAN_RADIUS_M, NANOS_PER_SEC};
use crate::error::{FusionError, Result};
use crate::geomag::{DipoleModel, GeomagneticModel};
use crate::location::LocationFix;
use crate::session::SessionEvent;

/// Device uptime at the start of a generated session
const BOOT_OFFSET_NANOS: u64 = 3_600_000_000_000;

/// A stationary period followed by a steadily turning drive
#[derive(Clone, Debug, serde::Deserialize)]
#[serde(default)]
pub struct DriveConfig {
    pub seed: Option<u64>,
    pub start_latitude: f64,
    pub start_longitude: f64,
    pub start_time: Option<DateTime<Utc>>,
    pub duration_secs: f64,
    /// Time spent parked before moving off
    pub stationary_secs: f64,
    pub speed_mps: f64,
    pub initial_course_degrees: f64,
    pub turn_rate_deg_per_sec: f64,
    pub sample_rate_hz: f64,
    pub gps_interval_secs: f64,
    pub gps_accuracy_m: f64,
    /// Altitude reported by GPS fixes
    pub altitude_m: f64,
    /// Coarse provider; disabled when not positive
    pub network_interval_secs: f64,
    pub network_accuracy_m: f64,
    /// Delay between a network fix's time and its arrival
    pub network_latency_ms: i64,
    pub field: MagneticField,
    pub noise: SensorNoise,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            seed: None,
            start_latitude: 48.8566,
            start_longitude: 2.3522,
            start_time: None,
            duration_secs: 120.0,
            stationary_secs: 20.0,
            speed_mps: 12.0,
            initial_course_degrees: 45.0,
            turn_rate_deg_per_sec: 1.5,
            sample_rate_hz: 20.0,
            gps_interval_secs: 1.0,
            gps_accuracy_m: 6.0,
            altitude_m: 35.0,
            network_interval_secs: 5.0,
            network_accuracy_m: 40.0,
            network_latency_ms: 250,
            field: MagneticField::default(),
            noise: SensorNoise::default(),
        }
    }
}

impl DriveConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    fn start(&self) -> DateTime<Utc> {
        self.start_time.unwrap_or_else(|| {
            Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0)
                .single()
                .unwrap_or_default()
        })
    }

    fn validate(&self) -> Result<()> {
        if self.duration_secs <= 0.0 {
            return Err(FusionError::Config("duration_secs must be positive".into()));
        }
        if self.sample_rate_hz <= 0.0 {
            return Err(FusionError::Config("sample_rate_hz must be positive".into()));
        }
        if self.gps_interval_secs <= 0.0 {
            return Err(FusionError::Config(
                "gps_interval_secs must be positive".into(),
            ));
        }
        if self.gps_accuracy_m <= 0.0 || self.network_accuracy_m <= 0.0 {
            return Err(FusionError::Config("accuracies must be positive".into()));
        }
        Ok(())
    }
}

/// Point reached from (`latitude`, `longitude`) after `distance_m` along the
/// great circle leaving at `bearing_deg`
pub fn destination_point(latitude: f64, longitude: f64, bearing_deg: f64, distance_m: f64) -> (f64, f64) {
    let delta = distance_m / EARTH_MEAN_RADIUS_M;
    let theta = bearing_deg.to_radians();
    let phi1 = latitude.to_radians();
    let lambda1 = longitude.to_radians();

    let phi2 = (phi1.sin() * delta.cos() + phi1.cos() * delta.sin() * theta.cos()).asin();
    let lambda2 = lambda1
        + (theta.sin() * delta.sin() * phi1.cos()).atan2(delta.cos() - phi1.sin() * phi2.sin());

    (phi2.to_degrees(), (lambda2.to_degrees() + 540.0) % 360.0 - 180.0)
}

fn create_rng(seed: Option<u64>) -> ChaCha8Rng {
    match seed {
        Some(s) => ChaCha8Rng::seed_from_u64(s),
        None => rand::make_rng(),
    }
}

struct FixNoise {
    position: Normal<f64>,
    nominal_accuracy: f64,
}

impl FixNoise {
    fn new(accuracy: f64) -> Result<Self> {
        let position =
            Normal::new(0.0, accuracy / 2.0).map_err(|e| FusionError::Config(e.to_string()))?;
        Ok(Self {
            position,
            nominal_accuracy: accuracy,
        })
    }

    fn perturb(&self, latitude: f64, longitude: f64, rng: &mut ChaCha8Rng) -> (f64, f64, f64) {
        let north = self.position.sample(rng);
        let east = self.position.sample(rng);
        let latitude_out = latitude + (north / EARTH_MEAN_RADIUS_M).to_degrees();
        let longitude_out = longitude
            + (east / (EARTH_MEAN_RADIUS_M * latitude.to_radians().cos())).to_degrees();
        let accuracy = self.nominal_accuracy * (0.8 + 0.4 * rng.random::<f64>());
        (latitude_out, longitude_out, accuracy)
    }
}

/// Generate a time-ordered session: accelerometer and magnetometer samples at
/// `sample_rate_hz`, "gps" fixes every `gps_interval_secs` and "network"
/// fixes every `network_interval_secs`.
///
/// The magnetometer follows the dipole declination at the device position,
/// so a coordinator using `DipoleModel` reports a true heading close to the
/// course.
pub fn generate_drive(config: &DriveConfig) -> Result<Vec<SessionEvent>> {
    config.validate()?;

    let mut rng = create_rng(config.seed);
    let sensor_noise = SensorNoiseSource::new(&config.noise)?;
    let gps_noise = FixNoise::new(config.gps_accuracy_m)?;
    let network_noise = FixNoise::new(config.network_accuracy_m)?;
    let geomagnetic = DipoleModel::default();
    let start = config.start();

    let dt = 1.0 / config.sample_rate_hz;
    let steps = (config.duration_secs * config.sample_rate_hz).round() as u64;

    let mut latitude = config.start_latitude;
    let mut longitude = config.start_longitude;
    let mut course = config.initial_course_degrees.rem_euclid(360.0);
    let mut next_gps = 0.0;
    let mut next_network = 0.0;
    let mut events = Vec::new();

    for step in 0..=steps {
        let t = step as f64 * dt;
        let moving = t >= config.stationary_secs;
        let speed = if moving { config.speed_mps } else { 0.0 };

        if moving && step > 0 {
            course = (course + config.turn_rate_deg_per_sec * dt).rem_euclid(360.0);
            (latitude, longitude) = destination_point(latitude, longitude, course, speed * dt);
        }

        let elapsed_nanos = BOOT_OFFSET_NANOS + (t * NANOS_PER_SEC) as u64;
        let time = start + chrono::Duration::nanoseconds((t * NANOS_PER_SEC) as i64);

        if t + 1e-9 >= next_gps {
            let (lat, lon, accuracy) = gps_noise.perturb(latitude, longitude, &mut rng);
            let mut fix = LocationFix::new(lat, lon, accuracy, time)
                .with_provider("gps")
                .with_speed(speed)
                .with_altitude(config.altitude_m)
                .with_elapsed_realtime_nanos(elapsed_nanos);
            if moving {
                fix = fix.with_bearing(course);
            }
            events.push(SessionEvent::fix(fix));
            next_gps += config.gps_interval_secs;
        }

        if config.network_interval_secs > 0.0 && t + 1e-9 >= next_network {
            let (lat, lon, accuracy) = network_noise.perturb(latitude, longitude, &mut rng);
            let fix = LocationFix::new(lat, lon, accuracy, time)
                .with_provider("network")
                .with_elapsed_realtime_nanos(elapsed_nanos);
            events.push(SessionEvent::Fix {
                fix,
                received_at: Some(time + chrono::Duration::milliseconds(config.network_latency_ms)),
            });
            next_network += config.network_interval_secs;
        }

        let declination = geomagnetic.declination_degrees(latitude, longitude, 0.0, time);
        let timestamp_ns = elapsed_nanos as i64;
        let (mut accel, mut mag) =
            flat_device_samples(course - declination, &config.field, timestamp_ns);
        sensor_noise.apply(&mut accel, &mut rng);
        sensor_noise.apply(&mut mag, &mut rng);
        events.push(SessionEvent::Sample(accel));
        events.push(SessionEvent::Sample(mag));
    }

    Ok(events)
}
