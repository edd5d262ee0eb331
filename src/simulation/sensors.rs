use rand::RngExt;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};

use crate::constants::STANDARD_GRAVITY;
use crate::error::{FusionError, Result};
use crate::heading::{SensorChannel, SensorSample};

/// Local geomagnetic field, split into horizontal and downward components (µT)
#[derive(Clone, Copy, Debug, serde::Deserialize)]
#[serde(default)]
pub struct MagneticField {
    pub horizontal_ut: f32,
    pub vertical_ut: f32,
}

impl Default for MagneticField {
    /// Roughly mid-latitude northern hemisphere
    fn default() -> Self {
        Self {
            horizontal_ut: 20.0,
            vertical_ut: 43.0,
        }
    }
}

/// Gaussian noise added to every sensor axis
#[derive(Clone, Copy, Debug, serde::Deserialize)]
#[serde(default)]
pub struct SensorNoise {
    /// Standard deviation in m/s^2
    pub accelerometer_std: f32,
    /// Standard deviation in µT
    pub magnetometer_std: f32,
    /// Probability that a sample carries a large transient spike
    pub spike_probability: f32,
}

impl Default for SensorNoise {
    fn default() -> Self {
        Self {
            accelerometer_std: 0.05,
            magnetometer_std: 0.4,
            spike_probability: 0.0,
        }
    }
}

/// Accelerometer and magnetometer readings for a device lying flat, screen
/// up, with its y axis pointing `magnetic_azimuth_deg` clockwise from
/// magnetic north.
pub fn flat_device_samples(
    magnetic_azimuth_deg: f64,
    field: &MagneticField,
    timestamp_ns: i64,
) -> (SensorSample, SensorSample) {
    let psi = magnetic_azimuth_deg.to_radians() as f32;
    let accel = SensorSample::accelerometer([0.0, 0.0, STANDARD_GRAVITY], timestamp_ns);
    let mag = SensorSample::magnetometer(
        [
            -field.horizontal_ut * psi.sin(),
            field.horizontal_ut * psi.cos(),
            -field.vertical_ut,
        ],
        timestamp_ns,
    );
    (accel, mag)
}

pub(crate) struct SensorNoiseSource {
    accelerometer: Normal<f64>,
    magnetometer: Normal<f64>,
    spike_probability: f32,
}

impl SensorNoiseSource {
    pub(crate) fn new(noise: &SensorNoise) -> Result<Self> {
        let normal = |std: f32| {
            Normal::new(0.0, std.max(0.0) as f64).map_err(|e| FusionError::Config(e.to_string()))
        };
        Ok(Self {
            accelerometer: normal(noise.accelerometer_std)?,
            magnetometer: normal(noise.magnetometer_std)?,
            spike_probability: noise.spike_probability,
        })
    }

    pub(crate) fn apply(&self, sample: &mut SensorSample, rng: &mut ChaCha8Rng) {
        let distribution = match sample.channel {
            SensorChannel::Accelerometer => &self.accelerometer,
            SensorChannel::Magnetometer => &self.magnetometer,
        };
        for value in sample.values.iter_mut() {
            *value += distribution.sample(rng) as f32;
        }

        if self.spike_probability > 0.0 && rng.random::<f32>() < self.spike_probability {
            let axis = (rng.random::<f32>() * 3.0) as usize % 3;
            let sign = if rng.random::<bool>() { 1.0 } else { -1.0 };
            sample.values[axis] += sign * 5.0 * sample.values[axis].abs().max(1.0);
        }
    }
}
