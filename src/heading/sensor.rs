use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// Sensor channel feeding the compass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorChannel {
    Accelerometer,
    Magnetometer,
}

impl SensorChannel {
    /// Slot index used by filters keyed by channel
    pub fn index(self) -> usize {
        match self {
            Self::Accelerometer => 0,
            Self::Magnetometer => 1,
        }
    }
}

/// One raw reading from the accelerometer or magnetometer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorSample {
    pub channel: SensorChannel,
    /// Device-frame x, y, z (m/s^2 or µT)
    pub values: [f32; 3],
    /// Device timestamp in nanoseconds
    pub timestamp_ns: i64,
}

impl SensorSample {
    pub fn new(channel: SensorChannel, values: [f32; 3], timestamp_ns: i64) -> Self {
        Self {
            channel,
            values,
            timestamp_ns,
        }
    }

    pub fn accelerometer(values: [f32; 3], timestamp_ns: i64) -> Self {
        Self::new(SensorChannel::Accelerometer, values, timestamp_ns)
    }

    pub fn magnetometer(values: [f32; 3], timestamp_ns: i64) -> Self {
        Self::new(SensorChannel::Magnetometer, values, timestamp_ns)
    }

    pub fn vector(&self) -> Vector3<f32> {
        Vector3::from(self.values)
    }
}
