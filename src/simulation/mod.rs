//! Synthetic sessions for exercising the coordinator without hardware.

mod drive;
mod sensors;

pub use drive::{DriveConfig, destination_point, generate_drive};
pub use sensors::{MagneticField, SensorNoise, flat_device_samples};
