use log::trace;
use nalgebra::Vector3;
use serde::Serialize;

use super::angle::{bearing_to_heading, correct_angles, normalize_angle};
use super::filter::OrientationFilter;
use super::orientation::{azimuth, rotation_matrix};
use super::{SensorChannel, SensorSample};
use crate::config::{DisplayRotation, HeadingConfig};
use crate::geomag::DeclinationModel;
use crate::location::LocationFix;

/// One emitted compass update
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CompassReading {
    /// Device timestamp of the sample that produced the reading (ns)
    pub timestamp_ns: i64,
    /// Heading relative to magnetic north, radians [0, 2π)
    pub magnetic_heading: f64,
    /// Heading relative to true north, radians [0, 2π)
    pub true_heading: f64,
    /// Declination applied, radians
    pub declination: f64,
}

/// Suppresses heading changes smaller than a fixed threshold
#[derive(Debug, Clone)]
pub struct NoiseGate {
    threshold: f64,
    last_emitted: Option<f64>,
}

impl NoiseGate {
    pub fn new(threshold_degrees: f64) -> Self {
        Self {
            threshold: threshold_degrees.to_radians(),
            last_emitted: None,
        }
    }

    /// Returns true (and records the heading) if it differs enough from the
    /// last admitted heading.
    pub fn admit(&mut self, heading: f64) -> bool {
        if let Some(last) = self.last_emitted {
            if (heading - last).abs() < self.threshold {
                return false;
            }
        }
        self.last_emitted = Some(heading);
        true
    }

    pub fn last_emitted(&self) -> Option<f64> {
        self.last_emitted
    }

    pub fn reset(&mut self) {
        self.last_emitted = None;
    }
}

/// Heading state carried between sensor updates
#[derive(Debug, Clone, Default)]
pub struct HeadingState {
    /// Last computed magnetic heading
    pub magnetic_heading: Option<f64>,
    /// Last computed true heading
    pub true_heading: Option<f64>,
    /// Direction of travel from GPS while moving fast enough
    pub travel_heading: Option<f64>,
}

/// Turns accelerometer and magnetometer samples into compass readings
pub struct HeadingFusionEngine {
    filter: Box<dyn OrientationFilter>,
    gravity: Option<Vector3<f32>>,
    geomagnetic: Option<Vector3<f32>>,
    noise_gate: NoiseGate,
    min_travel_speed: f64,
    state: HeadingState,
}

impl HeadingFusionEngine {
    /// # Arguments
    /// * `config` - Travel speed threshold and noise floor
    /// * `filter` - Smoothing applied to each raw sensor vector
    pub fn new(config: &HeadingConfig, filter: Box<dyn OrientationFilter>) -> Self {
        Self {
            filter,
            gravity: None,
            geomagnetic: None,
            noise_gate: NoiseGate::new(config.noise_threshold_degrees),
            min_travel_speed: config.min_travel_speed_mps,
            state: HeadingState::default(),
        }
    }

    /// Recompute the travel heading override from a newly accepted fix
    pub fn update_travel_heading(&mut self, fix: &LocationFix) {
        self.state.travel_heading = match fix.bearing {
            Some(bearing) if fix.speed >= self.min_travel_speed => {
                Some(bearing_to_heading(bearing))
            }
            _ => None,
        };
    }

    pub fn travel_heading(&self) -> Option<f64> {
        self.state.travel_heading
    }

    pub fn state(&self) -> &HeadingState {
        &self.state
    }

    /// Feed one raw sample; returns a reading when one should be emitted.
    ///
    /// Nothing is emitted until both channels have reported, when the
    /// orientation is degenerate, or when the heading moved less than the
    /// noise floor since the last emission.
    pub fn process_sample(
        &mut self,
        sample: &SensorSample,
        declination: Option<&DeclinationModel>,
    ) -> Option<CompassReading> {
        let filtered = self.filter.filter(sample.channel, sample.vector());
        match sample.channel {
            SensorChannel::Accelerometer => self.gravity = Some(filtered),
            SensorChannel::Magnetometer => self.geomagnetic = Some(filtered),
        }

        let (Some(gravity), Some(geomagnetic)) = (self.gravity, self.geomagnetic) else {
            return None;
        };
        let Some(rotation) = rotation_matrix(&gravity, &geomagnetic) else {
            trace!("Degenerate orientation at {} ns", sample.timestamp_ns);
            return None;
        };

        let magnetic = normalize_angle(azimuth(&rotation), 0.0);
        let offset = declination.map_or(0.0, DeclinationModel::declination);
        let true_heading = normalize_angle(magnetic, offset);

        self.state.magnetic_heading = Some(magnetic);
        self.state.true_heading = Some(true_heading);

        if let Some(travel) = self.state.travel_heading {
            return Some(CompassReading {
                timestamp_ns: sample.timestamp_ns,
                magnetic_heading: travel,
                true_heading: travel,
                declination: 0.0,
            });
        }

        if !self.noise_gate.admit(magnetic) {
            trace!("Heading {:.4} rad within noise floor", magnetic);
            return None;
        }

        Some(CompassReading {
            timestamp_ns: sample.timestamp_ns,
            magnetic_heading: magnetic,
            true_heading,
            declination: offset,
        })
    }

    /// Rotate emitted angles into the display frame.
    ///
    /// No-op while the travel heading is active: a GPS bearing does not depend
    /// on how the device is held.
    pub fn correct_for_display_orientation(&self, angles: &mut [f64], rotation: DisplayRotation) {
        if self.state.travel_heading.is_some() {
            return;
        }
        correct_angles(angles, rotation);
    }

    /// Forget sensor vectors, travel heading and emission history
    pub fn reset(&mut self) {
        self.gravity = None;
        self.geomagnetic = None;
        self.noise_gate.reset();
        self.filter.reset();
        self.state = HeadingState::default();
    }
}
