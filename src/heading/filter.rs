use nalgebra::Vector3;

use super::SensorChannel;

/// Smoothing applied to raw sensor vectors before orientation is derived
///
/// Implementations keep whatever per-channel state they need; the fusion
/// engine only hands in the channel and the raw vector.
pub trait OrientationFilter: Send {
    fn filter(&mut self, channel: SensorChannel, raw: Vector3<f32>) -> Vector3<f32>;

    fn reset(&mut self) {}
}

/// Pass-through filter
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityFilter;

impl OrientationFilter for IdentityFilter {
    fn filter(&mut self, _channel: SensorChannel, raw: Vector3<f32>) -> Vector3<f32> {
        raw
    }
}

/// Sliding-window average of the last N vectors
///
/// Maintains a circular buffer and averages component-wise.
pub struct VectorAverage {
    buffer: Vec<Vector3<f32>>,
    index: usize,
    filled: bool,
}

impl VectorAverage {
    /// # Arguments
    /// * `window_size` - Number of vectors to average (clamped to at least 1)
    pub fn new(window_size: usize) -> Self {
        Self {
            buffer: vec![Vector3::zeros(); window_size.max(1)],
            index: 0,
            filled: false,
        }
    }

    /// Add a vector and return the updated average
    pub fn add(&mut self, value: Vector3<f32>) -> Vector3<f32> {
        self.buffer[self.index] = value;
        self.index = (self.index + 1) % self.buffer.len();

        if self.index == 0 {
            self.filled = true;
        }

        self.average()
    }

    pub fn average(&self) -> Vector3<f32> {
        let count = if self.filled {
            self.buffer.len()
        } else {
            self.index.max(1)
        };
        let sum: Vector3<f32> = self.buffer.iter().sum();
        sum / count as f32
    }

    pub fn reset(&mut self) {
        self.buffer.fill(Vector3::zeros());
        self.index = 0;
        self.filled = false;
    }
}

/// Per-channel moving average filter
pub struct MovingAverageFilter {
    channels: [VectorAverage; 2],
}

impl MovingAverageFilter {
    pub fn new(window_size: usize) -> Self {
        Self {
            channels: [VectorAverage::new(window_size), VectorAverage::new(window_size)],
        }
    }
}

impl OrientationFilter for MovingAverageFilter {
    fn filter(&mut self, channel: SensorChannel, raw: Vector3<f32>) -> Vector3<f32> {
        self.channels[channel.index()].add(raw)
    }

    fn reset(&mut self) {
        for channel in self.channels.iter_mut() {
            channel.reset();
        }
    }
}

/// Build the filter for a smoothing window (1 means no smoothing)
pub fn create_filter(smoothing_window: usize) -> Box<dyn OrientationFilter> {
    if smoothing_window <= 1 {
        Box::new(IdentityFilter)
    } else {
        Box::new(MovingAverageFilter::new(smoothing_window))
    }
}
