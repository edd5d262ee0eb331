pub mod angle;
pub mod engine;
pub mod filter;
pub mod orientation;
mod sensor;

pub use angle::{bearing_to_heading, correct_angles, normalize_angle};
pub use engine::{CompassReading, HeadingFusionEngine, HeadingState, NoiseGate};
pub use filter::{IdentityFilter, MovingAverageFilter, OrientationFilter, create_filter};
pub use sensor::{SensorChannel, SensorSample};
