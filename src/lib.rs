pub mod config;
pub mod constants;
pub mod coordinator;
pub mod error;
pub mod geomag;
pub mod heading;
pub mod location;
pub mod output;
pub mod session;

#[cfg(feature = "simulation")]
pub mod simulation;

pub use config::FusionConfig;
pub use coordinator::{FusionCoordinator, FusionListener};
pub use error::{FusionError, LocationError, Result};
pub use heading::{CompassReading, SensorChannel, SensorSample};
pub use location::{LocationFix, ProviderKind};
