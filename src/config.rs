//! Configuration for the geofuse location and heading core.
//!
//! All values have defaults matching the behaviour hosting applications expect,
//! so a config file only needs the keys it changes:
//!
//! ```toml
//! [acceptance]
//! default_speed_mps = 5.0
//! aggregated_provider = "fused"
//!
//! [heading]
//! noise_threshold_degrees = 3.0
//! ```

use std::f64::consts::PI;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::constants::{
    AGGREGATED_PROVIDER, DECLINATION_REBUILD_DISTANCE_M, DEFAULT_SPEED_MPS,
    HEADING_NOISE_THRESHOLD_DEGREES, LOCATION_EXPIRATION_SECS, MIN_TRAVEL_SPEED_MPS,
};
use crate::error::{FusionError, Result};

/// Screen rotation relative to the device's natural orientation
///
/// # Parsing formats
/// - `90` - rotation in degrees (0, 90, 180 or 270)
/// - `90deg` or `90°` - same, with an explicit unit
///
/// # Example
/// ```
/// use geofuse::config::DisplayRotation;
///
/// let rotation: DisplayRotation = "270deg".parse().unwrap();
/// assert_eq!(rotation, DisplayRotation::Rotation270);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayRotation {
    #[default]
    Rotation0,
    Rotation90,
    Rotation180,
    Rotation270,
}

impl DisplayRotation {
    /// Correction in radians added to compass angles for this rotation
    pub fn correction_radians(&self) -> f64 {
        match self {
            Self::Rotation0 => 0.0,
            Self::Rotation90 => PI / 2.0,
            Self::Rotation180 => PI,
            Self::Rotation270 => 3.0 * PI / 2.0,
        }
    }

    pub fn degrees(&self) -> u16 {
        match self {
            Self::Rotation0 => 0,
            Self::Rotation90 => 90,
            Self::Rotation180 => 180,
            Self::Rotation270 => 270,
        }
    }
}

impl fmt::Display for DisplayRotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}deg", self.degrees())
    }
}

impl FromStr for DisplayRotation {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        let num = s
            .strip_suffix("deg")
            .or_else(|| s.strip_suffix('°'))
            .unwrap_or(s);

        let degrees: u16 = num
            .trim()
            .parse()
            .map_err(|_| format!("invalid rotation: {}", s))?;
        match degrees {
            0 => Ok(Self::Rotation0),
            90 => Ok(Self::Rotation90),
            180 => Ok(Self::Rotation180),
            270 => Ok(Self::Rotation270),
            _ => Err("rotation must be one of 0, 90, 180, 270".to_string()),
        }
    }
}

/// System-wide fusion configuration
///
/// Use `FusionConfig::default()` for the standard behaviour, or load a partial
/// TOML file with `FusionConfig::load`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    /// Location acceptance policy parameters
    pub acceptance: AcceptanceConfig,
    /// Declination model parameters
    pub declination: DeclinationConfig,
    /// Heading fusion parameters
    pub heading: HeadingConfig,
    /// Accepted fix expiry
    pub staleness: StalenessConfig,
}

/// Location acceptance policy configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AcceptanceConfig {
    /// Assumed relative speed between fixes in m/s (lower bound)
    pub default_speed_mps: f64,
    /// Provider tag trusted unconditionally by the aggregated policy
    pub aggregated_provider: String,
}

/// Declination model configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DeclinationConfig {
    /// Distance in meters from the building fix that triggers a rebuild
    pub rebuild_distance_m: f64,
}

/// Heading fusion configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HeadingConfig {
    /// Speed in m/s at or above which the GPS bearing overrides the compass
    pub min_travel_speed_mps: f64,
    /// Minimum heading change in degrees before a new reading is emitted
    pub noise_threshold_degrees: f64,
    /// Moving average window applied to raw sensor vectors (1 disables smoothing)
    pub smoothing_window: usize,
}

/// Accepted fix expiry configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StalenessConfig {
    /// Seconds after acceptance before a fix is considered expired
    pub expiration_secs: u64,
}

impl StalenessConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.expiration_secs)
    }
}

impl FusionConfig {
    /// Parse a (possibly partial) TOML document
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| FusionError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if self.acceptance.default_speed_mps <= 0.0 {
            return Err(FusionError::Config(
                "acceptance.default_speed_mps must be positive".into(),
            ));
        }
        if self.declination.rebuild_distance_m <= 0.0 {
            return Err(FusionError::Config(
                "declination.rebuild_distance_m must be positive".into(),
            ));
        }
        if self.heading.min_travel_speed_mps <= 0.0 {
            return Err(FusionError::Config(
                "heading.min_travel_speed_mps must be positive".into(),
            ));
        }
        if self.heading.noise_threshold_degrees < 0.0 {
            return Err(FusionError::Config(
                "heading.noise_threshold_degrees must not be negative".into(),
            ));
        }
        if self.heading.smoothing_window == 0 {
            return Err(FusionError::Config(
                "heading.smoothing_window must be at least 1".into(),
            ));
        }
        if self.staleness.expiration_secs == 0 {
            return Err(FusionError::Config(
                "staleness.expiration_secs must be positive".into(),
            ));
        }
        Ok(())
    }
}

impl Default for AcceptanceConfig {
    fn default() -> Self {
        Self {
            default_speed_mps: DEFAULT_SPEED_MPS,
            aggregated_provider: AGGREGATED_PROVIDER.to_string(),
        }
    }
}

impl Default for DeclinationConfig {
    fn default() -> Self {
        Self {
            rebuild_distance_m: DECLINATION_REBUILD_DISTANCE_M,
        }
    }
}

impl Default for HeadingConfig {
    fn default() -> Self {
        Self {
            min_travel_speed_mps: MIN_TRAVEL_SPEED_MPS,
            noise_threshold_degrees: HEADING_NOISE_THRESHOLD_DEGREES,
            smoothing_window: 1,
        }
    }
}

impl Default for StalenessConfig {
    fn default() -> Self {
        Self {
            expiration_secs: LOCATION_EXPIRATION_SECS,
        }
    }
}
