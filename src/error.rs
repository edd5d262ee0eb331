use thiserror::Error;

#[derive(Error, Debug)]
pub enum FusionError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error on line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Session error: {0}")]
    Session(String),
}

pub type Result<T> = std::result::Result<T, FusionError>;

/// Error codes surfaced to listeners through `on_location_error`.
///
/// The numeric values are shared with hosting applications; 0 is reserved for
/// "no error" and is never produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[repr(i32)]
pub enum LocationError {
    /// Positioning is not supported on this device
    NotSupported = 1,
    /// No usable location provider exists
    Denied = 2,
    /// The primary positioning source is switched off
    GpsOff = 3,
}

impl LocationError {
    pub fn code(self) -> i32 {
        self as i32
    }
}

impl TryFrom<i32> for LocationError {
    type Error = FusionError;

    fn try_from(code: i32) -> Result<Self> {
        match code {
            1 => Ok(Self::NotSupported),
            2 => Ok(Self::Denied),
            3 => Ok(Self::GpsOff),
            other => Err(FusionError::Config(format!(
                "unknown location error code: {}",
                other
            ))),
        }
    }
}

impl std::fmt::Display for LocationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::NotSupported => "not supported",
            Self::Denied => "denied",
            Self::GpsOff => "gps off",
        };
        write!(f, "{} ({})", name, self.code())
    }
}
