use crate::error::LocationError;
use crate::heading::SensorSample;
use crate::location::{LocationFix, ProviderKind};

/// Sink handed to a location provider; call it for every raw fix
pub type FixCallback = Box<dyn Fn(LocationFix) + Send + Sync>;

/// Sink handed to a sensor source; call it for every raw sample
pub type SampleCallback = Box<dyn Fn(SensorSample) + Send + Sync>;

/// Result of asking a provider to start
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// Producing fixes
    Started,
    /// Producing fixes, but with a problem listeners should know about
    /// (e.g. GPS switched off, network positioning still available)
    Degraded(LocationError),
    /// Not producing fixes
    Failed(LocationError),
}

/// Concrete source of raw location fixes (platform providers, a fused service)
///
/// Retry and backoff are the provider's business; the coordinator only
/// signals start and stop.
pub trait LocationProvider: Send {
    /// Selects the acceptance policy applied to this provider's fixes
    fn kind(&self) -> ProviderKind;

    fn start_producing_fixes(&mut self, on_fix: FixCallback) -> StartOutcome;

    fn stop_producing_fixes(&mut self);

    /// Most recent cached fix, used to seed the coordinator on start
    fn last_known_gps_fix(&self) -> Option<LocationFix>;
}

/// Accelerometer and magnetometer hardware
pub trait SensorSource: Send {
    fn start_producing_samples(&mut self, on_sample: SampleCallback);

    fn stop_producing_samples(&mut self);
}

/// Provider for hosts that push fixes into the coordinator themselves
#[derive(Debug, Clone)]
pub struct PassiveProvider {
    kind: ProviderKind,
    cached: Option<LocationFix>,
}

impl PassiveProvider {
    pub fn new(kind: ProviderKind) -> Self {
        Self { kind, cached: None }
    }

    /// Fix reported by `last_known_gps_fix`
    pub fn with_cached_fix(mut self, fix: LocationFix) -> Self {
        self.cached = Some(fix);
        self
    }
}

impl Default for PassiveProvider {
    fn default() -> Self {
        Self::new(ProviderKind::Native)
    }
}

impl LocationProvider for PassiveProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn start_producing_fixes(&mut self, _on_fix: FixCallback) -> StartOutcome {
        StartOutcome::Started
    }

    fn stop_producing_fixes(&mut self) {}

    fn last_known_gps_fix(&self) -> Option<LocationFix> {
        self.cached.clone()
    }
}

/// Sensor source for hosts that push samples themselves
#[derive(Debug, Clone, Copy, Default)]
pub struct PassiveSensorSource;

impl SensorSource for PassiveSensorSource {
    fn start_producing_samples(&mut self, _on_sample: SampleCallback) {}

    fn stop_producing_samples(&mut self) {}
}
