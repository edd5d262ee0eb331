#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, TimeZone, Utc};
use geofuse::config::FusionConfig;
use geofuse::coordinator::{
    FixCallback, FusionCoordinator, FusionListener, LocationProvider, ManualClock, SampleCallback,
    SensorSource, StartOutcome,
};
use geofuse::error::LocationError;
use geofuse::geomag::GeomagneticModel;
use geofuse::heading::{CompassReading, IdentityFilter, SensorSample};
use geofuse::location::{LocationFix, ProviderKind};
use geofuse::output::FusionEvent;
use geofuse::simulation::{MagneticField, flat_device_samples};

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap()
}

pub fn at(secs: i64) -> DateTime<Utc> {
    t0() + chrono::Duration::seconds(secs)
}

/// Fix from `provider` at `secs` after `t0()`
pub fn fix(provider: &str, accuracy: f64, secs: i64) -> LocationFix {
    LocationFix::new(48.0, 11.0, accuracy, at(secs)).with_provider(provider)
}

/// Accelerometer then magnetometer sample for a flat device
pub fn heading_samples(magnetic_degrees: f64, timestamp_ns: i64) -> [SensorSample; 2] {
    let (accel, mag) = flat_device_samples(magnetic_degrees, &MagneticField::default(), timestamp_ns);
    [accel, mag]
}

#[derive(Default)]
pub struct RecordingListener {
    events: Mutex<Vec<FusionEvent>>,
}

impl RecordingListener {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<FusionEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }

    pub fn locations(&self) -> Vec<LocationFix> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                FusionEvent::Location(fix) => Some(fix),
                _ => None,
            })
            .collect()
    }

    pub fn readings(&self) -> Vec<CompassReading> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                FusionEvent::Compass(reading) => Some(reading),
                _ => None,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<LocationError> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                FusionEvent::Error(error) => Some(error),
                _ => None,
            })
            .collect()
    }
}

impl FusionListener for RecordingListener {
    fn on_location_updated(&self, fix: &LocationFix) {
        self.events.lock().unwrap().push(FusionEvent::Location(fix.clone()));
    }

    fn on_compass_updated(&self, reading: &CompassReading) {
        self.events.lock().unwrap().push(FusionEvent::Compass(*reading));
    }

    fn on_location_error(&self, error: LocationError) {
        self.events.lock().unwrap().push(FusionEvent::Error(error));
    }
}

/// Observes and drives a `FakeProvider` after it moved into the coordinator
#[derive(Default)]
pub struct ProviderControl {
    pub starts: AtomicUsize,
    pub stops: AtomicUsize,
    outcome: Mutex<Option<StartOutcome>>,
    callback: Mutex<Option<FixCallback>>,
}

impl ProviderControl {
    /// Outcome reported by the next start; `Started` unless set
    pub fn set_outcome(&self, outcome: StartOutcome) {
        *self.outcome.lock().unwrap() = Some(outcome);
    }

    fn outcome(&self) -> StartOutcome {
        (*self.outcome.lock().unwrap()).unwrap_or(StartOutcome::Started)
    }

    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    /// Deliver a fix through the callback handed over on start
    pub fn emit(&self, fix: LocationFix) {
        if let Some(callback) = self.callback.lock().unwrap().as_ref() {
            callback(fix);
        }
    }
}

pub struct FakeProvider {
    pub kind: ProviderKind,
    pub cached: Arc<Mutex<Option<LocationFix>>>,
    pub control: Arc<ProviderControl>,
}

impl FakeProvider {
    pub fn new(kind: ProviderKind) -> Self {
        Self {
            kind,
            cached: Arc::new(Mutex::new(None)),
            control: Arc::new(ProviderControl::default()),
        }
    }
}

impl LocationProvider for FakeProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn start_producing_fixes(&mut self, on_fix: FixCallback) -> StartOutcome {
        self.control.starts.fetch_add(1, Ordering::SeqCst);
        let outcome = self.control.outcome();
        if !matches!(outcome, StartOutcome::Failed(_)) {
            *self.control.callback.lock().unwrap() = Some(on_fix);
        }
        outcome
    }

    fn stop_producing_fixes(&mut self) {
        self.control.stops.fetch_add(1, Ordering::SeqCst);
        *self.control.callback.lock().unwrap() = None;
    }

    fn last_known_gps_fix(&self) -> Option<LocationFix> {
        self.cached.lock().unwrap().clone()
    }
}

#[derive(Default)]
pub struct SensorControl {
    pub starts: AtomicUsize,
    pub stops: AtomicUsize,
    callback: Mutex<Option<SampleCallback>>,
}

impl SensorControl {
    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    pub fn emit(&self, sample: SensorSample) {
        if let Some(callback) = self.callback.lock().unwrap().as_ref() {
            callback(sample);
        }
    }
}

pub struct FakeSensors {
    pub control: Arc<SensorControl>,
}

impl SensorSource for FakeSensors {
    fn start_producing_samples(&mut self, on_sample: SampleCallback) {
        self.control.starts.fetch_add(1, Ordering::SeqCst);
        *self.control.callback.lock().unwrap() = Some(on_sample);
    }

    fn stop_producing_samples(&mut self) {
        self.control.stops.fetch_add(1, Ordering::SeqCst);
        *self.control.callback.lock().unwrap() = None;
    }
}

/// Declination equal to the longitude, in degrees
pub struct LongitudeModel;

impl GeomagneticModel for LongitudeModel {
    fn declination_degrees(&self, _: f64, longitude: f64, _: f64, _: DateTime<Utc>) -> f64 {
        longitude
    }
}

/// Same declination everywhere
pub struct FixedModel(pub f64);

impl GeomagneticModel for FixedModel {
    fn declination_degrees(&self, _: f64, _: f64, _: f64, _: DateTime<Utc>) -> f64 {
        self.0
    }
}

pub struct Harness {
    pub coordinator: FusionCoordinator,
    pub clock: Arc<ManualClock>,
    pub provider: Arc<ProviderControl>,
    pub cached: Arc<Mutex<Option<LocationFix>>>,
    pub sensors: Arc<SensorControl>,
}

impl Harness {
    pub fn new(kind: ProviderKind) -> Self {
        Self::with(FakeProvider::new(kind), Box::new(FixedModel(0.0)))
    }

    pub fn with(provider: FakeProvider, model: Box<dyn GeomagneticModel>) -> Self {
        let clock = Arc::new(ManualClock::new(t0()));
        let provider_control = provider.control.clone();
        let cached = provider.cached.clone();
        let sensors = Arc::new(SensorControl::default());

        let coordinator = FusionCoordinator::builder(FusionConfig::default())
            .provider(Box::new(provider))
            .sensors(Box::new(FakeSensors {
                control: sensors.clone(),
            }))
            .clock(clock.clone())
            .geomagnetic_model(model)
            .filter(Box::new(IdentityFilter))
            .build();

        Self {
            coordinator,
            clock,
            provider: provider_control,
            cached,
            sensors,
        }
    }

    /// Subscribe a fresh recording listener
    pub fn subscribe(&self) -> (Arc<RecordingListener>, Arc<dyn FusionListener>) {
        let listener = RecordingListener::new();
        let handle: Arc<dyn FusionListener> = listener.clone();
        self.coordinator.start_updates(handle.clone());
        (listener, handle)
    }

    /// Set the clock to the fix's own time and submit it
    pub fn submit(&self, fix: LocationFix) -> bool {
        self.clock.set_wall(fix.time);
        self.coordinator.submit_location(fix)
    }

    pub fn feed_heading(&self, magnetic_degrees: f64, timestamp_ns: i64) -> Option<CompassReading> {
        let [accel, mag] = heading_samples(magnetic_degrees, timestamp_ns);
        self.coordinator.submit_sensor_sample(accel);
        self.coordinator.submit_sensor_sample(mag)
    }
}
