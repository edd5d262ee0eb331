//! Fusion coordinator: owns the accepted location, declination model,
//! heading state and subscribers, and drives the external collaborators.
//!
//! All state sits behind one mutex. Inputs may arrive from any thread; each
//! submit call updates state under the lock, then releases it and notifies
//! listeners synchronously on the calling thread.
//!
//! Collaborator start/stop is serialised by a second mutex, always taken
//! before the state mutex, so that subscription transitions and the start or
//! stop signal they cause happen atomically. Listeners owed a fix or error by
//! a subscription are notified once both locks are released.

mod clock;
mod collaborators;
mod listener;

pub use clock::{Clock, ManualClock, SystemClock};
pub use collaborators::{
    FixCallback, LocationProvider, PassiveProvider, PassiveSensorSource, SampleCallback,
    SensorSource, StartOutcome,
};
pub use listener::{FusionListener, ListenerSet};

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use chrono::{DateTime, Utc};
use log::{debug, trace, warn};

use crate::config::{DisplayRotation, FusionConfig};
use crate::error::LocationError;
use crate::geomag::{DeclinationModel, DipoleModel, GeomagneticModel};
use crate::heading::{
    CompassReading, HeadingFusionEngine, HeadingState, OrientationFilter, SensorSample,
    create_filter,
};
use crate::location::{AcceptancePolicy, AcceptedLocation, LocationFix};

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

struct FusionState {
    policy: AcceptancePolicy,
    accepted: Option<AcceptedLocation>,
    declination: Option<DeclinationModel>,
    geomagnetic: Box<dyn GeomagneticModel>,
    engine: HeadingFusionEngine,
    listeners: ListenerSet,
}

struct Collaborators {
    provider: Box<dyn LocationProvider>,
    sensors: Box<dyn SensorSource>,
    running: bool,
}

struct Inner {
    config: FusionConfig,
    clock: Arc<dyn Clock>,
    collaborators: Mutex<Collaborators>,
    state: Mutex<FusionState>,
}

/// Callbacks owed once the collaborator lock is released
enum Notification {
    Location(Vec<Arc<dyn FusionListener>>, LocationFix),
    Error(Arc<dyn FusionListener>, LocationError),
}

impl Notification {
    fn deliver(self) {
        match self {
            Self::Location(listeners, fix) => {
                for listener in listeners {
                    listener.on_location_updated(&fix);
                }
            }
            Self::Error(listener, error) => listener.on_location_error(error),
        }
    }
}

/// Builder for `FusionCoordinator`
pub struct CoordinatorBuilder {
    config: FusionConfig,
    provider: Box<dyn LocationProvider>,
    sensors: Box<dyn SensorSource>,
    clock: Arc<dyn Clock>,
    geomagnetic: Box<dyn GeomagneticModel>,
    filter: Option<Box<dyn OrientationFilter>>,
}

impl CoordinatorBuilder {
    pub fn provider(mut self, provider: Box<dyn LocationProvider>) -> Self {
        self.provider = provider;
        self
    }

    pub fn sensors(mut self, sensors: Box<dyn SensorSource>) -> Self {
        self.sensors = sensors;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn geomagnetic_model(mut self, model: Box<dyn GeomagneticModel>) -> Self {
        self.geomagnetic = model;
        self
    }

    /// Replace the filter derived from `heading.smoothing_window`
    pub fn filter(mut self, filter: Box<dyn OrientationFilter>) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn build(self) -> FusionCoordinator {
        let policy = AcceptancePolicy::new(self.provider.kind(), &self.config.acceptance);
        let filter = self
            .filter
            .unwrap_or_else(|| create_filter(self.config.heading.smoothing_window));
        let engine = HeadingFusionEngine::new(&self.config.heading, filter);

        FusionCoordinator {
            inner: Arc::new(Inner {
                config: self.config,
                clock: self.clock,
                collaborators: Mutex::new(Collaborators {
                    provider: self.provider,
                    sensors: self.sensors,
                    running: false,
                }),
                state: Mutex::new(FusionState {
                    policy,
                    accepted: None,
                    declination: None,
                    geomagnetic: self.geomagnetic,
                    engine,
                    listeners: ListenerSet::default(),
                }),
            }),
        }
    }
}

/// Single entry point for raw location fixes and sensor samples
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct FusionCoordinator {
    inner: Arc<Inner>,
}

impl FusionCoordinator {
    /// Coordinator with passive collaborators, the system clock and the
    /// dipole declination model
    pub fn builder(config: FusionConfig) -> CoordinatorBuilder {
        CoordinatorBuilder {
            config,
            provider: Box::new(PassiveProvider::default()),
            sensors: Box::new(PassiveSensorSource),
            clock: Arc::new(SystemClock),
            geomagnetic: Box::new(DipoleModel::default()),
            filter: None,
        }
    }

    /// Subscribe a listener.
    ///
    /// The first subscriber starts the provider and sensors and re-seeds the
    /// accepted location from the provider's cache. Later subscribers
    /// immediately receive the current fix if it has not expired. While the
    /// collaborators are stopped (a previous start failed), subscribing again
    /// retries the start. Otherwise subscribing the same listener twice has no
    /// effect.
    pub fn start_updates(&self, listener: Arc<dyn FusionListener>) {
        let notifications = {
            let mut collaborators = lock(&self.inner.collaborators);
            let inserted = lock(&self.inner.state).listeners.insert(listener.clone());

            if collaborators.running {
                if !inserted {
                    trace!("Listener already subscribed");
                    return;
                }
                debug!("Start updates for listener");
                self.unexpired_location()
                    .map(|fix| Notification::Location(vec![listener], fix))
                    .into_iter()
                    .collect()
            } else {
                if !inserted {
                    debug!("Retrying start for subscribed listener");
                }
                self.start_collaborators(&mut collaborators, listener)
            }
        };

        for notification in notifications {
            notification.deliver();
        }
    }

    /// Unsubscribe a listener; the last one out stops the collaborators
    pub fn stop_updates(&self, listener: &Arc<dyn FusionListener>) {
        let mut collaborators = lock(&self.inner.collaborators);

        let now_empty = {
            let mut state = lock(&self.inner.state);
            if !state.listeners.remove(listener) {
                return;
            }
            state.listeners.is_empty()
        };
        debug!("Stop updates for listener");

        if now_empty && collaborators.running {
            debug!("No listeners left, stopping location and sensor updates");
            collaborators.provider.stop_producing_fixes();
            collaborators.sensors.stop_producing_samples();
            collaborators.running = false;

            // Re-initialised on the next start
            let mut state = lock(&self.inner.state);
            state.declination = None;
            state.engine.reset();
        }
    }

    fn start_collaborators(
        &self,
        collaborators: &mut Collaborators,
        listener: Arc<dyn FusionListener>,
    ) -> Vec<Notification> {
        let mut pending_error = None;
        match collaborators
            .provider
            .start_producing_fixes(self.fix_callback())
        {
            StartOutcome::Started => {}
            StartOutcome::Degraded(error) => {
                warn!("Location provider started degraded: {}", error);
                pending_error = Some(error);
            }
            StartOutcome::Failed(error) => {
                warn!("Location provider failed to start: {}", error);
                return vec![Notification::Error(listener, error)];
            }
        }

        collaborators
            .sensors
            .start_producing_samples(self.sample_callback());
        collaborators.running = true;

        let cached = collaborators.provider.last_known_gps_fix();
        let mut notifications: Vec<Notification> = self.reseed(cached).into_iter().collect();
        if let Some(error) = pending_error {
            notifications.push(Notification::Error(listener, error));
        }
        notifications
    }

    /// Accept the provider's cached fix if it is better, otherwise re-announce
    /// the current fix unless it has expired, in which case forget it.
    fn reseed(&self, cached: Option<LocationFix>) -> Option<Notification> {
        let cached = cached.filter(LocationFix::is_valid);
        let received_at = self.inner.clock.wall_now();

        let mut state = lock(&self.inner.state);
        let fix = match cached {
            Some(fix)
                if state
                    .policy
                    .is_better(Some(&fix), state.accepted.as_ref(), received_at) =>
            {
                debug!("Seeding from cached fix: {:?}", fix);
                self.accept_locked(&mut state, fix.clone(), received_at);
                Some(fix)
            }
            _ if self.is_expired_locked(&state) => {
                debug!("Forgetting expired location");
                state.accepted = None;
                None
            }
            _ => state.accepted.as_ref().map(|a| a.fix.clone()),
        };
        fix.map(|fix| Notification::Location(state.listeners.snapshot(), fix))
    }

    fn fix_callback(&self) -> FixCallback {
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        Box::new(move |fix| {
            if let Some(inner) = weak.upgrade() {
                FusionCoordinator { inner }.submit_location(fix);
            }
        })
    }

    fn sample_callback(&self) -> SampleCallback {
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        Box::new(move |sample| {
            if let Some(inner) = weak.upgrade() {
                FusionCoordinator { inner }.submit_sensor_sample(sample);
            }
        })
    }

    /// Offer a raw fix; returns whether it was accepted.
    ///
    /// Fixes with non-positive accuracy are ignored outright.
    pub fn submit_location(&self, fix: LocationFix) -> bool {
        if !fix.is_valid() {
            trace!("Ignoring fix without accuracy: {:?}", fix);
            return false;
        }

        let received_at = self.inner.clock.wall_now();
        let listeners = {
            let mut state = lock(&self.inner.state);
            if !state
                .policy
                .is_better(Some(&fix), state.accepted.as_ref(), received_at)
            {
                debug!("Location rejected: {:?}", fix);
                return false;
            }
            debug!("Location accepted: {:?}", fix);
            self.accept_locked(&mut state, fix.clone(), received_at);
            state.listeners.snapshot()
        };

        for listener in listeners {
            listener.on_location_updated(&fix);
        }
        true
    }

    fn accept_locked(&self, state: &mut FusionState, fix: LocationFix, received_at: DateTime<Utc>) {
        state.engine.update_travel_heading(&fix);

        if DeclinationModel::needs_rebuild(
            state.declination.as_ref(),
            &fix,
            self.inner.config.declination.rebuild_distance_m,
        ) {
            let model = DeclinationModel::build(&fix, state.geomagnetic.as_ref());
            debug!(
                "Declination model rebuilt: {:.2}° at ({:.5}, {:.5})",
                model.declination().to_degrees(),
                fix.latitude,
                fix.longitude
            );
            state.declination = Some(model);
        }

        state.accepted = Some(AcceptedLocation::new(fix, received_at));
    }

    /// Feed a raw accelerometer or magnetometer sample; returns the reading
    /// emitted to listeners, if any.
    pub fn submit_sensor_sample(&self, sample: SensorSample) -> Option<CompassReading> {
        let (reading, listeners) = {
            let mut state = lock(&self.inner.state);
            let state = &mut *state;
            let reading = state
                .engine
                .process_sample(&sample, state.declination.as_ref())?;
            (reading, state.listeners.snapshot())
        };

        for listener in listeners {
            listener.on_compass_updated(&reading);
        }
        Some(reading)
    }

    /// Deliver an error reported by a collaborator to every listener
    pub fn report_error(&self, error: LocationError) {
        warn!("Location error reported: {}", error);
        let listeners = lock(&self.inner.state).listeners.snapshot();
        for listener in listeners {
            listener.on_location_error(error);
        }
    }

    /// The accepted fix, whether or not it has expired
    pub fn last_known_location(&self) -> Option<LocationFix> {
        lock(&self.inner.state)
            .accepted
            .as_ref()
            .map(|accepted| accepted.fix.clone())
    }

    /// Whether there is no accepted fix or it is older than the expiry window
    pub fn is_location_expired(&self) -> bool {
        self.is_expired_locked(&lock(&self.inner.state))
    }

    fn is_expired_locked(&self, state: &FusionState) -> bool {
        state.accepted.as_ref().is_none_or(|accepted| {
            accepted.is_expired(
                self.inner.clock.wall_now(),
                self.inner.clock.monotonic_now(),
                self.inner.config.staleness.window(),
            )
        })
    }

    fn unexpired_location(&self) -> Option<LocationFix> {
        let state = lock(&self.inner.state);
        if self.is_expired_locked(&state) {
            return None;
        }
        state.accepted.as_ref().map(|accepted| accepted.fix.clone())
    }

    /// Current declination in radians, if a model has been built
    pub fn declination(&self) -> Option<f64> {
        lock(&self.inner.state)
            .declination
            .as_ref()
            .map(DeclinationModel::declination)
    }

    pub fn heading_state(&self) -> HeadingState {
        lock(&self.inner.state).engine.state().clone()
    }

    /// Rotate compass angles into the display frame, in place.
    ///
    /// No-op while the travel heading is active; negative ("unavailable")
    /// angles are left as they are.
    pub fn correct_for_display_orientation(&self, angles: &mut [f64], rotation: DisplayRotation) {
        lock(&self.inner.state)
            .engine
            .correct_for_display_orientation(angles, rotation);
    }

    pub fn listener_count(&self) -> usize {
        lock(&self.inner.state).listeners.len()
    }

    pub fn is_running(&self) -> bool {
        lock(&self.inner.collaborators).running
    }
}
