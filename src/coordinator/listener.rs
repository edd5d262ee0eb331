use std::collections::HashMap;
use std::sync::Arc;

use crate::error::LocationError;
use crate::heading::CompassReading;
use crate::location::LocationFix;

/// Receiver of fused location and heading events
///
/// Callbacks run synchronously on the thread that submitted the input, after
/// the coordinator has released its locks, so they may query it.
pub trait FusionListener: Send + Sync {
    fn on_location_updated(&self, fix: &LocationFix);

    fn on_compass_updated(&self, reading: &CompassReading);

    fn on_location_error(&self, error: LocationError);
}

/// Subscribers keyed by identity (the `Arc` allocation)
#[derive(Default)]
pub struct ListenerSet {
    listeners: HashMap<usize, Arc<dyn FusionListener>>,
}

fn identity(listener: &Arc<dyn FusionListener>) -> usize {
    Arc::as_ptr(listener) as *const () as usize
}

impl ListenerSet {
    /// Returns false if the listener was already subscribed
    pub fn insert(&mut self, listener: Arc<dyn FusionListener>) -> bool {
        self.listeners.insert(identity(&listener), listener).is_none()
    }

    /// Returns false if the listener was not subscribed
    pub fn remove(&mut self, listener: &Arc<dyn FusionListener>) -> bool {
        self.listeners.remove(&identity(listener)).is_some()
    }

    pub fn contains(&self, listener: &Arc<dyn FusionListener>) -> bool {
        self.listeners.contains_key(&identity(listener))
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Copy of the current subscribers, for notifying outside the lock
    pub fn snapshot(&self) -> Vec<Arc<dyn FusionListener>> {
        self.listeners.values().cloned().collect()
    }
}
