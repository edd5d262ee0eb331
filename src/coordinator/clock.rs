use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};

use super::lock;

/// Time source for reception timestamps and fix expiry
pub trait Clock: Send + Sync {
    /// Current local wall-clock time
    fn wall_now(&self) -> DateTime<Utc>;

    /// Boot-relative monotonic time in nanoseconds, if the host has one
    fn monotonic_now(&self) -> Option<u64> {
        None
    }
}

/// Wall clock from the operating system; no boot-relative clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn wall_now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock driven by the caller, for replaying recordings
#[derive(Debug)]
pub struct ManualClock {
    wall: Mutex<DateTime<Utc>>,
    monotonic: Mutex<Option<u64>>,
}

impl ManualClock {
    pub fn new(wall: DateTime<Utc>) -> Self {
        Self {
            wall: Mutex::new(wall),
            monotonic: Mutex::new(None),
        }
    }

    pub fn set_wall(&self, wall: DateTime<Utc>) {
        *lock(&self.wall) = wall;
    }

    pub fn set_monotonic(&self, nanos: Option<u64>) {
        *lock(&self.monotonic) = nanos;
    }

    /// Move both clocks forward
    pub fn advance(&self, by: Duration) {
        let mut wall = lock(&self.wall);
        *wall += chrono::Duration::from_std(by).unwrap_or_else(|_| chrono::Duration::zero());

        let mut monotonic = lock(&self.monotonic);
        if let Some(nanos) = monotonic.as_mut() {
            *nanos = nanos.saturating_add(by.as_nanos() as u64);
        }
    }
}

impl Clock for ManualClock {
    fn wall_now(&self) -> DateTime<Utc> {
        *lock(&self.wall)
    }

    fn monotonic_now(&self) -> Option<u64> {
        *lock(&self.monotonic)
    }
}
