//! Time sources for the rate limiter.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Monotonic time source.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// System clock implementation using `Instant::now()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Manually advanced clock for deterministic tests.
///
/// Clones share the same underlying time value.
#[derive(Debug, Clone)]
pub struct MockClock {
    current: Arc<Mutex<Instant>>,
}

impl MockClock {
    pub fn new(start: Instant) -> Self {
        Self {
            current: Arc::new(Mutex::new(start)),
        }
    }

    pub fn advance(&self, duration: Duration) {
        let mut time = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        *time += duration;
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new(Instant::now())
    }
}

impl Clock for MockClock {
    fn now(&self) -> Instant {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
