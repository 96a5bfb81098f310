//! Time sources for event stamping.
//!
//! Event invokers record the instant a handler was attached and drop events
//! stamped before it. Production code reads the wall clock; tests use a
//! [`LabClock`] that only moves when advanced, so "event queued before the
//! handler was wired up" can be reproduced exactly.
//!
//! # Example
//!
//! ```
//! use weft_core::clock::{Clock, LabClock};
//! use web_time::Duration;
//!
//! let lab = LabClock::new();
//! let clock = Clock::lab(&lab);
//! let before = clock.now();
//! lab.advance(Duration::from_millis(5));
//! assert!(clock.now() > before);
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use web_time::{Duration, Instant};

/// A manually-advanceable clock for deterministic tests.
///
/// All clones share the same offset, so every [`Clock`] built from the same
/// `LabClock` sees the same time.
#[derive(Debug, Clone)]
pub struct LabClock {
    epoch: Instant,
    offset_us: Arc<AtomicU64>,
}

impl LabClock {
    /// Create a new lab clock starting at `Instant::now()`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
            offset_us: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Advance the lab clock by `delta`.
    pub fn advance(&self, delta: Duration) {
        let us = delta.as_micros().min(u64::MAX as u128) as u64;
        self.offset_us.fetch_add(us, Ordering::Release);
    }

    /// Current lab time.
    #[must_use]
    pub fn now(&self) -> Instant {
        let offset = Duration::from_micros(self.offset_us.load(Ordering::Acquire));
        self.epoch + offset
    }
}

impl Default for LabClock {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Default)]
enum TimeSource {
    #[default]
    Real,
    Lab(LabClock),
}

/// Time source handle. Cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct Clock {
    source: TimeSource,
}

impl Clock {
    /// Wall-clock time.
    #[must_use]
    pub fn real() -> Self {
        Self {
            source: TimeSource::Real,
        }
    }

    /// Time driven by a [`LabClock`].
    #[must_use]
    pub fn lab(clock: &LabClock) -> Self {
        Self {
            source: TimeSource::Lab(clock.clone()),
        }
    }

    /// Current time according to this source.
    #[must_use]
    pub fn now(&self) -> Instant {
        match &self.source {
            TimeSource::Real => Instant::now(),
            TimeSource::Lab(c) => c.now(),
        }
    }

    /// Whether this clock is lab-driven.
    #[inline]
    #[must_use]
    pub fn is_lab(&self) -> bool {
        matches!(self.source, TimeSource::Lab(_))
    }
}
