//! Deadline tracking over the engine clock

use chrono::{DateTime, Utc};
use printlink_core::Clock;
use std::sync::Arc;
use std::time::Duration;

/// Answers "has `duration` passed since the last reset?"
///
/// Time comes from the injected [`Clock`], so gates driven by a
/// `ManualClock` only expire when the test advances it.
pub struct TimeoutGate {
    clock: Arc<dyn Clock>,
    duration: Duration,
    last_reset: DateTime<Utc>,
}

impl TimeoutGate {
    /// Create a gate that starts counting now
    pub fn new(clock: Arc<dyn Clock>, duration: Duration) -> Self {
        let last_reset = clock.now();
        Self {
            clock,
            duration,
            last_reset,
        }
    }

    /// Restart the countdown from the current instant
    pub fn reset(&mut self) {
        self.last_reset = self.clock.now();
    }

    /// Check whether the full duration has elapsed since the last reset
    pub fn is_timed_out(&self) -> bool {
        let elapsed = self.clock.now() - self.last_reset;
        match elapsed.to_std() {
            Ok(elapsed) => elapsed >= self.duration,
            // the clock moved backwards
            Err(_) => false,
        }
    }

    /// The configured duration
    pub fn duration(&self) -> Duration {
        self.duration
    }
}

impl std::fmt::Debug for TimeoutGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimeoutGate")
            .field("duration", &self.duration)
            .field("last_reset", &self.last_reset)
            .finish()
    }
}
