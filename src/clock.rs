//! Wall-clock source.
//!
//! Replay and playlist-end detection compare `now` against an expected end
//! time captured earlier; both readings must come from the same source or
//! the comparison drifts. Everything time-related goes through [`Clock`],
//! and tests feed explicit instants instead.

use std::time::{SystemTime, UNIX_EPOCH};

/// Provider of "seconds since the unix epoch" readings.
pub trait Clock {
    fn now(&self) -> f64;
}

/// The system wall clock.
#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs_f64()
    }
}
