//! Wall-clock tracking for the info panel. The stream delivers the broadcast
//! time of day once (from the TOT table); everything after that is derived
//! from monotonic elapsed time, with rollover at minute, hour, and day
//! boundaries.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::lock::lock_or_recover;
use crate::state::ClockTime;

/// Time-of-day reference as received from the broadcast tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeReference {
    pub hours: u8,
    pub minutes: u8,
    pub seconds: u8,
}

/// Derive the clock reading `elapsed` after `reference` was received.
fn clock_after(reference: TimeReference, elapsed: Duration) -> ClockTime {
    let reference_secs = u64::from(reference.hours) * 3_600
        + u64::from(reference.minutes) * 60
        + u64::from(reference.seconds);
    let total = (reference_secs + elapsed.as_secs()) % 86_400;
    ClockTime {
        hours: (total / 3_600) as u8,
        minutes: (total % 3_600 / 60) as u8,
    }
}

/// Shared clock; the stream thread registers, the input thread reads.
#[derive(Debug, Default)]
pub struct WallClock {
    reference: Mutex<Option<(TimeReference, Instant)>>,
}

impl WallClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the broadcast time as of now. Later registrations replace the
    /// reference (the broadcast clock wins over our drift).
    pub fn register(&self, reference: TimeReference) {
        let mut slot = lock_or_recover(&self.reference, "wall clock register");
        *slot = Some((reference, Instant::now()));
    }

    /// Current time of day, or `None` while no time table has arrived yet.
    pub fn current(&self) -> Option<ClockTime> {
        let slot = lock_or_recover(&self.reference, "wall clock read");
        slot.map(|(reference, received_at)| clock_after(reference, received_at.elapsed()))
    }
}
