//! General time utility functions

use chrono;

/// Number of nanoseconds in a second
pub const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Convert a duration into a number of seconds, or `None` if overflow
pub fn duration_to_seconds(duration: chrono::Duration) -> Option<f64> {
    duration
        .num_nanoseconds()
        .map(|ns| ns as f64 / NANOS_PER_SECOND as f64)
}

/// Fixed period cycle clock.
///
/// The clock is the single source of tick identity and time for the control loop. Time is derived
/// from the tick count rather than a wall clock so that every consumer in a tick sees the same
/// timestamp.
#[derive(Debug, Clone, Copy)]
pub struct CycleClock {
    period_s: f64,
    tick: u64,
}

impl CycleClock {
    pub fn new(period_s: f64) -> Self {
        Self { period_s, tick: 0 }
    }

    /// Advance to the next tick and return it.
    pub fn advance(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn period_s(&self) -> f64 {
        self.period_s
    }

    /// Timestamp of the current tick.
    ///
    /// Units: seconds
    pub fn now_s(&self) -> f64 {
        self.tick as f64 * self.period_s
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_cycle_clock() {
        let mut clock = CycleClock::new(0.02);
        assert_eq!(clock.tick(), 0);
        assert_eq!(clock.now_s(), 0.0);

        assert_eq!(clock.advance(), 1);
        assert_eq!(clock.advance(), 2);
        assert!((clock.now_s() - 0.04).abs() < 1e-12);
    }

    #[test]
    fn test_duration_to_seconds() {
        let d = chrono::Duration::milliseconds(1500);
        assert_eq!(duration_to_seconds(d), Some(1.5));
    }
}
