//! Wall-clock capability.
//!
//! The pipeline reads time only through [`Clock`] so tests can control the
//! measured duration (and therefore the cost estimate) exactly.

use chrono::{DateTime, Utc};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Whole milliseconds from `start` to `end`, clamped at zero.
pub fn elapsed_ms(start: DateTime<Utc>, end: DateTime<Utc>) -> u64 {
    (end - start).num_milliseconds().max(0) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn elapsed_is_clamped() {
        let t0 = Utc::now();
        assert_eq!(elapsed_ms(t0, t0 + Duration::milliseconds(1500)), 1500);
        assert_eq!(elapsed_ms(t0 + Duration::seconds(1), t0), 0);
    }

    #[test]
    fn system_clock_moves_forward() {
        let clock = SystemClock;
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }
}
