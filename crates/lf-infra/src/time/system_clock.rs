use std::time::{SystemTime, UNIX_EPOCH};

use lf_core::ports::ClockPort;

/// Wall clock in milliseconds since the UNIX epoch.
pub struct SystemClock;

impl ClockPort for SystemClock {
    fn now_ms(&self) -> i64 {
        // A clock set before 1970 reads as the epoch; cache ages then only
        // grow once it is corrected.
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis() as i64)
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_is_monotonic_enough_for_ttl_checks() {
        let clock = SystemClock;
        let first = clock.now_ms();
        let second = clock.now_ms();
        assert!(first > 0);
        assert!(second >= first);
    }
}
