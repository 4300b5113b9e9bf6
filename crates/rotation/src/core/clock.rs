//! Time source abstraction

use std::fmt;

use chrono::{DateTime, Utc};

/// Wall-clock source injected into the coordinator.
///
/// Production code uses [`SystemClock`]; tests inject a settable clock so
/// expiration checks and written timestamps are deterministic.
pub trait Clock: Send + Sync + fmt::Debug {
    /// Current wall-clock time
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock backed by the system time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_is_recent() {
        let now = SystemClock.now();
        assert!(now.timestamp() > 1_600_000_000); // After Sep 2020
    }
}
