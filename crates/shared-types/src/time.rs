//! Clock port.
//!
//! Token expiry and transaction staleness both read the clock through
//! `TimeSource` so tests can drive time deterministically.

use crate::entities::Timestamp;

/// Wall clock in Unix milliseconds.
pub trait TimeSource: Send + Sync {
    fn now(&self) -> Timestamp;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> Timestamp {
        let since_epoch = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default();
        since_epoch.as_millis() as Timestamp
    }
}

#[cfg(any(test, feature = "test-utils"))]
pub use manual::MockTimeSource;

#[cfg(any(test, feature = "test-utils"))]
mod manual {
    use super::TimeSource;
    use crate::entities::Timestamp;
    use std::sync::atomic::{AtomicU64, Ordering};

    /// Clock that only moves when told to.
    #[derive(Debug)]
    pub struct MockTimeSource {
        millis: AtomicU64,
    }

    impl MockTimeSource {
        pub fn new(start: Timestamp) -> Self {
            Self {
                millis: AtomicU64::new(start),
            }
        }

        pub fn advance(&self, ms: u64) {
            self.millis.fetch_add(ms, Ordering::SeqCst);
        }

        pub fn set(&self, now: Timestamp) {
            self.millis.store(now, Ordering::SeqCst);
        }
    }

    impl TimeSource for MockTimeSource {
        fn now(&self) -> Timestamp {
            self.millis.load(Ordering::SeqCst)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_is_past_2020() {
        assert!(SystemTimeSource.now() > 1_577_836_800_000);
    }

    #[test]
    fn test_mock_clock_moves_only_when_driven() {
        let clock = MockTimeSource::new(1_000);
        assert_eq!(clock.now(), 1_000);
        clock.advance(500);
        assert_eq!(clock.now(), 1_500);
        clock.set(3_000);
        assert_eq!(clock.now(), 3_000);
    }
}
