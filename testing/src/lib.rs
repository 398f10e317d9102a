//! # MissionBoard Testing
//!
//! Testing utilities and helpers for MissionBoard reducers.
//!
//! This crate provides:
//! - A fixed clock so deadline and period arithmetic is deterministic
//! - A Given-When-Then harness for reducers
//! - Assertion helpers for the effects a reducer returns
//!
//! ## Example
//!
//! ```ignore
//! use missionboard_testing::{ReducerTest, test_clock};
//!
//! ReducerTest::new(RegistrationReducer::new())
//!     .with_env(RegistrationEnvironment::new(Arc::new(test_clock())))
//!     .given_state(state_with_capacity(1))
//!     .when_action(RegistrationAction::Register { .. })
//!     .then_state(|state| assert_eq!(state.seats_taken(), 1))
//!     .run();
//! ```

mod reducer_test;

pub use reducer_test::{assertions, ReducerTest};

use chrono::{DateTime, Utc};
use missionboard_core::environment::Clock;

/// Mock implementations of Environment traits
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use chrono::TimeZone;

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use missionboard_testing::mocks::FixedClock;
    /// use missionboard_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }

        /// Create a fixed clock at midnight UTC of the given calendar day.
        ///
        /// Falls back to the Unix epoch for an impossible date.
        #[must_use]
        pub fn at_date(year: i32, month: u32, day: u32) -> Self {
            let time = Utc
                .with_ymd_and_hms(year, month, day, 0, 0, 0)
                .single()
                .unwrap_or(DateTime::UNIX_EPOCH);
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::at_date(2025, 1, 1)
    }
}

// Re-export commonly used items
pub use mocks::{test_clock, FixedClock};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock() {
        let clock = test_clock();
        let time1 = clock.now();
        let time2 = clock.now();
        assert_eq!(time1, time2);
    }

    #[test]
    fn test_clock_is_new_year_2025() {
        assert_eq!(test_clock().now().to_rfc3339(), "2025-01-01T00:00:00+00:00");
    }
}
