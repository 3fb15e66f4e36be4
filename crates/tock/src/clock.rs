// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::time::{Instant, SystemTime};

#[cfg(any(feature = "test-util", test))]
use crate::ClockControl;

/// Retrieves the current time.
///
/// In production the clock reads the operating system clock. In tests a
/// controlled clock can be obtained from `ClockControl` (requires the
/// `test-util` feature), giving the test complete authority over the flow
/// of time.
///
/// # State sharing between clocks
///
/// Cloning is inexpensive. Clones of a controlled clock remain linked to the
/// originating `ClockControl`, so advancing the control moves every clone
/// forward together.
///
/// # Examples
///
/// ```
/// use tock::Clock;
///
/// let clock = Clock::new();
///
/// let earlier = clock.instant();
/// let later = clock.instant();
///
/// assert!(later >= earlier);
/// ```
#[derive(Debug, Clone)]
pub struct Clock(ClockState);

#[derive(Debug, Clone)]
enum ClockState {
    System,

    #[cfg(any(feature = "test-util", test))]
    Control(ClockControl),
}

impl Clock {
    /// Creates a clock that reads the operating system clock.
    #[must_use]
    pub const fn new() -> Self {
        Self(ClockState::System)
    }

    /// Creates a new frozen clock.
    ///
    /// This is a convenience method for `ClockControl::new().to_clock()`.
    ///
    /// **Note**: The returned clock will not advance time on its own; use
    /// `ClockControl` when the test needs to move time forward.
    #[cfg(any(feature = "test-util", test))]
    #[must_use]
    pub fn new_frozen() -> Self {
        ClockControl::new().to_clock()
    }

    #[cfg(any(feature = "test-util", test))]
    pub(crate) const fn with_control(control: ClockControl) -> Self {
        Self(ClockState::Control(control))
    }

    /// Retrieves the current monotonic time.
    ///
    /// Unlike [`system_time`][Self::system_time], the instant is not affected
    /// by system clock changes and is guaranteed never to move backwards.
    ///
    /// **Important**: When measuring elapsed time against a controlled clock,
    /// use [`Instant::duration_since`] rather than `Instant::elapsed`; the
    /// `elapsed` method bypasses the clock and goes directly to system time.
    #[must_use]
    pub fn instant(&self) -> Instant {
        match &self.0 {
            ClockState::System => Instant::now(),
            #[cfg(any(feature = "test-util", test))]
            ClockState::Control(control) => control.instant(),
        }
    }

    /// Retrieves the current absolute time.
    ///
    /// **Note**: The system time is not monotonic and can be affected by
    /// system clock changes. Prefer [`instant`][Self::instant] for interval
    /// measurements.
    #[must_use]
    pub fn system_time(&self) -> SystemTime {
        match &self.0 {
            ClockState::System => SystemTime::now(),
            #[cfg(any(feature = "test-util", test))]
            ClockState::Control(control) => control.system_time(),
        }
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn assert_types() {
        static_assertions::assert_impl_all!(Clock: Send, Sync, Clone);
    }

    #[test]
    fn system_clock_moves_forward() {
        let clock = Clock::new();

        let earlier = clock.instant();
        let later = clock.instant();

        assert!(later >= earlier);
    }

    #[test]
    fn frozen_clock_does_not_advance() {
        let clock = Clock::new_frozen();

        let instant = clock.instant();
        let system_time = clock.system_time();

        std::thread::sleep(Duration::from_micros(1));

        assert_eq!(instant, clock.instant());
        assert_eq!(system_time, clock.system_time());
    }

    #[test]
    fn clones_of_controlled_clock_share_time() {
        let control = ClockControl::new();
        let clock = control.to_clock();
        let clone = clock.clone();

        control.advance(Duration::from_secs(5));

        assert_eq!(clock.instant(), clone.instant());
        assert_eq!(clock.system_time(), clone.system_time());
    }
}
