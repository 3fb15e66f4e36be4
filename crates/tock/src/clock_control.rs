// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

use parking_lot::Mutex;

use crate::Clock;

/// Controls the flow of time for clocks created from it.
///
/// Time starts frozen at the moment of construction and only moves when
/// [`advance`][Self::advance] is called. Every clock obtained via
/// [`to_clock`][Self::to_clock], and every clone of such a clock, observes
/// the same controlled time.
#[derive(Debug, Clone)]
pub struct ClockControl {
    inner: Arc<Mutex<ControlState>>,
}

#[derive(Debug)]
struct ControlState {
    instant: Instant,
    system_time: SystemTime,
}

impl ClockControl {
    /// Creates a control frozen at the current time.
    #[must_use]
    pub fn new() -> Self {
        Self::new_at(SystemTime::now())
    }

    /// Creates a control frozen at the specified absolute time.
    ///
    /// The monotonic instant still starts at the moment of construction; only
    /// the absolute time is overridden.
    #[must_use]
    pub fn new_at(time: SystemTime) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ControlState {
                instant: Instant::now(),
                system_time: time,
            })),
        }
    }

    /// Creates a clock driven by this control.
    #[must_use]
    pub fn to_clock(&self) -> Clock {
        Clock::with_control(self.clone())
    }

    /// Moves time forward by the given duration.
    ///
    /// Both the monotonic instant and the absolute time advance together.
    ///
    /// # Panics
    ///
    /// Panics if the duration overflows the representable time range.
    pub fn advance(&self, duration: Duration) {
        let mut state = self.inner.lock();

        state.instant = state
            .instant
            .checked_add(duration)
            .expect("advancing the controlled instant overflowed");
        state.system_time = state
            .system_time
            .checked_add(duration)
            .expect("advancing the controlled system time overflowed");
    }

    pub(crate) fn instant(&self) -> Instant {
        self.inner.lock().instant
    }

    pub(crate) fn system_time(&self) -> SystemTime {
        self.inner.lock().system_time
    }
}

impl Default for ClockControl {
    fn default() -> Self {
        Self::new()
    }
}
