// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Provides a minimal abstraction over machine time.
//!
//! # Why?
//!
//! Code that reads the clock directly is notoriously difficult to test: expiry
//! windows can only be exercised by sleeping, which makes tests slow and
//! flaky. This crate provides a [`Clock`] that reads the operating system
//! clock in production while allowing tests to substitute a controlled time
//! source that only moves when told to.
//!
//! # Overview
//!
//! - [`Clock`] - Retrieves the current time, either as a monotonic
//!   [`Instant`][std::time::Instant] or as an absolute
//!   [`SystemTime`][std::time::SystemTime]. Cheap to clone; clones of a
//!   controlled clock share the same flow of time.
//! - `ClockControl` - Manufactures controlled clocks and advances their time
//!   manually. Exposed only when the `test-util` feature is enabled.
//!
//! # Testing
//!
//! Enable the `test-util` feature to gain access to `ClockControl` and
//! `Clock::new_frozen()`. A frozen clock never advances on its own;
//! `ClockControl::advance` moves every clock linked to it forward in one
//! step, making expiry tests instantaneous and deterministic.
//!
//! **Important:** Never enable the `test-util` feature for production code.
//! Only use it in your `dev-dependencies`.

mod clock;
#[cfg(any(feature = "test-util", test))]
mod clock_control;

pub use clock::Clock;
#[cfg(any(feature = "test-util", test))]
pub use clock_control::ClockControl;
