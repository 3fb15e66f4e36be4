// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tock::Clock;

/// A cache holding a single value with an absolute expiry.
///
/// This is the small sibling of
/// [`RefreshAheadCache`][crate::RefreshAheadCache] for cases where a
/// freshness window, not wholesale replacement of an indexed dataset, is the
/// requirement: an authorization token, a negotiated endpoint, a feature
/// flag document. The value is simply absent once the window has elapsed;
/// there is no background machinery.
///
/// The clock is injectable for deterministic expiry tests; see
/// [`with_clock`][Self::with_clock].
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use epochal::TimeoutCache;
///
/// let cache = TimeoutCache::new(Duration::from_secs(60));
/// assert!(cache.get().is_none());
///
/// cache.set(42);
/// assert_eq!(cache.get(), Some(42));
///
/// cache.invalidate();
/// assert!(cache.get().is_none());
/// ```
#[derive(Debug)]
pub struct TimeoutCache<T> {
    timeout: Duration,
    clock: Clock,
    entry: Mutex<Option<Entry<T>>>,
}

#[derive(Debug)]
struct Entry<T> {
    value: T,
    stored_at: Instant,
}

impl<T> TimeoutCache<T>
where
    T: Clone,
{
    /// Creates a cache whose values expire `timeout` after being set,
    /// measured against the operating system clock.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self::with_clock(timeout, Clock::new())
    }

    /// Creates a cache measuring expiry against the provided clock.
    #[must_use]
    pub fn with_clock(timeout: Duration, clock: Clock) -> Self {
        Self {
            timeout,
            clock,
            entry: Mutex::new(None),
        }
    }

    /// Records a value, resetting the expiry window.
    pub fn set(&self, value: T) {
        *self.entry.lock() = Some(Entry {
            value,
            stored_at: self.clock.instant(),
        });
    }

    /// Returns the stored value if one is present and still within its
    /// expiry window.
    #[must_use]
    pub fn get(&self) -> Option<T> {
        let entry = self.entry.lock();
        let entry = entry.as_ref()?;

        let age = self.clock.instant().saturating_duration_since(entry.stored_at);

        if age >= self.timeout {
            return None;
        }

        Some(entry.value.clone())
    }

    /// Clears the stored value.
    pub fn invalidate(&self) {
        *self.entry.lock() = None;
    }
}
