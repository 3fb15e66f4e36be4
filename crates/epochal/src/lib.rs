// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Refresh-ahead, epoch-versioned caching for sets of indexed resources.
//!
//! # Why?
//!
//! A timeout cache that is lazily loaded on a miss makes somebody pay the
//! load penalty at read time. This crate takes the opposite stance: the
//! entire dataset is rebuilt in the background, either periodically or on an
//! explicit synchronization request, so every client read performs equally
//! well. The cache is pre-populated before it reports ready, which feeds
//! naturally into readiness probes and rolling upgrades.
//!
//! # Overview
//!
//! - [`RefreshAheadCache`] - The main cache. Consumes a [`Refresher`]
//!   callback that produces the complete dataset and serves zero-copy reads
//!   of individual items ([`get`][RefreshAheadCache::get]) or the whole set
//!   ([`list`][RefreshAheadCache::list]).
//! - [`Epoch`] - An opaque revision token attached to every snapshot. Two
//!   snapshots carry equal epochs exactly when the cache contents did not
//!   change between them, so clients can memoize derived artifacts (JSON
//!   encodings, filtered views) keyed by epoch.
//! - [`Cacheable`] - The item contract: a unique index per item. Change
//!   detection additionally requires [`PartialEq`].
//! - [`TimeoutCache`] - A single-value sibling for cases where a freshness
//!   window, not wholesale replacement, is the requirement.
//!
//! # Read safety
//!
//! Naively handing the internal collection to a client would let filtering
//! operations mutate shared state, while a deep copy on every read would be
//! needlessly expensive. Items are therefore shared as [`Arc`][std::sync::Arc]
//! references: a [`list`][RefreshAheadCache::list] allocates only the outer
//! vector, which the caller owns outright and may destroy at will.
//!
//! # Synchronization
//!
//! [`invalidate`][RefreshAheadCache::invalidate] is deliberately blocking:
//! when control returns to the client, the cache is guaranteed to contain
//! data produced by a refresh that began after the call. Concurrent
//! invalidations coalesce onto a single pending refresh rather than queuing
//! one refresh per caller.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//!
//! use epochal::{Cacheable, RefreshAheadCache, RefreshAheadCacheOptions};
//! use tokio_util::sync::CancellationToken;
//!
//! #[derive(Debug, PartialEq)]
//! struct Flavor {
//!     name: String,
//! }
//!
//! impl Cacheable for Flavor {
//!     fn index(&self) -> String {
//!         self.name.clone()
//!     }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> epochal::Result<()> {
//! let cache = RefreshAheadCache::new(
//!     |_shutdown: CancellationToken| async {
//!         Ok(vec![Arc::new(Flavor {
//!             name: "m1.small".to_owned(),
//!         })])
//!     },
//!     RefreshAheadCacheOptions::default(),
//! );
//!
//! cache.run(CancellationToken::new()).await?;
//!
//! let snapshot = cache.get("m1.small")?;
//! assert_eq!(snapshot.item().name, "m1.small");
//! # Ok(())
//! # }
//! ```

mod cache;
mod epoch;
mod error;
mod gate;
mod item;
mod snapshot;
mod store;
mod timeout;

pub use cache::{
    DEFAULT_REFRESH_PERIOD, RefreshAheadCache, RefreshAheadCacheOptions, Refresher,
};
pub use epoch::Epoch;
pub use error::{Error, Result};
pub use item::Cacheable;
pub use snapshot::{GetSnapshot, ListSnapshot};
pub use timeout::TimeoutCache;
