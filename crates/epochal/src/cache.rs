// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The refresh-ahead cache and its background worker.

use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures::FutureExt;
use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::gate::{Admission, InvalidationGate, InvalidationRequest};
use crate::store::IndexedStore;
use crate::{Cacheable, Epoch, Error, GetSnapshot, ListSnapshot, Result};

/// How often to refresh when the options do not say otherwise.
///
/// Changes to the underlying data are assumed to be relatively infrequent,
/// and changes that require immediate visibility are expected to go through
/// an explicit [`invalidate`][RefreshAheadCache::invalidate].
pub const DEFAULT_REFRESH_PERIOD: Duration = Duration::from_secs(60 * 60);

/// Configures a [`RefreshAheadCache`].
#[derive(Clone, Copy, Debug)]
pub struct RefreshAheadCacheOptions {
    /// The interval between consecutive periodic refreshes.
    /// [`Duration::ZERO`] selects [`DEFAULT_REFRESH_PERIOD`]. A refresh that
    /// outlasts the interval stretches the effective period; ticks never
    /// pile up behind it.
    pub refresh_period: Duration,
}

impl Default for RefreshAheadCacheOptions {
    fn default() -> Self {
        Self {
            refresh_period: DEFAULT_REFRESH_PERIOD,
        }
    }
}

/// The user-supplied data source for a [`RefreshAheadCache`].
///
/// A refresh produces the complete replacement dataset; there is no notion
/// of an incremental update. Any post-processing of raw data is best done
/// inside the refresh as well, to hide its cost from readers.
///
/// Implemented for any `Fn(CancellationToken) -> impl Future` closure with
/// the matching output, so a plain closure is usually all that is needed.
pub trait Refresher<T>: Send + Sync {
    /// Produces a fresh copy of the dataset.
    ///
    /// The token is the one passed to [`RefreshAheadCache::run`]; a data
    /// source performing long or retried I/O should honor it. A refresh
    /// canceled this way is treated as a failed refresh and leaves the
    /// cache unchanged.
    fn refresh(
        &self,
        shutdown: CancellationToken,
    ) -> impl Future<Output = Result<Vec<Arc<T>>>> + Send;
}

impl<T, F, Fut> Refresher<T> for F
where
    F: Fn(CancellationToken) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Vec<Arc<T>>>> + Send,
{
    fn refresh(
        &self,
        shutdown: CancellationToken,
    ) -> impl Future<Output = Result<Vec<Arc<T>>>> + Send {
        self(shutdown)
    }
}

/// A read-optimized cache for sets of uniquely indexed resources.
///
/// The cache sits in front of an expensive data source and serves
/// high-frequency reads from memory. All writes happen on a single
/// background worker, either on a periodic schedule or on an explicit,
/// blocking [`invalidate`][Self::invalidate]; readers never pay a load
/// penalty and block only for the brief moment in which a finished refresh
/// swaps the dataset in.
///
/// Every snapshot carries an [`Epoch`]. A refresh that produces content
/// equal to the installed dataset does not advance the epoch, so clients
/// can memoize work derived from a snapshot and key it by epoch alone.
///
/// Cloning is cheap and clones share the same cache.
pub struct RefreshAheadCache<T, R> {
    inner: Arc<CacheInner<T, R>>,
}

struct CacheInner<T, R> {
    options: RefreshAheadCacheOptions,
    refresh: R,
    /// The installed dataset and its epoch. `None` until the first
    /// successful refresh. Only the worker takes the write side.
    state: RwLock<Option<Installed<T>>>,
    gate: InvalidationGate,
    invalidations: mpsc::Sender<Arc<InvalidationRequest>>,
    /// Claimed by [`RefreshAheadCache::run`] when the worker starts.
    receiver: Mutex<Option<mpsc::Receiver<Arc<InvalidationRequest>>>>,
    terminated: AtomicBool,
}

struct Installed<T> {
    epoch: Epoch,
    store: IndexedStore<T>,
}

impl<T, R> RefreshAheadCache<T, R>
where
    T: Cacheable + PartialEq + Send + Sync + 'static,
    R: Refresher<T> + 'static,
{
    /// Constructs a new refresh-ahead cache.
    ///
    /// The cache serves no data until [`run`][Self::run] has pre-populated
    /// it.
    #[must_use]
    pub fn new(refresh: R, options: RefreshAheadCacheOptions) -> Self {
        // Capacity 1 so that an invalidation arriving before the worker
        // loop is selecting on the channel parks in the buffer instead of
        // blocking in the send.
        let (invalidations, receiver) = mpsc::channel(1);

        Self {
            inner: Arc::new(CacheInner {
                options,
                refresh,
                state: RwLock::new(None),
                gate: InvalidationGate::default(),
                invalidations,
                receiver: Mutex::new(Some(receiver)),
                terminated: AtomicBool::new(false),
            }),
        }
    }

    /// Performs a synchronous refresh to pre-load the cache data and starts
    /// the background worker.
    ///
    /// Returns once the initial refresh has completed, at which point the
    /// cache is warm and ready for reads; feeding this into a readiness
    /// probe guarantees no client ever observes a cold cache. The worker
    /// runs until `shutdown` is canceled, after which all operations fail
    /// with [`Error::Invalid`].
    ///
    /// # Errors
    ///
    /// Returns the initial refresh failure, in which case no worker is
    /// started and `run` can be called again. Returns [`Error::Invalid`] if
    /// the worker has already been started.
    pub async fn run(&self, shutdown: CancellationToken) -> Result<()> {
        // Claim the worker slot before refreshing: the worker is the sole
        // writer, and a concurrent second run must not be allowed to race
        // it.
        let receiver = self.inner.receiver.lock().take().ok_or(Error::Invalid)?;

        if let Err(error) = self.inner.refresh_now(&shutdown).await {
            *self.inner.receiver.lock() = Some(receiver);
            return Err(error);
        }

        tokio::spawn(run_worker(Arc::clone(&self.inner), shutdown, receiver));

        Ok(())
    }

    /// Does a zero-copy read of the item with the specified index.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Invalid`] if the cache has not been populated yet or
    /// has been shut down, and [`Error::NotFound`] if the index is not in
    /// the current dataset.
    pub fn get(&self, index: &str) -> Result<GetSnapshot<T>> {
        if self.inner.terminated() {
            return Err(Error::Invalid);
        }

        let state = self.inner.state.read();
        let installed = state.as_ref().ok_or(Error::Invalid)?;

        let item = installed.store.get(index).ok_or_else(|| Error::NotFound {
            index: index.to_owned(),
        })?;

        Ok(GetSnapshot::new(installed.epoch, Arc::clone(item)))
    }

    /// Does a zero-copy read of all items.
    ///
    /// Only the outer vector of the snapshot is allocated; the items are
    /// shared with the cache.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Invalid`] if the cache has not been populated yet or
    /// has been shut down.
    pub fn list(&self) -> Result<ListSnapshot<T>> {
        if self.inner.terminated() {
            return Err(Error::Invalid);
        }

        let state = self.inner.state.read();
        let installed = state.as_ref().ok_or(Error::Invalid)?;

        let mut items = Vec::with_capacity(installed.store.len());
        items.extend(installed.store.values().map(Arc::clone));

        Ok(ListSnapshot::new(installed.epoch, items))
    }

    /// Performs a synchronous invalidation of the cache, returning only
    /// once a refresh that began after this call has completed. On success
    /// the cache is guaranteed to contain data at least as new as the
    /// moment of the call.
    ///
    /// Concurrent callers coalesce: arrivals while a refresh request is
    /// pending are served by that same request rather than each queuing
    /// their own refresh.
    ///
    /// A call made before [`run`][Self::run] has started the worker parks
    /// until the worker picks it up.
    ///
    /// # Errors
    ///
    /// Returns the error of the refresh that served this call, or
    /// [`Error::Invalid`] after shutdown.
    pub async fn invalidate(&self) -> Result<()> {
        if self.inner.terminated() {
            return Err(Error::Invalid);
        }

        let request = match self.inner.gate.admit() {
            Admission::Joined(request) => request,
            Admission::Opened(request) => {
                // Designated sender for this round. If the channel has been
                // closed by a shutdown, fail the round and unblock anyone
                // already parked on it.
                if self
                    .inner
                    .invalidations
                    .send(Arc::clone(&request))
                    .await
                    .is_err()
                {
                    self.inner.gate.clear();
                    request.complete(Err(Error::Invalid));
                }

                request
            }
        };

        request.wait().await
    }
}

impl<T, R> Clone for RefreshAheadCache<T, R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T, R> fmt::Debug for RefreshAheadCache<T, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshAheadCache")
            .field("options", &self.inner.options)
            .finish_non_exhaustive()
    }
}

impl<T, R> CacheInner<T, R>
where
    T: Cacheable + PartialEq + Send + Sync,
    R: Refresher<T>,
{
    fn terminated(&self) -> bool {
        self.terminated.load(Ordering::Acquire)
    }

    /// Does one refresh attempt end-to-end, behind a panic barrier: the
    /// refresh routine must never be able to crash the worker.
    async fn refresh_now(&self, shutdown: &CancellationToken) -> Result<()> {
        match AssertUnwindSafe(self.try_refresh(shutdown)).catch_unwind().await {
            Ok(outcome) => outcome,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                tracing::error!(payload = %message, "caught unhandled panic during cache refresh");
                Err(Error::WorkerPanic { message })
            }
        }
    }

    async fn try_refresh(&self, shutdown: &CancellationToken) -> Result<()> {
        let data = self.refresh.refresh(shutdown.clone()).await?;

        let store = IndexedStore::from_items(data)?;

        // Has anything actually changed? Compared unlocked: this function
        // runs only on the single worker, so the installed store cannot
        // change underneath the comparison.
        {
            let state = self.state.read();

            if let Some(installed) = state.as_ref() {
                if installed.store.contents_equal(&store) {
                    return Ok(());
                }
            }
        }

        // Write the new data.
        let mut state = self.state.write();

        let epoch = state
            .as_ref()
            .map_or_else(Epoch::initial, |installed| installed.epoch.next());

        *state = Some(Installed { epoch, store });

        Ok(())
    }

    /// Moves the cache to its terminal state: no further reads or
    /// invalidations succeed, and any request already parked in the channel
    /// is failed so its waiters unblock.
    fn terminate(&self, invalidations: &mut mpsc::Receiver<Arc<InvalidationRequest>>) {
        self.terminated.store(true, Ordering::Release);

        invalidations.close();

        while let Ok(request) = invalidations.try_recv() {
            self.gate.clear();
            request.complete(Err(Error::Invalid));
        }
    }
}

/// The single cooperative worker loop. All refreshes execute here, so a
/// periodic refresh and an invalidation-driven one are never concurrent.
async fn run_worker<T, R>(
    inner: Arc<CacheInner<T, R>>,
    shutdown: CancellationToken,
    mut invalidations: mpsc::Receiver<Arc<InvalidationRequest>>,
) where
    T: Cacheable + PartialEq + Send + Sync + 'static,
    R: Refresher<T> + 'static,
{
    let mut refresh_period = inner.options.refresh_period;

    if refresh_period.is_zero() {
        refresh_period = DEFAULT_REFRESH_PERIOD;
    }

    let mut ticker = time::interval_at(time::Instant::now() + refresh_period, refresh_period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;

            () = shutdown.cancelled() => break,
            request = invalidations.recv() => {
                let Some(request) = request else { break };

                // This request is about to be attempted. Clear the pending
                // slot so that the next caller of invalidate opens its own
                // request, and does not glom onto this one while it is in
                // flight.
                inner.gate.clear();

                request.complete(inner.refresh_now(&shutdown).await);
            }
            _ = ticker.tick() => {
                if let Err(error) = inner.refresh_now(&shutdown).await {
                    tracing::error!(error = %error, "failed to refresh cache data");
                }
            }
        }
    }

    inner.terminate(&mut invalidations);
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "opaque panic payload".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Item {
        id: usize,
    }

    impl Cacheable for Item {
        fn index(&self) -> String {
            self.id.to_string()
        }
    }

    fn unit_cache() -> RefreshAheadCache<Item, impl Refresher<Item> + 'static> {
        RefreshAheadCache::new(
            |_shutdown: CancellationToken| async { Ok(vec![Arc::new(Item { id: 1 })]) },
            RefreshAheadCacheOptions::default(),
        )
    }

    #[test]
    fn options_default_to_an_hourly_refresh() {
        let options = RefreshAheadCacheOptions::default();
        assert_eq!(options.refresh_period, Duration::from_secs(3600));
    }

    #[test]
    fn reads_fail_until_populated() {
        let cache = unit_cache();

        assert!(matches!(cache.get("1"), Err(Error::Invalid)));
        assert!(matches!(cache.list(), Err(Error::Invalid)));
    }

    #[tokio::test]
    async fn run_claims_the_worker_exactly_once() {
        let cache = unit_cache();

        cache.run(CancellationToken::new()).await.unwrap();

        let error = cache.run(CancellationToken::new()).await.unwrap_err();
        assert!(matches!(error, Error::Invalid));
    }

    #[test]
    fn panic_messages_render_common_payloads() {
        let payload: Box<dyn std::any::Any + Send> = Box::new("literal");
        assert_eq!(panic_message(payload.as_ref()), "literal");

        let payload: Box<dyn std::any::Any + Send> = Box::new("owned".to_owned());
        assert_eq!(panic_message(payload.as_ref()), "owned");

        let payload: Box<dyn std::any::Any + Send> = Box::new(42_u32);
        assert_eq!(panic_message(payload.as_ref()), "opaque panic payload");
    }

    #[test]
    fn debug_does_not_require_debug_items() {
        let cache = unit_cache();
        assert!(format!("{cache:?}").contains("RefreshAheadCache"));
    }
}
