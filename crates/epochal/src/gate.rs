// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Coalescing of concurrent synchronous invalidations.

use std::sync::{Arc, OnceLock};

use event_listener::Event;
use parking_lot::Mutex;

use crate::Result;

/// Delivers the outcome of one refresh attempt to every caller coalesced
/// onto it.
///
/// The outcome slot is written once by the refresh worker; waiters register
/// a listener before re-checking the slot so a completion between the check
/// and the registration cannot be missed.
#[derive(Debug)]
pub(crate) struct InvalidationRequest {
    outcome: OnceLock<Result<()>>,
    done: Event,
}

impl InvalidationRequest {
    fn new() -> Self {
        Self {
            outcome: OnceLock::new(),
            done: Event::new(),
        }
    }

    /// Stores the refresh outcome and wakes every waiter. The first writer
    /// wins; later completions are ignored.
    pub(crate) fn complete(&self, outcome: Result<()>) {
        _ = self.outcome.set(outcome);
        self.done.notify(usize::MAX);
    }

    /// Waits until the refresh serving this request has completed and
    /// returns its outcome.
    pub(crate) async fn wait(&self) -> Result<()> {
        loop {
            if let Some(outcome) = self.outcome.get() {
                return outcome.clone();
            }

            let listener = self.done.listen();

            if let Some(outcome) = self.outcome.get() {
                return outcome.clone();
            }

            listener.await;
        }
    }
}

/// The result of entering the gate.
pub(crate) enum Admission {
    /// The caller opened a new request and is the designated sender for
    /// this round.
    Opened(Arc<InvalidationRequest>),
    /// A request was already pending; the caller waits for that one and
    /// receives its result.
    Joined(Arc<InvalidationRequest>),
}

/// The single-slot mailbox that coalesces concurrent invalidations.
///
/// This is not a queue: while a request is pending, every arriving caller
/// joins it. The worker clears the slot before it starts the refresh, so
/// callers arriving during the refresh open a new request that will be
/// served by the next one. That ordering is what guarantees each caller a
/// refresh that began after its call.
#[derive(Debug, Default)]
pub(crate) struct InvalidationGate {
    pending: Mutex<Option<Arc<InvalidationRequest>>>,
}

impl InvalidationGate {
    pub(crate) fn admit(&self) -> Admission {
        let mut pending = self.pending.lock();

        if let Some(request) = &*pending {
            return Admission::Joined(Arc::clone(request));
        }

        let request = Arc::new(InvalidationRequest::new());
        *pending = Some(Arc::clone(&request));

        Admission::Opened(request)
    }

    /// Clears the pending slot.
    pub(crate) fn clear(&self) {
        *self.pending.lock() = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn assert_types() {
        static_assertions::assert_impl_all!(InvalidationRequest: Send, Sync);
        static_assertions::assert_impl_all!(InvalidationGate: Send, Sync);
    }

    #[tokio::test]
    async fn wait_returns_the_stored_outcome() {
        let request = InvalidationRequest::new();

        request.complete(Err(Error::Invalid));

        assert!(matches!(request.wait().await, Err(Error::Invalid)));
    }

    #[tokio::test]
    async fn completion_wakes_a_parked_waiter() {
        let request = Arc::new(InvalidationRequest::new());

        let waiter = {
            let request = Arc::clone(&request);
            tokio::spawn(async move { request.wait().await })
        };

        tokio::task::yield_now().await;
        request.complete(Ok(()));

        waiter.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn completion_is_broadcast_to_every_waiter() {
        let request = Arc::new(InvalidationRequest::new());

        let waiters: Vec<_> = (0..8)
            .map(|_| {
                let request = Arc::clone(&request);
                tokio::spawn(async move { request.wait().await })
            })
            .collect();

        tokio::task::yield_now().await;
        request.complete(Ok(()));

        for waiter in waiters {
            waiter.await.unwrap().unwrap();
        }
    }

    #[tokio::test]
    async fn first_completion_wins() {
        let request = InvalidationRequest::new();

        request.complete(Ok(()));
        request.complete(Err(Error::Invalid));

        request.wait().await.unwrap();
    }

    #[test]
    fn concurrent_callers_join_the_pending_request() {
        let gate = InvalidationGate::default();

        let Admission::Opened(opened) = gate.admit() else {
            panic!("first caller should open a request");
        };

        let Admission::Joined(joined) = gate.admit() else {
            panic!("second caller should join the pending request");
        };

        assert!(Arc::ptr_eq(&opened, &joined));
    }

    #[test]
    fn clearing_the_slot_opens_a_new_round() {
        let gate = InvalidationGate::default();

        let Admission::Opened(first) = gate.admit() else {
            panic!("first caller should open a request");
        };

        gate.clear();

        let Admission::Opened(second) = gate.admit() else {
            panic!("a caller after clear should open a new request");
        };

        assert!(!Arc::ptr_eq(&first, &second));
    }
}
