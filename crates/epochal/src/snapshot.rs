// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Read views handed out by the cache.

use std::sync::Arc;

use crate::Epoch;

/// A read view of a single cache item.
///
/// The item is shared with the cache and must be treated as read-only.
#[derive(Clone, Debug)]
pub struct GetSnapshot<T> {
    epoch: Epoch,
    item: Arc<T>,
}

impl<T> GetSnapshot<T> {
    pub(crate) fn new(epoch: Epoch, item: Arc<T>) -> Self {
        Self { epoch, item }
    }

    /// The revision of the cache data this snapshot was taken from. Clients
    /// can memoize transformations of the item and reuse them until a later
    /// snapshot carries a different epoch.
    #[must_use]
    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    /// The cache item.
    #[must_use]
    pub fn item(&self) -> &Arc<T> {
        &self.item
    }

    /// Consumes the snapshot, returning the shared item reference.
    #[must_use]
    pub fn into_item(self) -> Arc<T> {
        self.item
    }
}

/// A read view of the whole cache contents.
///
/// The outer vector is freshly allocated per call and owned by the caller;
/// destructive filtering of it cannot affect the cache or any other
/// snapshot. The items themselves are shared with the cache and must be
/// treated as read-only. No ordering is promised across calls or within a
/// snapshot.
#[derive(Clone, Debug)]
pub struct ListSnapshot<T> {
    epoch: Epoch,
    items: Vec<Arc<T>>,
}

impl<T> ListSnapshot<T> {
    pub(crate) fn new(epoch: Epoch, items: Vec<Arc<T>>) -> Self {
        Self { epoch, items }
    }

    /// The revision of the cache data this snapshot was taken from. Clients
    /// can memoize transformations of the items and reuse them until a later
    /// snapshot carries a different epoch.
    #[must_use]
    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    /// The cache items.
    #[must_use]
    pub fn items(&self) -> &[Arc<T>] {
        &self.items
    }

    /// Mutable access to the caller-owned outer vector, for in-place
    /// filtering.
    #[must_use]
    pub fn items_mut(&mut self) -> &mut Vec<Arc<T>> {
        &mut self.items
    }

    /// Consumes the snapshot, returning the caller-owned vector of shared
    /// item references.
    #[must_use]
    pub fn into_items(self) -> Vec<Arc<T>> {
        self.items
    }
}
