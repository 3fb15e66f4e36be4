// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

/// A resource that can be held by a [`RefreshAheadCache`][crate::RefreshAheadCache].
///
/// Change detection between refreshes additionally requires [`PartialEq`];
/// two items comparing equal means a refresh carrying them is considered
/// unchanged and does not advance the epoch.
pub trait Cacheable {
    /// Returns the index for the item.
    ///
    /// The index must be stable and unique across the entire dataset; a
    /// refresh that yields the same index twice is rejected with
    /// [`Error::Conflict`][crate::Error::Conflict].
    fn index(&self) -> String;
}
