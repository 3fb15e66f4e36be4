// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;

use crate::{Cacheable, Error, Result};

/// The mapping from index to shared item backing one cache revision.
///
/// A store is built once from a refreshed batch and never mutated afterwards;
/// refreshes replace the whole store. Items handed out from it therefore
/// remain valid and unchanged for the lifetime of the epoch under which they
/// were observed.
#[derive(Debug)]
pub(crate) struct IndexedStore<T> {
    items: HashMap<String, Arc<T>>,
}

impl<T> IndexedStore<T>
where
    T: Cacheable,
{
    /// Builds a store from a refreshed batch, indexing each item.
    ///
    /// The first duplicate index rejects the whole batch.
    pub(crate) fn from_items(items: Vec<Arc<T>>) -> Result<Self> {
        let mut indexed = HashMap::with_capacity(items.len());

        for item in items {
            match indexed.entry(item.index()) {
                Entry::Occupied(entry) => {
                    return Err(Error::Conflict {
                        index: entry.key().clone(),
                    });
                }
                Entry::Vacant(entry) => {
                    entry.insert(item);
                }
            }
        }

        Ok(Self { items: indexed })
    }

    pub(crate) fn get(&self, index: &str) -> Option<&Arc<T>> {
        self.items.get(index)
    }

    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }

    pub(crate) fn values(&self) -> impl Iterator<Item = &Arc<T>> {
        self.items.values()
    }
}

impl<T> IndexedStore<T>
where
    T: Cacheable + PartialEq,
{
    /// Returns true if both stores hold the same keys mapping to equal items.
    pub(crate) fn contents_equal(&self, other: &Self) -> bool {
        if self.items.len() != other.items.len() {
            return false;
        }

        self.items.iter().all(|(index, item)| {
            other
                .items
                .get(index)
                .is_some_and(|o| Arc::ptr_eq(item, o) || **item == **o)
        })
    }
}
