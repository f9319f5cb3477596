//! Comparator driven sorted container.

mod record;

use std::cmp::Ordering;

pub(crate) use record::{BoundRecord, Slot};

/// Elements kept in a [`SortedStore`].
pub(crate) trait Sortable {
    /// Three way comparison on the sort order only.
    fn sort_cmp(&self, other: &Self) -> Ordering;
    /// Full content equality. Implies `sort_cmp == Equal`, not the reverse.
    fn same_content(&self, other: &Self) -> bool;
}

#[derive(Debug, Clone)]
pub(crate) struct SortedStore<T> {
    items: Vec<T>,
}

impl<T> Default for SortedStore<T> {
    fn default() -> Self {
        SortedStore { items: vec![] }
    }
}

impl<T: Sortable> SortedStore<T> {
    pub(crate) fn new() -> SortedStore<T> {
        SortedStore::default()
    }

    /// Insert before the first element that does not sort before `item`, so
    /// equal keyed items end up in front of the existing ones. Duplicates are
    /// kept.
    pub(crate) fn insert(&mut self, item: T) {
        let index = self.position(&item);
        self.items.insert(index, item);
    }

    /// Whether an element with the same content is stored. Only the run of
    /// elements comparing equal to `item` is searched.
    pub(crate) fn contains(&self, item: &T) -> bool {
        self.items[self.position(item)..]
            .iter()
            .take_while(|found| found.sort_cmp(item) == Ordering::Equal)
            .any(|found| found.same_content(item))
    }

    pub(crate) fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub(crate) fn first(&self) -> Option<&T> {
        self.items.first()
    }

    pub(crate) fn last(&self) -> Option<&T> {
        self.items.last()
    }

    fn position(&self, item: &T) -> usize {
        self.items
            .partition_point(|existing| existing.sort_cmp(item) == Ordering::Less)
    }
}

impl<T: Sortable> FromIterator<T> for SortedStore<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut store = SortedStore::new();
        for item in iter {
            store.insert(item);
        }
        store
    }
}
