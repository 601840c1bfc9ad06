//! Result store: resolved values per composite key.

use dashmap::DashMap;

use super::CompositeKey;

/// Resolved values, keyed by [`CompositeKey`].
///
/// Only successful fetches ever land here.
pub(crate) struct ResultStore<T> {
    values: DashMap<CompositeKey, T>,
}

impl<T: Clone> ResultStore<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            values: DashMap::with_capacity(capacity),
        }
    }

    pub fn get(&self, key: &CompositeKey) -> Option<T> {
        self.values.get(key).map(|entry| entry.value().clone())
    }

    pub fn insert(&self, key: CompositeKey, value: T) {
        self.values.insert(key, value);
    }

    pub fn contains(&self, key: &CompositeKey) -> bool {
        self.values.contains_key(key)
    }

    /// Returns `true` if a value was removed.
    pub fn remove(&self, key: &CompositeKey) -> bool {
        self.values.remove(key).is_some()
    }

    pub fn clear(&self) {
        self.values.clear();
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }
}
