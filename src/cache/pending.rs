//! Pending table: in-flight producer calls, shared by every caller of the same key.

use std::collections::HashMap;

use futures::future::{BoxFuture, Shared};
use parking_lot::Mutex;

use super::{CompositeKey, FetchError};

/// Settlement of one fetch, as seen by every attached caller.
pub(crate) type FetchResult<T> = Result<T, FetchError>;

/// Handle to an in-flight fetch. Clones resolve to the same outcome.
pub(crate) type SharedFetch<T> = Shared<BoxFuture<'static, FetchResult<T>>>;

/// How a lookup was resolved while holding the pending lock.
pub(crate) enum Lookup<T> {
    /// A value was stored between the lock-free check and taking the lock.
    Ready(T),
    /// Another caller is already fetching this key.
    Attached(SharedFetch<T>),
    /// This caller registered a new fetch and is its leader.
    Leader(SharedFetch<T>),
}

/// In-flight fetches, at most one per [`CompositeKey`].
///
/// All mutations happen under a single mutex, so "is anything in flight?"
/// and "register mine" are one atomic step.
pub(crate) struct PendingTable<T> {
    entries: Mutex<HashMap<CompositeKey, SharedFetch<T>>>,
}

impl<T: Clone> PendingTable<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::with_capacity(capacity)),
        }
    }

    /// Attach to the in-flight fetch for `key`, or register a new one.
    ///
    /// `cached` is consulted first, under the lock, so a value published by a
    /// settling leader is never missed. `start` is only called when neither a
    /// value nor a fetch exists, and its handle is visible to other callers
    /// before this returns.
    pub fn attach_or_lead(
        &self,
        key: &CompositeKey,
        cached: impl FnOnce() -> Option<T>,
        start: impl FnOnce() -> SharedFetch<T>,
    ) -> Lookup<T> {
        let mut entries = self.entries.lock();

        if let Some(value) = cached() {
            return Lookup::Ready(value);
        }

        if let Some(fetch) = entries.get(key) {
            return Lookup::Attached(fetch.clone());
        }

        let fetch = start();
        entries.insert(key.clone(), fetch.clone());
        Lookup::Leader(fetch)
    }

    /// Remove the entry for `key`, running `publish` under the same lock.
    ///
    /// Returns `false` if there was no entry to remove.
    pub fn settle(&self, key: &CompositeKey, publish: impl FnOnce()) -> bool {
        let mut entries = self.entries.lock();
        publish();
        entries.remove(key).is_some()
    }

    pub fn contains(&self, key: &CompositeKey) -> bool {
        self.entries.lock().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }
}
