//! Per-namespace cache instance.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use super::envelope::Envelope;
use super::pending::{FetchResult, Lookup, PendingTable, SharedFetch};
use super::store::ResultStore;
use super::{CacheConfig, CacheStats, CompositeKey, FetchError, StatsSnapshot};

/// A namespaced cache that memoizes async producers and coalesces concurrent
/// fetches of the same key into a single producer call.
///
/// This cache is:
/// - Thread-safe and clone-friendly (clones share the same state)
/// - Never expiring: values live until [`invalidate`](Self::invalidate)d
/// - Never caching failures: a failed fetch is retried by the next caller
///
/// Producers run on a spawned tokio task, so `get_or_fetch` must be awaited
/// inside a tokio runtime.
pub struct FetchCache<T> {
    inner: Arc<Inner<T>>,
}

struct Inner<T> {
    namespace: Arc<str>,
    config: CacheConfig,
    store: ResultStore<T>,
    pending: PendingTable<T>,
    stats: CacheStats,
}

// Manual Clone implementation that doesn't require T: Clone
impl<T> Clone for FetchCache<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> FetchCache<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a standalone cache for `namespace`.
    ///
    /// Most callers should go through
    /// [`CacheRegistry::instance_for`](super::CacheRegistry::instance_for)
    /// instead, which hands out one shared instance per namespace.
    pub fn new(namespace: impl Into<Arc<str>>, config: CacheConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                namespace: namespace.into(),
                store: ResultStore::with_capacity(config.initial_capacity),
                pending: PendingTable::with_capacity(config.initial_capacity),
                stats: CacheStats::new(),
                config,
            }),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.inner.namespace
    }

    /// Whether both handles point at the same instance.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Get the cached value for `key`, or fetch it with `producer`.
    ///
    /// - A cached value is returned without calling `producer`.
    /// - If another caller is already fetching `key`, this waits for that
    ///   fetch and returns its outcome; `producer` is dropped unused.
    /// - Otherwise `producer` is invoked exactly once on a spawned task. Its
    ///   payload is cached on success. An envelope without payload fails with
    ///   [`FetchError::MissingPayload`], a producer error is passed through as
    ///   [`FetchError::Producer`], and nothing is cached in either case.
    ///
    /// Only an absent payload (`None`) counts as missing. Zero, empty or
    /// `false` values of `T` are cached like any other; producers that treat
    /// those as "no data" should return [`Envelope::empty`] instead.
    ///
    /// The producer runs to completion even if every caller stops waiting.
    pub async fn get_or_fetch<F, Fut, E>(&self, key: &str, producer: F) -> Result<T, FetchError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<Envelope<T>, E>> + Send + 'static,
        E: Into<anyhow::Error> + Send + 'static,
    {
        let key = self.composite_key(key);

        if let Some(value) = self.inner.store.get(&key) {
            debug!("Cache hit for {}", key);
            self.inner.stats.record_hit();
            return Ok(value);
        }

        let lookup = self.inner.pending.attach_or_lead(
            &key,
            || self.inner.store.get(&key),
            || self.spawn_fetch(key.clone(), producer),
        );

        match lookup {
            Lookup::Ready(value) => {
                debug!("Cache hit for {} (settled while waiting for lock)", key);
                self.inner.stats.record_hit();
                Ok(value)
            }
            Lookup::Attached(fetch) => {
                debug!("Joining in-flight fetch for {}", key);
                self.inner.stats.record_coalesced();
                fetch.await
            }
            Lookup::Leader(fetch) => {
                debug!("Cache miss for {}, fetching", key);
                self.inner.stats.record_fetch();
                fetch.await
            }
        }
    }

    /// Drop cached values.
    ///
    /// `Some(key)` removes that key only; `None` clears the whole namespace.
    /// In-flight fetches are left alone and still publish their result.
    pub fn invalidate(&self, key: Option<&str>) {
        match key {
            Some(key) => {
                let key = self.composite_key(key);
                if self.inner.store.remove(&key) {
                    debug!("Invalidated {}", key);
                }
            }
            None => {
                debug!("Invalidated all entries in namespace '{}'", self.inner.namespace);
                self.inner.store.clear();
            }
        }
        self.inner.stats.record_invalidation();
    }

    /// Get a cached value without fetching.
    pub fn get(&self, key: &str) -> Option<T> {
        self.inner.store.get(&self.composite_key(key))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner.store.contains(&self.composite_key(key))
    }

    /// Whether a fetch for `key` is currently in flight.
    pub fn is_pending(&self, key: &str) -> bool {
        self.inner.pending.contains(&self.composite_key(key))
    }

    /// Number of cached values.
    pub fn len(&self) -> usize {
        self.inner.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of fetches currently in flight.
    pub fn pending_count(&self) -> usize {
        self.inner.pending.len()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.inner.stats.snapshot()
    }

    fn composite_key(&self, key: &str) -> CompositeKey {
        CompositeKey::new(&self.inner.namespace, &self.inner.config.key_separator, key)
    }

    /// Spawn the producer and hand back a shareable handle to its outcome.
    ///
    /// Called with the pending lock held; the task cannot settle before the
    /// returned handle has been registered.
    fn spawn_fetch<F, Fut, E>(&self, key: CompositeKey, producer: F) -> SharedFetch<T>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<Envelope<T>, E>> + Send + 'static,
        E: Into<anyhow::Error> + Send + 'static,
    {
        let (sender, receiver) = oneshot::channel();
        let fallback = key.clone();
        let cleanup = PendingCleanup {
            inner: Arc::clone(&self.inner),
            key: Some(key.clone()),
        };

        let fetch = async move {
            let outcome = match AssertUnwindSafe(async move { producer().await })
                .catch_unwind()
                .await
            {
                Ok(Ok(envelope)) => envelope
                    .into_payload()
                    .ok_or_else(|| FetchError::MissingPayload { key: key.clone() }),
                Ok(Err(error)) => Err(FetchError::producer(error)),
                Err(_) => Err(FetchError::ProducerPanicked { key: key.clone() }),
            };

            if let Err(error) = &outcome {
                warn!("Fetch for {} failed: {}", key, error);
            }

            cleanup.settle(&outcome);
            sender.send(outcome).ok();
        };

        tokio::spawn(fetch);

        async move {
            receiver
                .await
                .unwrap_or_else(|_| Err(FetchError::ProducerPanicked { key: fallback }))
        }
        .boxed()
        .shared()
    }
}

/// Removes a pending entry exactly once: on settlement, or when the fetch task
/// is dropped without settling (runtime shutdown).
struct PendingCleanup<T: Clone> {
    inner: Arc<Inner<T>>,
    key: Option<CompositeKey>,
}

impl<T: Clone> PendingCleanup<T> {
    /// Publish a successful value and remove the pending entry in one step.
    fn settle(mut self, outcome: &FetchResult<T>) {
        let Some(key) = self.key.take() else {
            return;
        };

        let inner = &self.inner;
        inner.pending.settle(&key, || match outcome {
            Ok(value) => inner.store.insert(key.clone(), value.clone()),
            Err(_) => inner.stats.record_failure(),
        });
    }
}

impl<T: Clone> Drop for PendingCleanup<T> {
    fn drop(&mut self) {
        if let Some(key) = self.key.take() {
            debug!("Fetch for {} dropped before settling", key);
            self.inner.pending.settle(&key, || {});
        }
    }
}

impl<T> std::fmt::Debug for FetchCache<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchCache")
            .field("namespace", &self.inner.namespace)
            .field("entry_count", &self.len())
            .field("pending_count", &self.pending_count())
            .finish()
    }
}
