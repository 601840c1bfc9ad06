//! Cache registry - one shared cache instance per namespace.

use std::any::{Any, TypeId};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, LazyLock};

use parking_lot::RwLock;
use tracing::{debug, info};

use super::{CacheConfig, FetchCache};

static GLOBAL: LazyLock<CacheRegistry> = LazyLock::new(CacheRegistry::new);

/// Central registry handing out one [`FetchCache`] per namespace.
///
/// Instances are created on first use and live as long as the registry.
/// Repeated lookups of a namespace return handles to the very same instance,
/// and concurrent first lookups still create only one.
///
/// ## Example
///
/// ```rust
/// use fetchcache::{CacheRegistry, Envelope};
///
/// # async fn demo() -> Result<(), fetchcache::FetchError> {
/// let registry = CacheRegistry::new();
/// let users = registry.instance_for::<String>("user");
///
/// let name = users
///     .get_or_fetch("42", || async { Ok::<_, std::io::Error>(Envelope::ok("Ann".to_string())) })
///     .await?;
/// assert_eq!(name, "Ann");
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct CacheRegistry {
    instances: Arc<RwLock<HashMap<InstanceId, RegisteredInstance>>>,
    config: CacheConfig,
}

/// Instances are keyed by namespace and value type, so a namespace reused
/// with another `T` gets its own instance instead of a type error.
#[derive(Clone, PartialEq, Eq, Hash)]
struct InstanceId {
    namespace: String,
    type_id: TypeId,
}

/// Internal entry storing a type-erased cache.
struct RegisteredInstance {
    cache: Box<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl CacheRegistry {
    /// Create a new empty registry with default instance config.
    pub fn new() -> Self {
        Self::with_config(CacheConfig::default())
    }

    /// Create a registry whose instances all use `config`.
    pub fn with_config(config: CacheConfig) -> Self {
        info!("Cache registry initialized");
        Self {
            instances: Arc::new(RwLock::new(HashMap::new())),
            config,
        }
    }

    /// Process-wide registry, for hosts without an application context to
    /// thread a registry through.
    pub fn global() -> &'static CacheRegistry {
        &GLOBAL
    }

    /// Get the cache for `namespace`, creating it on first use.
    ///
    /// Any string is a valid namespace, including the empty one.
    pub fn instance_for<T>(&self, namespace: &str) -> FetchCache<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        let id = InstanceId {
            namespace: namespace.to_string(),
            type_id: TypeId::of::<T>(),
        };

        if let Some(cache) = Self::lookup::<T>(&self.instances.read(), &id) {
            return cache;
        }

        let mut instances = self.instances.write();

        // Someone may have created it between dropping the read lock and
        // taking the write lock.
        if let Some(cache) = Self::lookup::<T>(&instances, &id) {
            return cache;
        }

        debug!(
            "Creating cache for namespace '{}' ({})",
            namespace,
            std::any::type_name::<T>()
        );

        let cache = FetchCache::<T>::new(namespace, self.config.clone());
        instances.insert(
            id,
            RegisteredInstance {
                cache: Box::new(cache.clone()),
                type_name: std::any::type_name::<T>(),
            },
        );

        cache
    }

    fn lookup<T>(
        instances: &HashMap<InstanceId, RegisteredInstance>,
        id: &InstanceId,
    ) -> Option<FetchCache<T>>
    where
        T: Clone + Send + Sync + 'static,
    {
        instances
            .get(id)
            .and_then(|entry| entry.cache.downcast_ref::<FetchCache<T>>())
            .cloned()
    }

    /// Check if any instance exists for `namespace`.
    pub fn contains(&self, namespace: &str) -> bool {
        self.instances
            .read()
            .keys()
            .any(|id| id.namespace == namespace)
    }

    /// Get the number of registered instances.
    pub fn len(&self) -> usize {
        self.instances.read().len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.instances.read().is_empty()
    }

    /// Get the sorted, de-duplicated list of registered namespaces.
    pub fn namespaces(&self) -> Vec<String> {
        self.instances
            .read()
            .keys()
            .map(|id| id.namespace.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

impl Default for CacheRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CacheRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let instances = self.instances.read();
        f.debug_struct("CacheRegistry")
            .field("instance_count", &instances.len())
            .field(
                "instances",
                &instances
                    .iter()
                    .map(|(id, entry)| (id.namespace.as_str(), entry.type_name))
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}
