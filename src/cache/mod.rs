//! Cache module - Namespaced, fetch-coalescing caches.
//!
//! This module provides a registry-based caching system where each namespace
//! owns one cache instance that memoizes async producers.
//!
//! ## Architecture
//!
//! - `CacheRegistry` - Central registry holding one instance per namespace
//! - `FetchCache` - The per-namespace instance (`get_or_fetch` / `invalidate`)
//! - `ResultStore` - Resolved values by composite `namespace:key`
//! - `PendingTable` - In-flight fetches, used to coalesce concurrent requests
//!
//! ## Usage
//!
//! ```rust,ignore
//! let users = registry.instance_for::<User>("user");
//!
//! // Concurrent callers for "42" share a single `api.get_user` call.
//! let user = users.get_or_fetch("42", move || api.get_user(42)).await?;
//!
//! // Force the next lookup to fetch again.
//! users.invalidate(Some("42"));
//! ```

mod config;
mod envelope;
mod error;
mod instance;
mod key;
mod pending;
mod registry;
mod stats;
mod store;

pub use config::{CacheConfig, DEFAULT_KEY_SEPARATOR};
pub use envelope::Envelope;
pub use error::FetchError;
pub use instance::FetchCache;
pub use key::CompositeKey;
pub use registry::CacheRegistry;
pub use stats::{CacheStats, StatsSnapshot};
