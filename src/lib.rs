//! fetchcache - Namespaced, fetch-coalescing cache
//!
//! Memoizes the result of expensive async producers per key, and makes
//! concurrent requests for a key that is not cached yet share one in-flight
//! producer call.
//!
//! ## Architecture
//!
//! - `cache` - Registry, per-namespace instances, result store and pending table
//! - `config` - Environment configuration for the driver binary
//! - `driver` - Line-command runtime behind the `fetchcache` binary
//! - `source` - File-backed envelope producer used by the driver
//! - `utils` - Command and duration parsing

pub mod cache;
pub mod config;
pub mod driver;
pub mod source;
pub mod utils;

pub use cache::{
    CacheConfig, CacheRegistry, CompositeKey, Envelope, FetchCache, FetchError, StatsSnapshot,
};
