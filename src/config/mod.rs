//! Configuration module for the fetchcache driver.
//!
//! Loads configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};

use crate::cache::CacheConfig;
use crate::utils::parse_duration;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding `<namespace>/<key>.json` envelope files.
    pub data_dir: PathBuf,

    /// Artificial latency added to every producer call, to make coalescing
    /// observable.
    pub fetch_delay: Duration,

    /// Settings applied to every cache instance.
    pub cache: CacheConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            fetch_delay: Duration::ZERO,
            cache: CacheConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Unset variables fall back to defaults; malformed ones are errors.
    /// Callers load `.env` first, as the binary does at startup.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build a config from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(dir) = lookup("FETCHCACHE_DATA_DIR").filter(|s| !s.trim().is_empty()) {
            config.data_dir = PathBuf::from(dir.trim());
        }

        if let Some(delay) = lookup("FETCHCACHE_FETCH_DELAY") {
            config.fetch_delay = parse_duration(&delay)
                .ok_or_else(|| anyhow!("FETCHCACHE_FETCH_DELAY is not a duration: {delay:?}"))?;
        }

        if let Some(capacity) = lookup("FETCHCACHE_INITIAL_CAPACITY") {
            let capacity = capacity
                .trim()
                .parse::<usize>()
                .with_context(|| format!("FETCHCACHE_INITIAL_CAPACITY is not a number: {capacity:?}"))?;
            config.cache = config.cache.initial_capacity(capacity);
        }

        if let Some(separator) = lookup("FETCHCACHE_KEY_SEPARATOR").filter(|s| !s.is_empty()) {
            config.cache = config.cache.key_separator(separator);
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = Config::from_lookup(lookup(&[])).unwrap();

        assert_eq!(config.data_dir, PathBuf::from("./data"));
        assert_eq!(config.fetch_delay, Duration::ZERO);
        assert_eq!(config.cache.initial_capacity, 64);
    }

    #[test]
    fn test_reads_all_variables() {
        let config = Config::from_lookup(lookup(&[
            ("FETCHCACHE_DATA_DIR", "/srv/envelopes"),
            ("FETCHCACHE_FETCH_DELAY", "250ms"),
            ("FETCHCACHE_INITIAL_CAPACITY", "1024"),
            ("FETCHCACHE_KEY_SEPARATOR", "/"),
        ]))
        .unwrap();

        assert_eq!(config.data_dir, PathBuf::from("/srv/envelopes"));
        assert_eq!(config.fetch_delay, Duration::from_millis(250));
        assert_eq!(config.cache.initial_capacity, 1024);
        assert_eq!(config.cache.key_separator, "/");
    }

    #[test]
    fn test_rejects_malformed_values() {
        assert!(Config::from_lookup(lookup(&[("FETCHCACHE_FETCH_DELAY", "soon")])).is_err());
        assert!(
            Config::from_lookup(lookup(&[("FETCHCACHE_FETCH_DELAY", "9999999999999999h")])).is_err()
        );
        assert!(Config::from_lookup(lookup(&[("FETCHCACHE_INITIAL_CAPACITY", "-1")])).is_err());
    }
}
