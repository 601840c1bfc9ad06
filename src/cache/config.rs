//! Cache configuration.

/// Separator placed between namespace and key in a [`CompositeKey`](super::CompositeKey).
pub const DEFAULT_KEY_SEPARATOR: &str = ":";

/// Configuration for a cache instance.
///
/// Nothing here expires or bounds entries:
/// entries live until they are invalidated.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Number of entries the result store and pending table reserve up front.
    pub initial_capacity: usize,

    /// Separator used to build composite `namespace<sep>key` identifiers.
    pub key_separator: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 64,
            key_separator: DEFAULT_KEY_SEPARATOR.to_string(),
        }
    }
}

impl CacheConfig {
    /// Create a new cache config with the given initial capacity.
    pub fn with_capacity(initial_capacity: usize) -> Self {
        Self {
            initial_capacity,
            ..Default::default()
        }
    }

    /// Set the initial capacity (builder pattern).
    #[must_use]
    pub fn initial_capacity(mut self, initial_capacity: usize) -> Self {
        self.initial_capacity = initial_capacity;
        self
    }

    /// Set the composite key separator.
    #[must_use]
    pub fn key_separator(mut self, separator: impl Into<String>) -> Self {
        self.key_separator = separator.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_overrides_defaults() {
        let config = CacheConfig::with_capacity(8).key_separator("/");

        assert_eq!(config.initial_capacity, 8);
        assert_eq!(config.key_separator, "/");
        assert_eq!(CacheConfig::default().key_separator, ":");
    }
}
