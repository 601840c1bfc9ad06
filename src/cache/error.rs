//! Errors surfaced by [`FetchCache::get_or_fetch`](super::FetchCache::get_or_fetch).

use std::sync::Arc;

use thiserror::Error;

use super::CompositeKey;

/// Outcome of a failed fetch.
///
/// Cloning is cheap, and every caller attached to one coalesced fetch receives
/// a clone of the same error.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// The producer succeeded but its envelope carried no payload.
    #[error("response for `{key}` is missing its data field")]
    MissingPayload { key: CompositeKey },

    /// The producer itself failed. The original error is kept as-is.
    #[error("{0:#}")]
    Producer(Arc<anyhow::Error>),

    /// The producer panicked, or its task was torn down (runtime shutdown)
    /// before it could settle.
    #[error("producer for `{key}` panicked")]
    ProducerPanicked { key: CompositeKey },
}

impl FetchError {
    pub(crate) fn producer(error: impl Into<anyhow::Error>) -> Self {
        Self::Producer(Arc::new(error.into()))
    }

    /// The producer's own error, if this is a [`FetchError::Producer`].
    ///
    /// Use [`anyhow::Error::downcast_ref`] to recover the concrete type.
    pub fn producer_error(&self) -> Option<&anyhow::Error> {
        match self {
            Self::Producer(error) => Some(error),
            _ => None,
        }
    }

    pub fn is_missing_payload(&self) -> bool {
        matches!(self, Self::MissingPayload { .. })
    }

    /// Whether two errors are the very same settlement, not just equal-looking ones.
    pub fn same_instance(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Producer(a), Self::Producer(b)) => Arc::ptr_eq(a, b),
            (Self::MissingPayload { key: a }, Self::MissingPayload { key: b })
            | (Self::ProducerPanicked { key: a }, Self::ProducerPanicked { key: b }) => a == b,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    #[error("upstream returned 503")]
    struct Upstream;

    #[test]
    fn test_producer_error_is_recoverable() {
        let error = FetchError::producer(Upstream);

        assert_eq!(error.to_string(), "upstream returned 503");
        assert!(error.producer_error().unwrap().downcast_ref::<Upstream>().is_some());
        assert!(!error.is_missing_payload());
    }

    #[test]
    fn test_same_instance_compares_identity() {
        let a = FetchError::producer(Upstream);
        let b = FetchError::producer(Upstream);

        assert!(a.same_instance(&a.clone()));
        assert!(!a.same_instance(&b));
    }

    #[test]
    fn test_missing_payload_message() {
        let error = FetchError::MissingPayload {
            key: CompositeKey::new("user", ":", "42"),
        };
        assert_eq!(
            error.to_string(),
            "response for `user:42` is missing its data field"
        );
        assert!(error.is_missing_payload());
    }
}
