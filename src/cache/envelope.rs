//! Producer response envelope.

use serde::Deserialize;

/// Raw response returned by a producer.
///
/// Only `data` is ever cached; the other fields are informational and are
/// dropped once the payload has been extracted.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Envelope<T> {
    pub code: Option<i64>,
    pub data: Option<T>,
    pub msg: Option<String>,
    pub total: Option<u64>,
}

impl<T> Envelope<T> {
    /// A successful envelope (`code = 0`) carrying `data`.
    pub fn ok(data: T) -> Self {
        Self {
            code: Some(0),
            data: Some(data),
            msg: None,
            total: None,
        }
    }

    /// An envelope without payload.
    pub fn empty() -> Self {
        Self {
            code: None,
            data: None,
            msg: None,
            total: None,
        }
    }

    /// Take the payload out, discarding the envelope.
    pub fn into_payload(self) -> Option<T> {
        self.data
    }
}

impl<T> Default for Envelope<T> {
    fn default() -> Self {
        Self::empty()
    }
}
