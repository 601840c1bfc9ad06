//! Composite `(namespace, key)` identifiers.

use std::fmt;
use std::sync::Arc;

/// Storage key for one cacheable unit, rendered as `namespace:key`.
///
/// Cheap to clone: the rendered string is shared.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct CompositeKey(Arc<str>);

impl CompositeKey {
    pub fn new(namespace: &str, separator: &str, key: &str) -> Self {
        let mut rendered = String::with_capacity(namespace.len() + separator.len() + key.len());
        rendered.push_str(namespace);
        rendered.push_str(separator);
        rendered.push_str(key);
        Self(rendered.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CompositeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for CompositeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CompositeKey({:?})", &*self.0)
    }
}
