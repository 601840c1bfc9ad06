//! File-backed envelope source used by the driver.
//!
//! Envelopes live at `<data_dir>/<namespace>/<key>.json`.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde_json::Value;
use tracing::debug;

use crate::cache::{Envelope, FetchCache, FetchError};

/// Loads envelopes from disk, optionally after an artificial delay.
///
/// Clone-friendly; every clone reads the same directory.
#[derive(Debug, Clone)]
pub struct EnvelopeSource {
    data_dir: Arc<Path>,
    delay: Duration,
}

impl EnvelopeSource {
    pub fn new(data_dir: impl Into<PathBuf>, delay: Duration) -> Self {
        let data_dir: PathBuf = data_dir.into();
        Self {
            data_dir: Arc::from(data_dir),
            delay,
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Path of the envelope for `namespace`/`key`.
    ///
    /// Rejects parts that would escape the data directory.
    pub fn path_for(&self, namespace: &str, key: &str) -> Result<PathBuf> {
        for part in [namespace, key] {
            let mut components = Path::new(part).components();
            let is_plain = matches!(
                (components.next(), components.next()),
                (Some(Component::Normal(_)), None)
            );
            if !is_plain {
                bail!("invalid path segment {part:?}");
            }
        }

        Ok(self
            .data_dir
            .join(namespace)
            .join(format!("{key}.json")))
    }

    /// Read and decode one envelope.
    ///
    /// Falsy JSON payloads (`null`, `""`, `0`, `false`) come back as no
    /// payload, so the cache rejects them as missing.
    pub async fn load(&self, namespace: &str, key: &str) -> Result<Envelope<Value>> {
        let path = self.path_for(namespace, key)?;

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        debug!("Loading envelope from {}", path.display());
        let bytes = tokio::fs::read(&path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;

        let mut envelope: Envelope<Value> = serde_json::from_slice(&bytes)
            .with_context(|| format!("failed to parse envelope {}", path.display()))?;
        envelope.data = envelope.data.filter(|data| !is_falsy(data));
        Ok(envelope)
    }

    /// Look `key` up through `cache`, loading from disk on a miss.
    pub async fn fetch(&self, cache: &FetchCache<Value>, key: &str) -> Result<Value, FetchError> {
        let source = self.clone();
        let namespace = cache.namespace().to_string();
        let owned_key = key.to_string();

        cache
            .get_or_fetch(key, move || async move { source.load(&namespace, &owned_key).await })
            .await
    }
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(flag) => !flag,
        Value::Number(number) => number.as_f64() == Some(0.0),
        Value::String(text) => text.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}
