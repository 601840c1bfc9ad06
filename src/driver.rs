//! Driver runtime - feeds line commands into the cache registry.

use anyhow::Result;
use serde_json::{Value, json};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::cache::CacheRegistry;
use crate::source::EnvelopeSource;
use crate::utils::{Command, parse_command};

/// Run every command read from `input`, writing one JSON line per result to
/// `output`.
///
/// `get` commands run concurrently, so repeated lookups of a key that is still
/// loading share one read. `invalidate` and `stats` take effect in input order.
/// Lines that are not valid UTF-8 or fail to parse produce an error record
/// and the run carries on. Returns `output` once all lookups have finished.
pub async fn run<R, W>(
    mut input: R,
    mut output: W,
    registry: &CacheRegistry,
    source: &EnvelopeSource,
) -> Result<W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (sender, mut receiver) = mpsc::unbounded_channel::<Value>();

    let writer = tokio::spawn(async move {
        while let Some(record) = receiver.recv().await {
            let mut line = serde_json::to_vec(&record)?;
            line.push(b'\n');
            output.write_all(&line).await?;
        }
        output.flush().await?;
        anyhow::Ok(output)
    });

    let mut lookups = JoinSet::new();
    let mut raw = Vec::new();

    loop {
        raw.clear();
        if input.read_until(b'\n', &mut raw).await? == 0 {
            break;
        }

        let line = match std::str::from_utf8(&raw) {
            Ok(line) => line.trim_end_matches(['\n', '\r']),
            Err(error) => {
                warn!("Skipping line that is not valid UTF-8: {}", error);
                sender
                    .send(json!({ "ok": false, "error": format!("line is not valid UTF-8: {error}") }))
                    .ok();
                continue;
            }
        };

        let command = match parse_command(line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(error) => {
                warn!("Skipping line {:?}: {}", line, error);
                sender.send(json!({ "ok": false, "error": error.to_string() })).ok();
                continue;
            }
        };

        match command {
            Command::Get { namespace, key } => {
                let cache = registry.instance_for::<Value>(&namespace);
                let source = source.clone();
                let sender = sender.clone();
                lookups.spawn(async move {
                    let record = match source.fetch(&cache, &key).await {
                        Ok(value) => json!({
                            "namespace": namespace,
                            "key": key,
                            "ok": true,
                            "value": value,
                        }),
                        Err(error) => json!({
                            "namespace": namespace,
                            "key": key,
                            "ok": false,
                            "error": error.to_string(),
                        }),
                    };
                    sender.send(record).ok();
                });
            }
            Command::Invalidate { namespace, key } => {
                let cache = registry.instance_for::<Value>(&namespace);
                cache.invalidate(key.as_deref());
                info!(
                    "Invalidated {} in namespace '{}'",
                    key.as_deref().unwrap_or("all keys"),
                    namespace
                );
            }
            Command::Stats { namespace } => {
                let cache = registry.instance_for::<Value>(&namespace);
                sender
                    .send(json!({
                        "namespace": namespace,
                        "entries": cache.len(),
                        "pending": cache.pending_count(),
                        "stats": cache.stats(),
                    }))
                    .ok();
            }
        }
    }

    while let Some(joined) = lookups.join_next().await {
        if let Err(error) = joined {
            warn!("Lookup task failed: {}", error);
        }
    }

    drop(sender);
    writer.await?
}
