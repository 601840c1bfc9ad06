use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::Result;
use serde_json::{Value, json};
use tokio::sync::Notify;

use fetchcache::source::EnvelopeSource;
use fetchcache::{CacheRegistry, Envelope, driver};

/// Serves `{name: "Ann"}` on the first call and `{name: "Bob"}` afterwards,
/// holding each call until `gate` is released.
fn user_producer(
    calls: &Arc<AtomicUsize>,
    gate: &Arc<Notify>,
) -> impl FnOnce() -> futures::future::BoxFuture<'static, Result<Envelope<Value>>> + Send + 'static {
    let calls = Arc::clone(calls);
    let gate = Arc::clone(gate);
    move || {
        Box::pin(async move {
            let call = calls.fetch_add(1, Ordering::SeqCst);
            gate.notified().await;
            let name = if call == 0 { "Ann" } else { "Bob" };
            Ok(Envelope::ok(json!({ "name": name })))
        })
    }
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("condition was not reached in time");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_user_lookup_end_to_end() {
    let registry = CacheRegistry::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let gate = Arc::new(Notify::new());

    let first = tokio::spawn({
        let users = registry.instance_for::<Value>("user");
        let producer = user_producer(&calls, &gate);
        async move { users.get_or_fetch("42", producer).await }
    });
    let second = tokio::spawn({
        let users = registry.instance_for::<Value>("user");
        let producer = user_producer(&calls, &gate);
        async move { users.get_or_fetch("42", producer).await }
    });

    let users = registry.instance_for::<Value>("user");
    wait_until(|| {
        let stats = users.stats();
        stats.fetches == 1 && stats.coalesced == 1
    })
    .await;
    gate.notify_one();

    assert_eq!(first.await.unwrap().unwrap(), json!({ "name": "Ann" }));
    assert_eq!(second.await.unwrap().unwrap(), json!({ "name": "Ann" }));
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let third = users
        .get_or_fetch("42", user_producer(&calls, &gate))
        .await
        .unwrap();
    assert_eq!(third, json!({ "name": "Ann" }));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_namespaces_are_isolated() {
    let registry = CacheRegistry::new();
    let a = registry.instance_for::<String>("a");
    let b = registry.instance_for::<String>("b");

    let value_a = a
        .get_or_fetch("k", || async { Ok::<_, anyhow::Error>(Envelope::ok("from a".to_string())) })
        .await
        .unwrap();
    assert!(!b.contains("k"));

    let value_b = b
        .get_or_fetch("k", || async { Ok::<_, anyhow::Error>(Envelope::ok("from b".to_string())) })
        .await
        .unwrap();
    assert_eq!(value_a, "from a");
    assert_eq!(value_b, "from b");

    b.invalidate(None);
    assert!(a.contains("k"));
    assert!(!b.contains("k"));
}

#[tokio::test]
async fn test_driver_coalesces_and_invalidates() -> Result<()> {
    let dir = tempfile::tempdir()?;
    std::fs::create_dir(dir.path().join("user"))?;
    std::fs::write(
        dir.path().join("user/42.json"),
        r#"{"code": 0, "data": {"name": "Ann"}}"#,
    )?;
    std::fs::write(dir.path().join("user/7.json"), r#"{"code": 404, "msg": "gone"}"#)?;

    let registry = CacheRegistry::new();
    let source = EnvelopeSource::new(dir.path(), Duration::from_millis(50));
    let input = "\
# two lookups of the same key share one read
get user 42
get user 42
get user 7
bogus
";

    let output = driver::run(input.as_bytes(), Vec::new(), &registry, &source).await?;
    let records: Vec<Value> = String::from_utf8(output)?
        .lines()
        .map(serde_json::from_str::<Value>)
        .collect::<Result<_, _>>()?;

    assert_eq!(records.len(), 4);
    let ann: Vec<_> = records
        .iter()
        .filter(|r| r["key"] == "42")
        .collect();
    assert_eq!(ann.len(), 2);
    assert!(ann.iter().all(|r| r["value"] == json!({ "name": "Ann" })));

    let missing = records.iter().find(|r| r["key"] == "7").unwrap();
    assert_eq!(missing["ok"], false);
    assert!(missing["error"].as_str().unwrap().contains("missing its data field"));

    let users = registry.instance_for::<Value>("user");
    let stats = users.stats();
    assert_eq!(stats.fetches, 2);
    assert_eq!(stats.coalesced, 1);

    let input = "invalidate user\nstats user\n";
    let output = driver::run(input.as_bytes(), Vec::new(), &registry, &source).await?;
    let stats: Value = serde_json::from_slice(&output)?;
    assert_eq!(stats["entries"], 0);
    assert_eq!(stats["stats"]["invalidations"], 1);
    Ok(())
}

#[tokio::test]
async fn test_driver_survives_invalid_utf8_line() -> Result<()> {
    let dir = tempfile::tempdir()?;
    std::fs::create_dir(dir.path().join("user"))?;
    std::fs::write(
        dir.path().join("user/42.json"),
        r#"{"code": 0, "data": {"name": "Ann"}}"#,
    )?;

    let registry = CacheRegistry::new();
    let source = EnvelopeSource::new(dir.path(), Duration::ZERO);
    let input: &[u8] = b"get user 42\nget user \xff\xfe\nstats user\r\n";

    let output = driver::run(input, Vec::new(), &registry, &source).await?;
    let records: Vec<Value> = String::from_utf8(output)?
        .lines()
        .map(serde_json::from_str::<Value>)
        .collect::<Result<_, _>>()?;

    assert_eq!(records.len(), 3);

    let ann = records.iter().find(|r| r["key"] == "42").unwrap();
    assert_eq!(ann["value"], json!({ "name": "Ann" }));

    let rejected = records
        .iter()
        .find(|r| r["ok"] == false && r.get("key").is_none())
        .unwrap();
    assert!(rejected["error"].as_str().unwrap().contains("not valid UTF-8"));

    assert!(records.iter().any(|r| r["namespace"] == "user" && r.get("stats").is_some()));
    Ok(())
}
