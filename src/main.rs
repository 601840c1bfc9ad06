//! fetchcache - line-oriented driver for the fetch-coalescing cache.
//!
//! Reads `get` / `invalidate` / `stats` commands from stdin and answers with
//! one JSON line per result on stdout. Logs go to stderr.

use tokio::io::BufReader;
use tracing::info;
use tracing_subscriber::EnvFilter;

use fetchcache::config::Config;
use fetchcache::driver;
use fetchcache::source::EnvelopeSource;
use fetchcache::CacheRegistry;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static ALLOC: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file first (before anything else)
    dotenvy::dotenv().ok();

    // If RUST_LOG is not set, default to "info" level for our crate
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("fetchcache=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    info!("Starting fetchcache driver...");

    let config = Config::from_env()?;
    info!("Configuration loaded successfully");
    info!("Data directory: {}", config.data_dir.display());
    info!("Fetch delay: {:?}", config.fetch_delay);

    let registry = CacheRegistry::with_config(config.cache.clone());
    let source = EnvelopeSource::new(config.data_dir.clone(), config.fetch_delay);

    let input = BufReader::new(tokio::io::stdin());
    driver::run(input, tokio::io::stdout(), &registry, &source).await?;

    info!("Input exhausted, {} namespace(s) used", registry.namespaces().len());
    Ok(())
}
