//! memtier demo
//!
//! Drives a small workload against the memory cache and prints the
//! resulting statistics as JSON.

use std::sync::Arc;

use anyhow::Context;
use chrono::Duration;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use memtier::{
    CachedRecord, Config, EvictionPolicy, ExpiredDecision, MemoryCache, StoragePolicy,
};

/// Logs every eviction and keeps records whose key starts with `pinned:`
/// alive past their expiration.
struct AuditPolicy;

impl EvictionPolicy for AuditPolicy {
    fn should_evict_expired(&self, key: &str, _record: &CachedRecord) -> ExpiredDecision {
        if key.starts_with("pinned:") {
            ExpiredDecision::DeferByLifetime
        } else {
            ExpiredDecision::Evict
        }
    }

    fn did_evict_lru(&self, key: &str, record: &CachedRecord) {
        info!("LRU evicted '{}' ({} bytes)", key, record.size());
    }

    fn did_evict_expired(&self, key: &str, record: &CachedRecord) {
        info!("Expired '{}' ({} bytes)", key, record.size());
    }
}

/// Entry point for the memtier demo.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Create the cache and bind the audit policy
/// 4. Run the workload and print statistics
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "memtier=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting memtier demo");

    let config = Config::from_env();
    info!(
        "Configuration loaded: memory_capacity={}, pressure_factor={}, sweep_interval={:?}",
        config.memory_capacity, config.pressure_factor, config.sweep_interval
    );

    let cache = MemoryCache::new(config).context("creating memory cache")?;
    cache.set_policy(Some(Arc::new(AuditPolicy)));

    run_workload(&cache);

    let report = cache.sweep();
    info!("Final sweep evicted {} entries", report.evicted());

    let stats = serde_json::to_string_pretty(&cache.stats()).context("serializing stats")?;
    println!("{}", stats);

    Ok(())
}

/// Fills the cache past capacity with a mix of live, expired, pinned and
/// non-storable records.
fn run_workload(cache: &MemoryCache) {
    let chunk = (cache.memory_capacity() / 8).max(1) as usize;

    for i in 0..12 {
        let record = CachedRecord::new(vec![i as u8; chunk], Duration::minutes(5));
        cache.write(record, &format!("blob:{}", i));
        if i % 3 == 0 {
            // Keep every third blob warm
            cache.read("blob:0");
        }
    }

    let stale = CachedRecord::new(vec![0u8; 16], Duration::seconds(30))
        .with_expiration(chrono::Utc::now() - Duration::seconds(1));
    cache.write(stale.clone(), "session:stale");
    cache.write(stale, "pinned:session");

    let secret = CachedRecord::new(b"do not cache".to_vec(), Duration::minutes(1))
        .with_storage_policy(StoragePolicy::NotAllowed);
    if let Err(e) = cache.try_write(secret, "secret") {
        warn!("Skipped write: {}", e);
    }
}
