//! Cached lookups against an in-process "database"
//!
//! Shows the three policies side by side:
//! - point lookups cached by default under `"{collection}:{id}"`
//! - general queries bypassing the cache until given a TTL
//! - a flaky cache store that never fails the query
//!
//! Run with `RUST_LOG=debug cargo run --example cached_lookup` to see
//! hit/miss events. `QUERY_CACHE_*` variables (or a `.env` file) tune the
//! executor configuration.

use async_trait::async_trait;
use ouroboros_query_cache::cache::{CacheStore, CachedExecutor, MemoryStore, QueryExecutor};
use ouroboros_query_cache::{
    doc, CacheTtl, CacheValue, ModelRegistry, ModelSchema, Operation, QueryCacheConfig,
    QueryCacheError, QueryDescription, QueryValue,
};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Fake engine with a fixed user table and artificial latency
struct UserTable {
    rows: Vec<serde_json::Value>,
    calls: AtomicUsize,
}

#[async_trait]
impl QueryExecutor for UserTable {
    async fn execute(&self, query: &QueryDescription) -> ouroboros_query_cache::Result<CacheValue> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(25)).await;

        let matches = |row: &serde_json::Value| {
            query.filter.iter().all(|(field, value)| match value {
                QueryValue::String(s) => row[field] == json!(s),
                QueryValue::Bool(b) => row[field] == json!(b),
                _ => false,
            })
        };

        match query.operation {
            Operation::FindOne => Ok(self.rows.iter().find(|r| matches(*r)).cloned().unwrap_or_default()),
            Operation::Find => Ok(json!(self.rows.iter().filter(|r| matches(*r)).collect::<Vec<_>>())),
            Operation::CountDocuments => Ok(json!(self.rows.iter().filter(|r| matches(*r)).count())),
            other => Err(QueryCacheError::Execution(format!("unsupported operation {}", other))),
        }
    }
}

/// Store that is down for reads and writes
struct OfflineStore;

#[async_trait]
impl CacheStore for OfflineStore {
    async fn get(&self, key: &str) -> ouroboros_query_cache::Result<Option<CacheValue>> {
        Err(QueryCacheError::cache_read(key, "connection refused"))
    }

    async fn set(&self, key: &str, _value: &CacheValue, _ttl: Duration) -> ouroboros_query_cache::Result<()> {
        Err(QueryCacheError::cache_write(key, "connection refused"))
    }
}

#[derive(Debug)]
struct User {
    id: String,
    name: String,
}

fn hydrate_user(_model: &str, plain: serde_json::Value) -> User {
    User {
        id: plain["_id"].as_str().unwrap_or_default().to_string(),
        name: plain["name"].as_str().unwrap_or_default().to_string(),
    }
}

fn user_table() -> UserTable {
    UserTable {
        rows: vec![
            json!({ "_id": "u1", "name": "Ann", "active": true }),
            json!({ "_id": "u2", "name": "Bob", "active": false }),
            json!({ "_id": "u3", "name": "Cyd", "active": true }),
        ],
        calls: AtomicUsize::new(0),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("=== Query Cache Demo ===");

    let config = QueryCacheConfig::from_env()?;
    let registry = Arc::new(
        ModelRegistry::new().with_model(ModelSchema::new("User").collection("users").cacheable(true))?,
    );

    let store = Arc::new(MemoryStore::new());
    let cached = CachedExecutor::with_config(
        user_table(),
        store.clone(),
        hydrate_user,
        registry.clone(),
        config.clone(),
    );

    info!("\n--- Point lookup (cached by default) ---");
    let by_id = QueryDescription::find_one("User").filter(doc! { "_id" => "u1" });
    for attempt in 1..=2 {
        let started = Instant::now();
        let result = cached.execute(&by_id).await?;
        info!("✓ attempt {}: {:?} in {:?}", attempt, result, started.elapsed());
    }
    info!("  key: {}", cached.cache_key(&by_id)?);

    info!("\n--- General query (bypasses cache) ---");
    let active = QueryDescription::find("User").where_eq("active", true);
    cached.execute(&active).await?;
    cached.execute(&active).await?;
    info!("  engine calls so far: {}", cached.engine().calls.load(Ordering::SeqCst));

    info!("\n--- General query with explicit TTL ---");
    let active = active.cache(Some("5 minutes".parse::<CacheTtl>()?), None);
    cached.execute(&active).await?;
    let hit = cached.execute(&active).await?;
    let names: Vec<String> = hit
        .into_instances()
        .iter()
        .map(|user| format!("{} ({})", user.name, user.id))
        .collect();
    info!("✓ hydrated from cache: {}", names.join(", "));

    info!("\n--- Count (returned raw) ---");
    let count = QueryDescription::count_documents("User")
        .where_eq("active", true)
        .cache(Some(CacheTtl::seconds(30)), Some("users:active:count".to_string()));
    cached.execute(&count).await?;
    info!("✓ cached count: {:?}", cached.execute(&count).await?);

    info!("\n--- Offline cache store ---");
    let offline = CachedExecutor::with_config(user_table(), Arc::new(OfflineStore), hydrate_user, registry, config);
    let result = offline.execute(&by_id).await?;
    info!("✓ query still answered: {:?}", result);

    info!("\n{}", cached.stats());
    info!("{}", offline.stats());
    info!("Entries in memory store: {}", store.len().await);

    Ok(())
}
