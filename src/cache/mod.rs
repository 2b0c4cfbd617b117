//! # Query Result Caching
//!
//! Transparent caching around a query-execution engine. The caller never
//! supplies a key: one is derived from the query itself, and a TTL policy
//! decides whether the query is cached at all.
//!
//! ## Layers
//!
//! - **Key derivation** ([`key`]): explicit override, point-lookup fast path
//!   (`"{collection}:{id}"`), or a SHA-256 of the canonical query.
//! - **TTL policy** ([`ttl`]): explicit override, 60 s default for point
//!   lookups, otherwise not cached.
//! - **Cached executor** ([`executor`]): read, execute on miss, write back,
//!   hydrate on hit. Store failures are logged and swallowed.
//!
//! Writes are cached under the same rules as reads. Nothing here invalidates
//! entries when data changes; that is up to the caller.
//!
//! ## Example
//!
//! ```rust
//! use ouroboros_query_cache::cache::{executor_fn, CachedExecutor, MemoryStore, PlainHydrator};
//! use ouroboros_query_cache::query::QueryDescription;
//! use ouroboros_query_cache::schema::{ModelRegistry, ModelSchema};
//! use ouroboros_query_cache::{doc, QueryCacheError};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let registry = ModelRegistry::new()
//!     .with_model(ModelSchema::new("User").collection("users").cacheable(true))?;
//!
//! let engine = executor_fn(|_query| {
//!     Box::pin(async { Ok::<_, QueryCacheError>(json!({ "_id": "u1", "name": "ann" })) })
//! });
//!
//! let cached = CachedExecutor::new(
//!     engine,
//!     Arc::new(MemoryStore::new()),
//!     PlainHydrator,
//!     Arc::new(registry),
//! );
//!
//! let query = QueryDescription::find_one("User").filter(doc! { "_id" => "u1" });
//! let miss = cached.execute(&query).await?; // executes, stores under "users:u1"
//! let hit = cached.execute(&query).await?;  // served from the cache
//! # let _ = (miss, hit);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod entry;
pub mod executor;
pub mod key;
pub mod single_flight;
pub mod store;
pub mod ttl;
pub mod types;

pub use config::{QueryCacheConfig, QueryCacheConfigBuilder};
pub use entry::CacheEntry;
pub use executor::{executor_fn, CachedExecutor, FnExecutor, Hydrator, PlainHydrator, QueryExecutor};
pub use key::{derive_key, general_key, is_point_lookup};
pub use single_flight::SingleFlight;
pub use store::{CacheStore, MemoryStore};
pub use ttl::resolve_ttl;
pub use types::{CacheKey, CacheValue, CachedResult, QueryCacheStats};
