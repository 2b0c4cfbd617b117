//! # Ouroboros Query Cache (ouroboros-query-cache)
//!
//! A transparent caching layer between code that issues document-store
//! queries and the engine that executes them.
//!
//! ## Features
//!
//! - Keys derived from the query itself, immune to field insertion order
//! - Cheap `"{collection}:{id}"` keys for point lookups
//! - 60 second default TTL for point lookups, opt-in TTL for everything else
//! - Per-query key/TTL overrides via [`QueryDescription::cache`]
//! - Cache store outages never fail a query
//! - Optional single-flight deduplication of concurrent misses
//!
//! ## Quick Start
//!
//! ```no_run
//! use ouroboros_query_cache::cache::{CachedExecutor, MemoryStore, QueryCacheConfig, QueryExecutor};
//! use ouroboros_query_cache::query::{CacheTtl, QueryDescription};
//! use ouroboros_query_cache::schema::{ModelRegistry, ModelSchema};
//! use std::sync::Arc;
//!
//! # async fn run(engine: impl QueryExecutor) -> anyhow::Result<()> {
//! let registry = ModelRegistry::new()
//!     .with_model(ModelSchema::new("User").collection("users").cacheable(true))?;
//!
//! let cached = CachedExecutor::with_config(
//!     engine,
//!     Arc::new(MemoryStore::new()),
//!     |model: &str, plain: serde_json::Value| (model.to_string(), plain),
//!     Arc::new(registry),
//!     QueryCacheConfig::from_env()?,
//! );
//!
//! // Not a point lookup: opt in explicitly
//! let active = QueryDescription::find("User")
//!     .where_eq("active", true)
//!     .cache(Some(CacheTtl::seconds(300)), None);
//!
//! let result = cached.execute(&active).await?;
//! println!("{:?} / {}", result, cached.stats());
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod error;
pub mod query;
pub mod schema;

// Re-export main types for convenience
pub use cache::{
    CacheKey, CacheStore, CacheValue, CachedExecutor, CachedResult, Hydrator, MemoryStore,
    QueryCacheConfig, QueryCacheStats, QueryExecutor,
};
pub use error::{QueryCacheError, Result};
pub use query::{CacheTtl, Document, ObjectId, Operation, QueryDescription, QueryValue};
pub use schema::{ModelRegistry, ModelSchema};
