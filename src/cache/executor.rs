//! Cached execution
//!
//! [`CachedExecutor`] wraps an execution engine. Per invocation it runs
//! exactly one of two paths:
//!
//! - passthrough: the TTL policy says "do not cache", the engine is called
//!   once and no store call is made;
//! - cached: read the store, then either hydrate the hit or execute, write
//!   back best-effort, and return the raw engine result.
//!
//! Store failures never reach the caller. Engine failures always do, unchanged.
//!
//! Every value the store returns is a hit, falsy ones included: a cached `0`
//! count or `false` is served as is. In particular a `findOne` by id that
//! matched nothing caches `null`, and that negative result is served for the
//! full point-lookup TTL (60 s by default) even if the document is created
//! in the meantime. Give the query `CacheTtl::Disabled` where that matters.

use crate::cache::{
    config::QueryCacheConfig,
    key::derive_key,
    single_flight::SingleFlight,
    store::CacheStore,
    ttl::resolve_ttl,
    types::{CacheKey, CacheValue, CachedResult, Counter, QueryCacheStats, StatsCounters},
};
use crate::error::Result;
use crate::query::QueryDescription;
use crate::schema::ModelRegistry;
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// The underlying query-execution engine
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Execute a query against storage and return its plain result
    async fn execute(&self, query: &QueryDescription) -> Result<CacheValue>;
}

#[async_trait]
impl<E: QueryExecutor + ?Sized> QueryExecutor for Arc<E> {
    async fn execute(&self, query: &QueryDescription) -> Result<CacheValue> {
        (**self).execute(query).await
    }
}

/// Engine backed by a closure, see [`executor_fn`]
pub struct FnExecutor<F>(F);

/// Adapt a closure returning a boxed future into a [`QueryExecutor`]
///
/// ```
/// use ouroboros_query_cache::cache::executor_fn;
/// use serde_json::json;
///
/// let engine = executor_fn(|query| {
///     let model = query.model.clone();
///     Box::pin(async move { Ok::<_, ouroboros_query_cache::QueryCacheError>(json!({ "model": model })) })
/// });
/// # let _ = engine;
/// ```
pub fn executor_fn<F>(f: F) -> FnExecutor<F>
where
    F: for<'a> Fn(&'a QueryDescription) -> BoxFuture<'a, Result<CacheValue>> + Send + Sync,
{
    FnExecutor(f)
}

#[async_trait]
impl<F> QueryExecutor for FnExecutor<F>
where
    F: for<'a> Fn(&'a QueryDescription) -> BoxFuture<'a, Result<CacheValue>> + Send + Sync,
{
    async fn execute(&self, query: &QueryDescription) -> Result<CacheValue> {
        (self.0)(query).await
    }
}

/// Turns a plain cached document back into a domain instance
pub trait Hydrator: Send + Sync {
    type Instance: Send;

    fn hydrate(&self, model: &str, plain: CacheValue) -> Self::Instance;
}

impl<F, T> Hydrator for F
where
    F: Fn(&str, CacheValue) -> T + Send + Sync,
    T: Send,
{
    type Instance = T;

    fn hydrate(&self, model: &str, plain: CacheValue) -> T {
        self(model, plain)
    }
}

/// Hydrator that leaves documents as plain JSON
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainHydrator;

impl Hydrator for PlainHydrator {
    type Instance = CacheValue;

    fn hydrate(&self, _model: &str, plain: CacheValue) -> CacheValue {
        plain
    }
}

/// Caching decorator around a [`QueryExecutor`]
pub struct CachedExecutor<E, H> {
    engine: E,
    store: Arc<dyn CacheStore>,
    hydrator: H,
    registry: Arc<ModelRegistry>,
    config: QueryCacheConfig,
    single_flight: Option<SingleFlight>,
    stats: StatsCounters,
}

impl<E, H> CachedExecutor<E, H>
where
    E: QueryExecutor,
    H: Hydrator,
{
    /// Create a cached executor with the default configuration
    pub fn new(engine: E, store: Arc<dyn CacheStore>, hydrator: H, registry: Arc<ModelRegistry>) -> Self {
        Self::with_config(engine, store, hydrator, registry, QueryCacheConfig::default())
    }

    pub fn with_config(
        engine: E,
        store: Arc<dyn CacheStore>,
        hydrator: H,
        registry: Arc<ModelRegistry>,
        config: QueryCacheConfig,
    ) -> Self {
        info!(
            "Initializing cached executor (models: {}, point TTL: {:?}, single-flight: {})",
            registry.len(),
            config.point_lookup_ttl,
            config.single_flight
        );

        let single_flight = config.single_flight.then(SingleFlight::new);

        Self {
            engine,
            store,
            hydrator,
            registry,
            config,
            single_flight,
            stats: StatsCounters::default(),
        }
    }

    /// The wrapped engine
    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn config(&self) -> &QueryCacheConfig {
        &self.config
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// Snapshot of hit/miss counters
    pub fn stats(&self) -> QueryCacheStats {
        self.stats.snapshot()
    }

    /// Cache key this executor would use for `query`
    pub fn cache_key(&self, query: &QueryDescription) -> Result<CacheKey> {
        derive_key(query, &self.registry)
    }

    /// Cache lifetime this executor would use for `query`
    pub fn cache_ttl(&self, query: &QueryDescription) -> Option<Duration> {
        resolve_ttl(query, &self.registry, &self.config)
    }

    /// Execute `query`, consulting and populating the cache when policy allows
    pub async fn execute(&self, query: &QueryDescription) -> Result<CachedResult<H::Instance>> {
        let Some(ttl) = self.cache_ttl(query) else {
            debug!("Cache bypass for {} {}", query.operation, query.model);
            self.count(Counter::Passthrough);
            return self.engine.execute(query).await.map(CachedResult::Raw);
        };

        let key = self.cache_key(query)?;

        match self.store.get(&key).await {
            Ok(Some(cached)) => {
                debug!("Cache hit: {}", key);
                self.count(Counter::Hit);
                return Ok(self.rehydrate(query, cached));
            }
            Ok(None) => {
                debug!("Cache miss: {}", key);
            }
            Err(e) => {
                warn!("Cache read failed for {}, executing instead: {}", key, e);
                self.count(Counter::ReadError);
            }
        }

        let raw = match &self.single_flight {
            Some(flight) => {
                let outcome = flight
                    .run(&key, || self.execute_and_store(query, &key, ttl))
                    .await;
                if outcome.coalesced {
                    self.count(Counter::Coalesced);
                }
                outcome.result?
            }
            None => self.execute_and_store(query, &key, ttl).await?,
        };

        Ok(CachedResult::Raw(raw))
    }

    async fn execute_and_store(&self, query: &QueryDescription, key: &str, ttl: Duration) -> Result<CacheValue> {
        self.count(Counter::Miss);
        let result = self.engine.execute(query).await?;

        match self.store.set(key, &result, ttl).await {
            Ok(()) => debug!("Cached {} for {:?}", key, ttl),
            Err(e) => {
                warn!("Cache write failed for {}: {}", key, e);
                self.count(Counter::WriteError);
            }
        }

        Ok(result)
    }

    /// Raw-shaped hits come back untouched; documents are hydrated in order
    fn rehydrate(&self, query: &QueryDescription, cached: CacheValue) -> CachedResult<H::Instance> {
        if !query.operation.returns_documents() || query.is_lean() || cached.is_null() {
            return CachedResult::Raw(cached);
        }

        match cached {
            CacheValue::Array(items) => CachedResult::Many(
                items
                    .into_iter()
                    .map(|item| self.hydrator.hydrate(&query.model, item))
                    .collect(),
            ),
            single => CachedResult::One(self.hydrator.hydrate(&query.model, single)),
        }
    }

    fn count(&self, counter: Counter) {
        if self.config.enable_metrics {
            self.stats.incr(counter);
        }
    }
}
