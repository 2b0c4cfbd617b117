//! Shared collaborators for the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use ouroboros_query_cache::cache::{CacheStore, MemoryStore, QueryExecutor};
use ouroboros_query_cache::{
    CacheValue, ModelRegistry, ModelSchema, QueryCacheError, QueryDescription, Result,
};
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Engine returning a fixed response and counting calls
pub struct RecordingEngine {
    response: Mutex<Option<Value>>,
    calls: AtomicUsize,
    delay: Duration,
}

impl RecordingEngine {
    pub fn returning(value: Value) -> Self {
        Self {
            response: Mutex::new(Some(value)),
            calls: AtomicUsize::new(0),
            delay: Duration::ZERO,
        }
    }

    /// Engine whose every call fails with an execution error
    pub fn failing() -> Self {
        Self {
            response: Mutex::new(None),
            calls: AtomicUsize::new(0),
            delay: Duration::ZERO,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn set_response(&self, value: Value) {
        *self.response.lock().unwrap() = Some(value);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QueryExecutor for RecordingEngine {
    async fn execute(&self, query: &QueryDescription) -> Result<CacheValue> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let response = self.response.lock().unwrap().clone();
        response.ok_or_else(|| {
            QueryCacheError::Execution(format!("engine down while running {} on {}", query.operation, query.model))
        })
    }
}

/// A recorded `set` call
#[derive(Debug, Clone, PartialEq)]
pub struct SetCall {
    pub key: String,
    pub value: Value,
    pub ttl: Duration,
}

/// Memory-backed store that records traffic and can be told to fail
#[derive(Default)]
pub struct RecordingStore {
    inner: MemoryStore,
    gets: AtomicUsize,
    sets: Mutex<Vec<SetCall>>,
    fail_reads: bool,
    fail_writes: bool,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_reads() -> Self {
        Self {
            fail_reads: true,
            ..Self::default()
        }
    }

    pub fn failing_writes() -> Self {
        Self {
            fail_writes: true,
            ..Self::default()
        }
    }

    pub fn failing_everything() -> Self {
        Self {
            fail_reads: true,
            fail_writes: true,
            ..Self::default()
        }
    }

    /// Seed an entry without counting it as traffic
    pub async fn prime(&self, key: &str, value: Value) {
        self.inner.set(key, &value, Duration::from_secs(300)).await.unwrap();
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn sets(&self) -> Vec<SetCall> {
        self.sets.lock().unwrap().clone()
    }

    pub fn total_calls(&self) -> usize {
        self.gets() + self.sets().len()
    }
}

#[async_trait]
impl CacheStore for RecordingStore {
    async fn get(&self, key: &str) -> Result<Option<CacheValue>> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads {
            return Err(QueryCacheError::cache_read(key, "connection refused"));
        }
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &CacheValue, ttl: Duration) -> Result<()> {
        self.sets.lock().unwrap().push(SetCall {
            key: key.to_string(),
            value: value.clone(),
            ttl,
        });
        if self.fail_writes {
            return Err(QueryCacheError::cache_write(key, "out of memory"));
        }
        self.inner.set(key, value, ttl).await
    }
}

/// `User` (cacheable, collection `users`), `Order` (cacheable) and `AuditLog` (not cacheable)
pub fn registry() -> Arc<ModelRegistry> {
    Arc::new(
        ModelRegistry::new()
            .with_model(ModelSchema::new("User").collection("users").cacheable(true))
            .unwrap()
            .with_model(ModelSchema::new("Order").cacheable(true))
            .unwrap()
            .with_model(ModelSchema::new("AuditLog"))
            .unwrap(),
    )
}

/// Hydrated test instance
#[derive(Debug, Clone, PartialEq)]
pub struct Hydrated {
    pub model: String,
    pub plain: Value,
}

pub fn hydrate(model: &str, plain: Value) -> Hydrated {
    Hydrated {
        model: model.to_string(),
        plain,
    }
}
