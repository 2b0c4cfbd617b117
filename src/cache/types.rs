//! Core type definitions for the query cache

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Cache key type - an opaque string
pub type CacheKey = String;

/// Plain cached value: one document, an array of documents, or a scalar
pub type CacheValue = Value;

/// Result of a cached execution
#[derive(Debug, Clone, PartialEq)]
pub enum CachedResult<T> {
    /// Engine result, or a raw-shaped cache hit, returned untouched
    Raw(Value),
    /// A single hydrated document from the cache
    One(T),
    /// Hydrated documents from the cache, in their cached order
    Many(Vec<T>),
}

impl<T> CachedResult<T> {
    pub fn is_raw(&self) -> bool {
        matches!(self, CachedResult::Raw(_))
    }

    pub fn as_raw(&self) -> Option<&Value> {
        match self {
            CachedResult::Raw(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_raw(self) -> Option<Value> {
        match self {
            CachedResult::Raw(value) => Some(value),
            _ => None,
        }
    }

    /// Hydrated instances, whether one or many
    pub fn into_instances(self) -> Vec<T> {
        match self {
            CachedResult::Raw(_) => Vec::new(),
            CachedResult::One(instance) => vec![instance],
            CachedResult::Many(instances) => instances,
        }
    }
}

/// Snapshot of cache orchestration counters
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct QueryCacheStats {
    /// Invocations answered from the cache
    pub hits: u64,

    /// Invocations that executed after a confirmed miss or read failure
    pub misses: u64,

    /// Invocations that skipped the cache entirely
    pub passthrough: u64,

    /// Isolated cache read failures
    pub read_errors: u64,

    /// Isolated cache write failures
    pub write_errors: u64,

    /// Misses served by another caller's in-flight execution
    pub coalesced: u64,
}

impl QueryCacheStats {
    /// Calculate cache hit rate as a percentage of cacheable invocations
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses + self.coalesced;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }

    /// Total isolated store failures
    pub fn store_errors(&self) -> u64 {
        self.read_errors + self.write_errors
    }
}

impl fmt::Display for QueryCacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "QueryCacheStats {{ hits: {}, misses: {}, hit_rate: {:.2}%, passthrough: {}, coalesced: {}, store_errors: {} }}",
            self.hits,
            self.misses,
            self.hit_rate(),
            self.passthrough,
            self.coalesced,
            self.store_errors()
        )
    }
}

/// Lock-free counters behind [`QueryCacheStats`]
#[derive(Debug, Default)]
pub(crate) struct StatsCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    passthrough: AtomicU64,
    read_errors: AtomicU64,
    write_errors: AtomicU64,
    coalesced: AtomicU64,
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum Counter {
    Hit,
    Miss,
    Passthrough,
    ReadError,
    WriteError,
    Coalesced,
}

impl StatsCounters {
    pub(crate) fn incr(&self, counter: Counter) {
        let cell = match counter {
            Counter::Hit => &self.hits,
            Counter::Miss => &self.misses,
            Counter::Passthrough => &self.passthrough,
            Counter::ReadError => &self.read_errors,
            Counter::WriteError => &self.write_errors,
            Counter::Coalesced => &self.coalesced,
        };
        cell.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> QueryCacheStats {
        QueryCacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            passthrough: self.passthrough.load(Ordering::Relaxed),
            read_errors: self.read_errors.load(Ordering::Relaxed),
            write_errors: self.write_errors.load(Ordering::Relaxed),
            coalesced: self.coalesced.load(Ordering::Relaxed),
        }
    }
}
