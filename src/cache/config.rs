//! Configuration for the query cache

use crate::error::{QueryCacheError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Environment variable holding the point-lookup TTL in seconds
pub const ENV_POINT_TTL_SECS: &str = "QUERY_CACHE_POINT_TTL_SECS";
/// Environment variable holding the TTL jitter factor
pub const ENV_TTL_JITTER: &str = "QUERY_CACHE_TTL_JITTER";
/// Environment variable enabling single-flight deduplication
pub const ENV_SINGLE_FLIGHT: &str = "QUERY_CACHE_SINGLE_FLIGHT";
/// Environment variable enabling metrics collection
pub const ENV_ENABLE_METRICS: &str = "QUERY_CACHE_ENABLE_METRICS";

/// Configuration for the cached executor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryCacheConfig {
    /// Lifetime of point lookups that carry no explicit TTL
    pub point_lookup_ttl: Duration,

    /// TTL jitter factor (0.0 - 1.0) applied to the point-lookup TTL.
    /// Spreads expiry of keys written together.
    pub ttl_jitter: f64,

    /// Collapse concurrent misses on the same key into one execution
    pub single_flight: bool,

    /// Enable hit/miss counters
    pub enable_metrics: bool,
}

impl Default for QueryCacheConfig {
    fn default() -> Self {
        Self {
            point_lookup_ttl: Duration::from_secs(60),
            ttl_jitter: 0.0,
            single_flight: false,
            enable_metrics: true,
        }
    }
}

impl QueryCacheConfig {
    /// Create a new builder for cache configuration
    pub fn builder() -> QueryCacheConfigBuilder {
        QueryCacheConfigBuilder::default()
    }

    /// Load from the process environment, reading a `.env` file first if present.
    ///
    /// Unset variables keep their defaults; malformed ones are an error.
    pub fn from_env() -> Result<Self> {
        let _ = dotenv::dotenv();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = Self::builder();

        if let Some(raw) = lookup(ENV_POINT_TTL_SECS) {
            let secs: u64 = raw.trim().parse().map_err(|_| {
                QueryCacheError::ConfigError(format!("{} must be an integer, got {:?}", ENV_POINT_TTL_SECS, raw))
            })?;
            builder = builder.point_lookup_ttl(Duration::from_secs(secs));
        }

        if let Some(raw) = lookup(ENV_TTL_JITTER) {
            let jitter: f64 = raw.trim().parse().map_err(|_| {
                QueryCacheError::ConfigError(format!("{} must be a number, got {:?}", ENV_TTL_JITTER, raw))
            })?;
            builder = builder.ttl_jitter(jitter);
        }

        if let Some(raw) = lookup(ENV_SINGLE_FLIGHT) {
            builder = builder.single_flight(parse_flag(ENV_SINGLE_FLIGHT, &raw)?);
        }

        if let Some(raw) = lookup(ENV_ENABLE_METRICS) {
            builder = builder.enable_metrics(parse_flag(ENV_ENABLE_METRICS, &raw)?);
        }

        let config = builder.build();
        config.validate()?;
        debug!("Loaded query cache config: {:?}", config);
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.point_lookup_ttl.is_zero() {
            return Err(QueryCacheError::ConfigError(
                "point_lookup_ttl must be greater than 0".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.ttl_jitter) {
            return Err(QueryCacheError::ConfigError(
                "ttl_jitter must be between 0.0 and 1.0".to_string(),
            ));
        }

        Ok(())
    }

    /// Point-lookup TTL with jitter applied
    pub fn point_ttl_with_jitter(&self) -> Duration {
        // Unvalidated configs still get a usable lifetime
        let ratio = if self.ttl_jitter.is_finite() {
            self.ttl_jitter.clamp(0.0, 1.0)
        } else {
            0.0
        };
        if ratio == 0.0 || self.point_lookup_ttl.is_zero() {
            return self.point_lookup_ttl;
        }

        let base_secs = self.point_lookup_ttl.as_secs_f64();
        let jitter_range = base_secs * ratio;
        let jitter = (rand::random::<f64>() * 2.0 - 1.0) * jitter_range;
        let final_secs = (base_secs + jitter).max(1.0);

        Duration::from_secs_f64(final_secs)
    }
}

fn parse_flag(name: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(QueryCacheError::ConfigError(format!(
            "{} must be a boolean, got {:?}",
            name, raw
        ))),
    }
}

/// Builder for query cache configuration
#[derive(Debug, Default)]
pub struct QueryCacheConfigBuilder {
    point_lookup_ttl: Option<Duration>,
    ttl_jitter: Option<f64>,
    single_flight: Option<bool>,
    enable_metrics: Option<bool>,
}

impl QueryCacheConfigBuilder {
    /// Set the default TTL for point lookups
    pub fn point_lookup_ttl(mut self, ttl: Duration) -> Self {
        self.point_lookup_ttl = Some(ttl);
        self
    }

    /// Set TTL jitter factor (0.0 - 1.0)
    pub fn ttl_jitter(mut self, jitter: f64) -> Self {
        self.ttl_jitter = Some(jitter);
        self
    }

    /// Enable or disable single-flight deduplication
    pub fn single_flight(mut self, enable: bool) -> Self {
        self.single_flight = Some(enable);
        self
    }

    /// Enable or disable metrics collection
    pub fn enable_metrics(mut self, enable: bool) -> Self {
        self.enable_metrics = Some(enable);
        self
    }

    /// Build the cache configuration
    pub fn build(self) -> QueryCacheConfig {
        let defaults = QueryCacheConfig::default();

        QueryCacheConfig {
            point_lookup_ttl: self.point_lookup_ttl.unwrap_or(defaults.point_lookup_ttl),
            ttl_jitter: self.ttl_jitter.unwrap_or(defaults.ttl_jitter),
            single_flight: self.single_flight.unwrap_or(defaults.single_flight),
            enable_metrics: self.enable_metrics.unwrap_or(defaults.enable_metrics),
        }
    }
}

/// Preset configurations
impl QueryCacheConfig {
    /// Read-heavy services: dedupe concurrent misses and spread expiry
    pub fn high_traffic() -> Self {
        Self {
            ttl_jitter: 0.10,
            single_flight: true,
            ..Default::default()
        }
    }

    /// Deterministic settings for tests
    pub fn testing() -> Self {
        Self {
            ttl_jitter: 0.0,
            single_flight: false,
            ..Default::default()
        }
    }
}
