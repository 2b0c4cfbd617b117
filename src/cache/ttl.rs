//! TTL policy
//!
//! Only point lookups are cached by default. Anything else has an unbounded
//! result shape and unknown staleness tolerance, so the caller must opt in
//! with an explicit TTL.

use crate::cache::config::QueryCacheConfig;
use crate::cache::key::is_point_lookup;
use crate::query::QueryDescription;
use crate::schema::ModelRegistry;
use std::time::Duration;

/// Resolve the cache lifetime of a query; `None` means "do not cache"
pub fn resolve_ttl(
    query: &QueryDescription,
    registry: &ModelRegistry,
    config: &QueryCacheConfig,
) -> Option<Duration> {
    if let Some(explicit) = query.explicit_ttl() {
        return explicit.duration();
    }

    if is_point_lookup(query, registry) {
        let ttl = config.point_ttl_with_jitter();
        return (!ttl.is_zero()).then_some(ttl);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc;
    use crate::query::CacheTtl;
    use crate::schema::ModelSchema;

    fn registry() -> ModelRegistry {
        ModelRegistry::new()
            .with_model(ModelSchema::new("User").cacheable(true))
            .unwrap()
    }

    #[test]
    fn test_point_lookup_defaults_to_sixty_seconds() {
        let query = QueryDescription::find_one("User").filter(doc! { "_id" => "abc123" });
        assert_eq!(
            resolve_ttl(&query, &registry(), &QueryCacheConfig::default()),
            Some(Duration::from_secs(60))
        );
    }

    #[test]
    fn test_general_query_is_not_cacheable_by_default() {
        let query = QueryDescription::find("User").filter(doc! { "active" => true });
        assert_eq!(resolve_ttl(&query, &registry(), &QueryCacheConfig::default()), None);

        let query = QueryDescription::find_one("User")
            .filter(doc! { "_id" => "abc123", "active" => true });
        assert_eq!(resolve_ttl(&query, &registry(), &QueryCacheConfig::default()), None);
    }

    #[test]
    fn test_explicit_ttl_wins() {
        let config = QueryCacheConfig::default();
        let registry = registry();

        let general = QueryDescription::find("User").cache(Some(CacheTtl::seconds(300)), None);
        assert_eq!(resolve_ttl(&general, &registry, &config), Some(Duration::from_secs(300)));

        let point = QueryDescription::find_one("User")
            .filter(doc! { "_id" => "abc123" })
            .cache(Some(CacheTtl::seconds(5)), None);
        assert_eq!(resolve_ttl(&point, &registry, &config), Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_explicit_disable_wins_over_fast_path() {
        let query = QueryDescription::find_one("User")
            .filter(doc! { "_id" => "abc123" })
            .cache(Some(CacheTtl::Disabled), None);
        assert_eq!(resolve_ttl(&query, &registry(), &QueryCacheConfig::default()), None);

        let query = QueryDescription::find_one("User")
            .filter(doc! { "_id" => "abc123" })
            .cache(Some(CacheTtl::seconds(0)), None);
        assert_eq!(resolve_ttl(&query, &registry(), &QueryCacheConfig::default()), None);
    }

    #[test]
    fn test_configured_point_ttl() {
        let config = QueryCacheConfig::builder()
            .point_lookup_ttl(Duration::from_secs(15))
            .build();
        let query = QueryDescription::find_one("User").filter(doc! { "_id" => "abc123" });
        assert_eq!(resolve_ttl(&query, &registry(), &config), Some(Duration::from_secs(15)));
    }

    #[test]
    fn test_zero_point_ttl_disables_default_caching() {
        let config = QueryCacheConfig::builder()
            .point_lookup_ttl(Duration::ZERO)
            .ttl_jitter(0.5)
            .build();
        let query = QueryDescription::find_one("User").filter(doc! { "_id" => "abc123" });
        assert_eq!(resolve_ttl(&query, &registry(), &config), None);

        let explicit = query.cache(Some(CacheTtl::seconds(10)), None);
        assert_eq!(resolve_ttl(&explicit, &registry(), &config), Some(Duration::from_secs(10)));
    }
}
