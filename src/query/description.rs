//! Query description: the unit of work handed to the cached executor

use crate::error::{QueryCacheError, Result};
use crate::query::value::{Document, QueryValue};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Operation kinds understood by the cache layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operation {
    Find,
    FindOne,
    Count,
    CountDocuments,
    EstimatedDocumentCount,
    Distinct,
    FindOneAndUpdate,
    FindOneAndReplace,
    FindOneAndDelete,
    UpdateOne,
    UpdateMany,
    ReplaceOne,
    DeleteOne,
    DeleteMany,
}

impl Operation {
    /// Wire name of the operation, also used in derived keys
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Find => "find",
            Operation::FindOne => "findOne",
            Operation::Count => "count",
            Operation::CountDocuments => "countDocuments",
            Operation::EstimatedDocumentCount => "estimatedDocumentCount",
            Operation::Distinct => "distinct",
            Operation::FindOneAndUpdate => "findOneAndUpdate",
            Operation::FindOneAndReplace => "findOneAndReplace",
            Operation::FindOneAndDelete => "findOneAndDelete",
            Operation::UpdateOne => "updateOne",
            Operation::UpdateMany => "updateMany",
            Operation::ReplaceOne => "replaceOne",
            Operation::DeleteOne => "deleteOne",
            Operation::DeleteMany => "deleteMany",
        }
    }

    pub fn is_count(&self) -> bool {
        matches!(
            self,
            Operation::Count | Operation::CountDocuments | Operation::EstimatedDocumentCount
        )
    }

    /// Whether the operation mutates stored documents
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            Operation::FindOneAndUpdate
                | Operation::FindOneAndReplace
                | Operation::FindOneAndDelete
                | Operation::UpdateOne
                | Operation::UpdateMany
                | Operation::ReplaceOne
                | Operation::DeleteOne
                | Operation::DeleteMany
        )
    }

    /// Whether results are documents that can be hydrated.
    ///
    /// Counts, distinct values and write acknowledgements are scalars or
    /// summaries and always come back from the cache as-is.
    pub fn returns_documents(&self) -> bool {
        matches!(
            self,
            Operation::Find
                | Operation::FindOne
                | Operation::FindOneAndUpdate
                | Operation::FindOneAndReplace
                | Operation::FindOneAndDelete
        )
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Explicit per-query cache lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CacheTtl {
    /// Never cache this query, even if it would qualify for the default
    Disabled,
    /// Cache for the given duration
    For(Duration),
}

impl CacheTtl {
    pub fn seconds(secs: u64) -> Self {
        CacheTtl::For(Duration::from_secs(secs))
    }

    /// Effective lifetime; a zero duration means "do not cache"
    pub fn duration(&self) -> Option<Duration> {
        match self {
            CacheTtl::Disabled => None,
            CacheTtl::For(d) if d.is_zero() => None,
            CacheTtl::For(d) => Some(*d),
        }
    }
}

impl From<Duration> for CacheTtl {
    fn from(d: Duration) -> Self {
        CacheTtl::For(d)
    }
}

impl FromStr for CacheTtl {
    type Err = QueryCacheError;

    /// Accepts `"60 seconds"`, `"5m"`, `"1 hour"`, `"250ms"` or a bare number of seconds
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let split = trimmed
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(trimmed.len());
        let (digits, unit) = trimmed.split_at(split);

        let amount: u64 = digits
            .parse()
            .map_err(|_| QueryCacheError::ConfigError(format!("invalid cache TTL: {:?}", s)))?;

        let duration = match unit.trim().to_ascii_lowercase().as_str() {
            "" | "s" | "sec" | "secs" | "second" | "seconds" => Duration::from_secs(amount),
            "ms" | "msec" | "msecs" | "millisecond" | "milliseconds" => Duration::from_millis(amount),
            "m" | "min" | "mins" | "minute" | "minutes" => Duration::from_secs(amount.saturating_mul(60)),
            "h" | "hr" | "hrs" | "hour" | "hours" => Duration::from_secs(amount.saturating_mul(3600)),
            "d" | "day" | "days" => Duration::from_secs(amount.saturating_mul(86_400)),
            other => {
                return Err(QueryCacheError::ConfigError(format!(
                    "unknown cache TTL unit: {:?}",
                    other
                )))
            }
        };

        Ok(CacheTtl::For(duration))
    }
}

/// Secondary options computed by the query builder.
///
/// These shape the result just as much as the filter does and are folded
/// into the general-path key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DerivedOptions {
    /// Selected / excluded fields
    pub projection: Option<Document>,
    /// Field name for `distinct`
    pub distinct: Option<String>,
    /// Current path of a chained `where(path)` builder
    pub path: Option<String>,
    /// Builder-level options such as `populate`
    pub builder: Document,
}

/// One read or write request against a model
#[derive(Debug, Clone, PartialEq)]
pub struct QueryDescription {
    pub operation: Operation,
    pub model: String,
    pub filter: Document,
    pub update: Option<Document>,
    pub options: Document,
    pub derived: DerivedOptions,
    explicit_key: Option<String>,
    explicit_ttl: Option<CacheTtl>,
}

impl QueryDescription {
    pub fn new(operation: Operation, model: impl Into<String>) -> Self {
        Self {
            operation,
            model: model.into(),
            filter: Document::new(),
            update: None,
            options: Document::new(),
            derived: DerivedOptions::default(),
            explicit_key: None,
            explicit_ttl: None,
        }
    }

    pub fn find(model: impl Into<String>) -> Self {
        Self::new(Operation::Find, model)
    }

    pub fn find_one(model: impl Into<String>) -> Self {
        Self::new(Operation::FindOne, model)
    }

    /// Point lookup on the identifier field
    pub fn find_by_id(model: impl Into<String>, id_field: &str, id: impl Into<QueryValue>) -> Self {
        Self::find_one(model).filter(Document::new().with(id_field, id))
    }

    pub fn count_documents(model: impl Into<String>) -> Self {
        Self::new(Operation::CountDocuments, model)
    }

    pub fn distinct(model: impl Into<String>, field: impl Into<String>) -> Self {
        let mut query = Self::new(Operation::Distinct, model);
        query.derived.distinct = Some(field.into());
        query
    }

    pub fn filter(mut self, filter: Document) -> Self {
        self.filter = filter;
        self
    }

    /// Add one filter condition
    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        self.filter.insert(field, value);
        self
    }

    pub fn update(mut self, update: Document) -> Self {
        self.update = Some(update);
        self
    }

    pub fn option(mut self, name: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        self.options.insert(name, value);
        self
    }

    pub fn limit(self, n: i64) -> Self {
        self.option("limit", n)
    }

    pub fn skip(self, n: i64) -> Self {
        self.option("skip", n)
    }

    pub fn sort(self, sort: Document) -> Self {
        self.option("sort", sort)
    }

    /// Request plain documents instead of hydrated instances
    pub fn lean(self, lean: bool) -> Self {
        self.option("lean", lean)
    }

    pub fn select(mut self, projection: Document) -> Self {
        self.derived.projection = Some(projection);
        self
    }

    pub fn populate(mut self, path: impl Into<String>) -> Self {
        let path = path.into();
        let mut paths = match self.derived.builder.remove("populate") {
            Some(QueryValue::Array(items)) => items,
            _ => Vec::new(),
        };
        paths.push(QueryValue::String(path));
        self.derived.builder.insert("populate", QueryValue::Array(paths));
        self
    }

    /// Set or clear the per-query cache overrides.
    ///
    /// Passing `None` for both resets the query to the default policy.
    pub fn cache(mut self, ttl: Option<CacheTtl>, key: Option<String>) -> Self {
        self.explicit_ttl = ttl;
        self.explicit_key = key;
        self
    }

    pub fn explicit_key(&self) -> Option<&str> {
        self.explicit_key.as_deref()
    }

    pub fn explicit_ttl(&self) -> Option<CacheTtl> {
        self.explicit_ttl
    }

    /// Whether the caller asked for plain (non-hydrated) results
    pub fn is_lean(&self) -> bool {
        self.options
            .get("lean")
            .map(QueryValue::is_truthy)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_names() {
        assert_eq!(Operation::FindOne.to_string(), "findOne");
        assert_eq!(Operation::EstimatedDocumentCount.as_str(), "estimatedDocumentCount");
    }

    #[test]
    fn test_operation_shapes() {
        assert!(Operation::EstimatedDocumentCount.is_count());
        assert!(!Operation::Distinct.returns_documents());
        assert!(!Operation::UpdateMany.returns_documents());
        assert!(Operation::FindOneAndUpdate.returns_documents());
        assert!(Operation::DeleteOne.is_write());
        assert!(!Operation::Find.is_write());
    }

    #[test]
    fn test_cache_ttl_parsing() {
        assert_eq!("60 seconds".parse::<CacheTtl>().unwrap(), CacheTtl::seconds(60));
        assert_eq!("5m".parse::<CacheTtl>().unwrap(), CacheTtl::seconds(300));
        assert_eq!("1 hour".parse::<CacheTtl>().unwrap(), CacheTtl::seconds(3600));
        assert_eq!(
            "250ms".parse::<CacheTtl>().unwrap(),
            CacheTtl::For(Duration::from_millis(250))
        );
        assert_eq!("30".parse::<CacheTtl>().unwrap(), CacheTtl::seconds(30));
        assert!("soon".parse::<CacheTtl>().is_err());
        assert!("10 fortnights".parse::<CacheTtl>().is_err());
    }

    #[test]
    fn test_zero_ttl_disables_caching() {
        assert_eq!(CacheTtl::seconds(0).duration(), None);
        assert_eq!(CacheTtl::Disabled.duration(), None);
        assert_eq!(CacheTtl::seconds(5).duration(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_cache_override_chaining() {
        let query = QueryDescription::find("User")
            .where_eq("active", true)
            .cache(Some(CacheTtl::seconds(30)), Some("active-users".to_string()));

        assert_eq!(query.explicit_key(), Some("active-users"));
        assert_eq!(query.explicit_ttl(), Some(CacheTtl::seconds(30)));

        let reset = query.cache(None, None);
        assert_eq!(reset.explicit_key(), None);
        assert_eq!(reset.explicit_ttl(), None);
    }

    #[test]
    fn test_lean_flag() {
        assert!(!QueryDescription::find("User").is_lean());
        assert!(QueryDescription::find("User").lean(true).is_lean());
        assert!(!QueryDescription::find("User").lean(false).is_lean());
    }

    #[test]
    fn test_populate_accumulates() {
        let query = QueryDescription::find("Post").populate("author").populate("comments");
        assert_eq!(
            query.derived.builder.get("populate"),
            Some(&QueryValue::Array(vec!["author".into(), "comments".into()]))
        );
    }
}
