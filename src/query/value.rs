//! Value model for filters, updates and options
//!
//! `Document` keeps insertion order the way a query builder produces it.
//! Key derivation is responsible for sorting; nothing here normalizes.

use crate::error::{QueryCacheError, Result};
use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;

/// 12-byte document identifier, rendered as 24 lowercase hex characters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId([u8; 12]);

impl ObjectId {
    /// Build an identifier from raw bytes
    pub const fn from_bytes(bytes: [u8; 12]) -> Self {
        Self(bytes)
    }

    /// Parse a 24-character hex string (either case)
    pub fn parse_str(s: &str) -> Result<Self> {
        if s.len() != 24 {
            return Err(QueryCacheError::Other(format!(
                "ObjectId must be 24 hex characters, got {}",
                s.len()
            )));
        }
        // from_str_radix alone would let a leading '+' through
        if !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(QueryCacheError::Other(format!("invalid ObjectId: {}", s)));
        }

        let mut bytes = [0u8; 12];
        for (i, chunk) in s.as_bytes().chunks(2).enumerate() {
            let pair = std::str::from_utf8(chunk)
                .map_err(|_| QueryCacheError::Other(format!("invalid ObjectId: {}", s)))?;
            bytes[i] = u8::from_str_radix(pair, 16)
                .map_err(|_| QueryCacheError::Other(format!("invalid ObjectId: {}", s)))?;
        }

        Ok(Self(bytes))
    }

    /// Raw identifier bytes
    pub fn bytes(&self) -> [u8; 12] {
        self.0
    }

    /// Lowercase hex representation
    pub fn to_hex(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl FromStr for ObjectId {
    type Err = QueryCacheError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse_str(s)
    }
}

/// A value that can appear in a filter, update or option map
#[derive(Debug, Clone, PartialEq)]
pub enum QueryValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    ObjectId(ObjectId),
    DateTime(DateTime<Utc>),
    Binary(Vec<u8>),
    Regex { pattern: String, flags: String },
    Array(Vec<QueryValue>),
    Document(Document),
}

impl QueryValue {
    /// Build a regular expression value
    pub fn regex(pattern: impl Into<String>, flags: impl Into<String>) -> Self {
        QueryValue::Regex {
            pattern: pattern.into(),
            flags: flags.into(),
        }
    }

    /// Mongo-style truthiness, used for flags such as `lean`
    pub fn is_truthy(&self) -> bool {
        match self {
            QueryValue::Null => false,
            QueryValue::Bool(b) => *b,
            QueryValue::Int(i) => *i != 0,
            QueryValue::Float(f) => *f != 0.0 && !f.is_nan(),
            QueryValue::String(s) => !s.is_empty(),
            _ => true,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            QueryValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_document(&self) -> Option<&Document> {
        match self {
            QueryValue::Document(d) => Some(d),
            _ => None,
        }
    }
}

impl From<bool> for QueryValue {
    fn from(v: bool) -> Self {
        QueryValue::Bool(v)
    }
}

impl From<i32> for QueryValue {
    fn from(v: i32) -> Self {
        QueryValue::Int(i64::from(v))
    }
}

impl From<i64> for QueryValue {
    fn from(v: i64) -> Self {
        QueryValue::Int(v)
    }
}

impl From<u32> for QueryValue {
    fn from(v: u32) -> Self {
        QueryValue::Int(i64::from(v))
    }
}

impl From<f64> for QueryValue {
    fn from(v: f64) -> Self {
        QueryValue::Float(v)
    }
}

impl From<&str> for QueryValue {
    fn from(v: &str) -> Self {
        QueryValue::String(v.to_string())
    }
}

impl From<String> for QueryValue {
    fn from(v: String) -> Self {
        QueryValue::String(v)
    }
}

impl From<ObjectId> for QueryValue {
    fn from(v: ObjectId) -> Self {
        QueryValue::ObjectId(v)
    }
}

impl From<DateTime<Utc>> for QueryValue {
    fn from(v: DateTime<Utc>) -> Self {
        QueryValue::DateTime(v)
    }
}

impl From<Document> for QueryValue {
    fn from(v: Document) -> Self {
        QueryValue::Document(v)
    }
}

impl<T: Into<QueryValue>> From<Vec<T>> for QueryValue {
    fn from(v: Vec<T>) -> Self {
        QueryValue::Array(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<QueryValue>> From<Option<T>> for QueryValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(QueryValue::Null)
    }
}

impl From<serde_json::Value> for QueryValue {
    /// Plain JSON plus the extended-JSON `{"$oid": ..}` and `{"$date": ..}` forms
    fn from(v: serde_json::Value) -> Self {
        use serde_json::Value;

        match v {
            Value::Null => QueryValue::Null,
            Value::Bool(b) => QueryValue::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => QueryValue::Int(i),
                None => QueryValue::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => QueryValue::String(s),
            Value::Array(items) => QueryValue::Array(items.into_iter().map(Into::into).collect()),
            Value::Object(map) => {
                if map.len() == 1 {
                    if let Some(Value::String(hex)) = map.get("$oid") {
                        if let Ok(oid) = ObjectId::parse_str(hex) {
                            return QueryValue::ObjectId(oid);
                        }
                    }
                    if let Some(Value::String(date)) = map.get("$date") {
                        if let Ok(dt) = DateTime::parse_from_rfc3339(date) {
                            return QueryValue::DateTime(dt.with_timezone(&Utc));
                        }
                    }
                }
                QueryValue::Document(
                    map.into_iter()
                        .map(|(k, v)| (k, QueryValue::from(v)))
                        .collect(),
                )
            }
        }
    }
}

/// Ordered field map; inserting an existing key replaces its value in place
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    entries: Vec<(String, QueryValue)>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a field, returning the previous value if the key existed
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<QueryValue>) -> Option<QueryValue> {
        let key = key.into();
        let value = value.into();

        if let Some(slot) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            return Some(std::mem::replace(&mut slot.1, value));
        }

        self.entries.push((key, value));
        None
    }

    /// Chaining variant of [`Document::insert`]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&QueryValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn remove(&mut self, key: &str) -> Option<QueryValue> {
        let pos = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(pos).1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Fields in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &QueryValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Build from a JSON object
    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        match QueryValue::from(value) {
            QueryValue::Document(doc) => Ok(doc),
            other => Err(QueryCacheError::SerializationError(format!(
                "expected a JSON object, got {:?}",
                other
            ))),
        }
    }
}

impl<K: Into<String>, V: Into<QueryValue>> FromIterator<(K, V)> for Document {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut doc = Document::new();
        for (k, v) in iter {
            doc.insert(k, v);
        }
        doc
    }
}

/// Build a [`Document`] inline: `doc! { "_id" => "abc", "active" => true }`
#[macro_export]
macro_rules! doc {
    () => {
        $crate::query::Document::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut document = $crate::query::Document::new();
        $(document.insert($key, $value);)+
        document
    }};
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_object_id_round_trip() {
        let oid = ObjectId::parse_str("507F1F77BCF86CD799439011").unwrap();
        assert_eq!(oid.to_hex(), "507f1f77bcf86cd799439011");
        assert_eq!(oid.bytes()[0], 0x50);
    }

    #[test]
    fn test_object_id_rejects_bad_input() {
        assert!(ObjectId::parse_str("abc").is_err());
        assert!(ObjectId::parse_str("zz7f1f77bcf86cd799439011").is_err());
    }

    #[test]
    fn test_object_id_rejects_signed_pairs() {
        assert!(ObjectId::parse_str("+07f1f77bcf86cd799439011").is_err());
        assert!(ObjectId::parse_str("507f1f77bcf86cd7994390+1").is_err());
        assert!("+07f1f77bcf86cd799439011".parse::<ObjectId>().is_err());
    }

    #[test]
    fn test_document_insert_replaces_in_place() {
        let mut doc = Document::new().with("a", 1).with("b", 2);
        let previous = doc.insert("a", 3);

        assert_eq!(previous, Some(QueryValue::Int(1)));
        assert_eq!(doc.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(doc.get("a"), Some(&QueryValue::Int(3)));
    }

    #[test]
    fn test_doc_macro() {
        let doc = crate::doc! { "_id" => "abc", "active" => true };
        assert_eq!(doc.len(), 2);
        assert_eq!(doc.get("_id").and_then(QueryValue::as_str), Some("abc"));
    }

    #[test]
    fn test_from_json_extended_forms() {
        let doc = Document::from_json(json!({
            "_id": { "$oid": "507f1f77bcf86cd799439011" },
            "createdAt": { "$date": "2024-01-01T00:00:00Z" },
            "tags": ["a", "b"],
            "score": 1.5
        }))
        .unwrap();

        assert!(matches!(doc.get("_id"), Some(QueryValue::ObjectId(_))));
        assert!(matches!(doc.get("createdAt"), Some(QueryValue::DateTime(_))));
        assert!(matches!(doc.get("tags"), Some(QueryValue::Array(items)) if items.len() == 2));
        assert_eq!(doc.get("score"), Some(&QueryValue::Float(1.5)));
    }

    #[test]
    fn test_from_json_requires_object() {
        assert!(Document::from_json(json!([1, 2])).is_err());
    }

    #[test]
    fn test_truthiness() {
        assert!(QueryValue::Bool(true).is_truthy());
        assert!(!QueryValue::Null.is_truthy());
        assert!(!QueryValue::Int(0).is_truthy());
        assert!(QueryValue::Document(Document::new()).is_truthy());
    }
}
