//! Cache key derivation
//!
//! Three sources, in priority order:
//! 1. the caller's explicit key, returned verbatim;
//! 2. the point-lookup fast path, `"{collection}:{id}"`;
//! 3. a SHA-256 over a framed canonical form of the whole query.
//!
//! The canonical form sorts document keys at every nesting level, so filters
//! and options built in a different insertion order hash identically.

use crate::cache::types::CacheKey;
use crate::error::{QueryCacheError, Result};
use crate::query::{Document, Operation, QueryDescription, QueryValue};
use crate::schema::ModelRegistry;
use sha2::{Digest, Sha256};
use std::fmt::Write;

/// Domain separator; bump if the canonical envelope changes incompatibly
const KEY_DOMAIN_TAG: &[u8] = b"ouroboros:query-cache-key:v1";

/// Deeper documents are rejected rather than recursed into
pub const MAX_CANONICAL_DEPTH: usize = 64;

const FRAME_MODEL: &[u8] = b"model";
const FRAME_OPERATION: &[u8] = b"op";
const FRAME_FILTER: &[u8] = b"filter";
const FRAME_UPDATE: &[u8] = b"update";
const FRAME_OPTIONS: &[u8] = b"options";
const FRAME_PROJECTION: &[u8] = b"projection";
const FRAME_DISTINCT: &[u8] = b"distinct";
const FRAME_PATH: &[u8] = b"path";
const FRAME_BUILDER: &[u8] = b"builder";

/// Derive the cache key for a query
pub fn derive_key(query: &QueryDescription, registry: &ModelRegistry) -> Result<CacheKey> {
    if let Some(key) = query.explicit_key() {
        return Ok(key.to_string());
    }

    if let Some(key) = fast_path_key(query, registry) {
        return Ok(key);
    }

    general_key(query)
}

/// Identifier value of a point lookup, if the query qualifies for the fast path.
///
/// Requires `findOne`, a cache-eligible model, and a filter made of exactly
/// one field (the model's id field) holding a non-empty string or ObjectId.
pub(crate) fn point_lookup_id(query: &QueryDescription, registry: &ModelRegistry) -> Option<String> {
    if query.operation != Operation::FindOne {
        return None;
    }

    let schema = registry.get(&query.model).filter(|s| s.cacheable)?;

    if query.filter.len() != 1 {
        return None;
    }

    match query.filter.get(&schema.id_field)? {
        QueryValue::String(id) if !id.is_empty() => Some(id.clone()),
        QueryValue::ObjectId(oid) => Some(oid.to_hex()),
        _ => None,
    }
}

/// Whether the query takes the point-lookup fast path
pub fn is_point_lookup(query: &QueryDescription, registry: &ModelRegistry) -> bool {
    point_lookup_id(query, registry).is_some()
}

fn fast_path_key(query: &QueryDescription, registry: &ModelRegistry) -> Option<CacheKey> {
    let id = point_lookup_id(query, registry)?;
    let schema = registry.get(&query.model)?;
    Some(format!("{}:{}", schema.collection, id))
}

/// General-path key: hex SHA-256 of the framed canonical query
pub fn general_key(query: &QueryDescription) -> Result<CacheKey> {
    let to_key_error = |reason: String| QueryCacheError::KeyDerivation {
        model: query.model.clone(),
        reason,
    };

    let mut hasher = Sha256::new();
    hasher.update(KEY_DOMAIN_TAG);

    write_framed(&mut hasher, FRAME_MODEL, query.model.as_bytes());
    write_framed(&mut hasher, FRAME_OPERATION, query.operation.as_str().as_bytes());

    let filter = canonical_document(&query.filter).map_err(to_key_error)?;
    write_framed(&mut hasher, FRAME_FILTER, filter.as_bytes());

    let update = match &query.update {
        Some(update) => canonical_document(update).map_err(to_key_error)?,
        None => "null".to_string(),
    };
    write_framed(&mut hasher, FRAME_UPDATE, update.as_bytes());

    let options = canonical_document(&query.options).map_err(to_key_error)?;
    write_framed(&mut hasher, FRAME_OPTIONS, options.as_bytes());

    let projection = match &query.derived.projection {
        Some(projection) => canonical_document(projection).map_err(to_key_error)?,
        None => "null".to_string(),
    };
    write_framed(&mut hasher, FRAME_PROJECTION, projection.as_bytes());

    write_framed(&mut hasher, FRAME_DISTINCT, optional_text(&query.derived.distinct).as_bytes());
    write_framed(&mut hasher, FRAME_PATH, optional_text(&query.derived.path).as_bytes());

    let builder = canonical_document(&query.derived.builder).map_err(to_key_error)?;
    write_framed(&mut hasher, FRAME_BUILDER, builder.as_bytes());

    let digest = hasher.finalize();
    let mut key = String::with_capacity(digest.len() * 2);
    for byte in digest.iter() {
        let _ = write!(key, "{:02x}", byte);
    }
    Ok(key)
}

/// Canonical text of a document with keys sorted at every level
pub fn canonical_document(doc: &Document) -> std::result::Result<String, String> {
    let mut out = String::new();
    write_document(doc, &mut out, 0)?;
    Ok(out)
}

/// Canonical text of a single value
pub fn canonical_value(value: &QueryValue) -> std::result::Result<String, String> {
    let mut out = String::new();
    write_value(value, &mut out, 0)?;
    Ok(out)
}

fn optional_text(value: &Option<String>) -> String {
    match value {
        Some(text) => quoted(text),
        None => "null".to_string(),
    }
}

fn quoted(text: &str) -> String {
    // A JSON string literal is an unambiguous escaping of arbitrary text
    serde_json::Value::String(text.to_string()).to_string()
}

fn write_document(doc: &Document, out: &mut String, depth: usize) -> std::result::Result<(), String> {
    if depth > MAX_CANONICAL_DEPTH {
        return Err(format!("document nesting exceeds {} levels", MAX_CANONICAL_DEPTH));
    }

    let mut fields: Vec<(&str, &QueryValue)> = doc.iter().collect();
    fields.sort_by(|a, b| a.0.cmp(b.0));

    out.push('{');
    for (i, (key, value)) in fields.into_iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&quoted(key));
        out.push(':');
        write_value(value, out, depth + 1)?;
    }
    out.push('}');
    Ok(())
}

fn write_value(value: &QueryValue, out: &mut String, depth: usize) -> std::result::Result<(), String> {
    if depth > MAX_CANONICAL_DEPTH {
        return Err(format!("document nesting exceeds {} levels", MAX_CANONICAL_DEPTH));
    }

    match value {
        QueryValue::Null => out.push_str("null"),
        QueryValue::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        QueryValue::Int(i) => {
            let _ = write!(out, "{}", i);
        }
        QueryValue::Float(f) => {
            if !f.is_finite() {
                return Err(format!("non-finite float {} cannot be canonicalized", f));
            }
            // Debug keeps the fractional part, so 1.0 never collides with 1
            let normalized = if *f == 0.0 { 0.0 } else { *f };
            let _ = write!(out, "{:?}", normalized);
        }
        QueryValue::String(s) => out.push_str(&quoted(s)),
        QueryValue::ObjectId(oid) => {
            let _ = write!(out, "ObjectId(\"{}\")", oid);
        }
        QueryValue::DateTime(dt) => {
            let _ = write!(
                out,
                "Date(\"{}\")",
                dt.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
            );
        }
        QueryValue::Binary(bytes) => {
            out.push_str("Binary(\"");
            for byte in bytes {
                let _ = write!(out, "{:02x}", byte);
            }
            out.push_str("\")");
        }
        QueryValue::Regex { pattern, flags } => {
            let mut sorted_flags: Vec<char> = flags.chars().collect();
            sorted_flags.sort_unstable();
            sorted_flags.dedup();
            let flags: String = sorted_flags.into_iter().collect();
            let _ = write!(out, "Regex({},{})", quoted(pattern), quoted(&flags));
        }
        QueryValue::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(item, out, depth + 1)?;
            }
            out.push(']');
        }
        QueryValue::Document(doc) => write_document(doc, out, depth)?,
    }

    Ok(())
}

fn write_framed(hasher: &mut Sha256, label: &[u8], bytes: &[u8]) {
    let label_len = u32::try_from(label.len()).unwrap_or(u32::MAX);
    hasher.update(label_len.to_be_bytes());
    hasher.update(label);

    let bytes_len = u64::try_from(bytes.len()).unwrap_or(u64::MAX);
    hasher.update(bytes_len.to_be_bytes());
    hasher.update(bytes);
}
