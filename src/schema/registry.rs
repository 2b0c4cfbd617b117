//! Process-wide model registry
//!
//! Built once at startup, then shared read-only behind an `Arc`. Key
//! derivation and TTL policy only ever read from it.

use crate::error::{QueryCacheError, Result};
use crate::schema::model::ModelSchema;
use std::collections::HashMap;
use tracing::info;

/// Mapping of model name to its registration data
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    models: HashMap<String, ModelSchema>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a model; registering the same name twice is an error
    pub fn register(&mut self, schema: ModelSchema) -> Result<()> {
        if self.models.contains_key(&schema.name) {
            return Err(QueryCacheError::ModelAlreadyRegistered(schema.name));
        }

        info!(
            "Registered model {} (collection: {}, cacheable: {})",
            schema.name, schema.collection, schema.cacheable
        );
        self.models.insert(schema.name.clone(), schema);
        Ok(())
    }

    /// Chaining variant of [`ModelRegistry::register`]
    pub fn with_model(mut self, schema: ModelSchema) -> Result<Self> {
        self.register(schema)?;
        Ok(self)
    }

    pub fn get(&self, model: &str) -> Option<&ModelSchema> {
        self.models.get(model)
    }

    /// Unknown models are never cache-eligible
    pub fn is_cacheable(&self, model: &str) -> bool {
        self.models.get(model).map(|m| m.cacheable).unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}
