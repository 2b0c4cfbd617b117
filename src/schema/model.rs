//! Model schema as seen by the cache layer

use serde::{Deserialize, Serialize};

/// Default primary identifier field
pub const DEFAULT_ID_FIELD: &str = "_id";

/// Registration data for one model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSchema {
    /// Model name, used in general-path keys and passed to hydration
    pub name: String,
    /// Collection name, used as the prefix of point-lookup keys
    pub collection: String,
    /// Primary identifier field
    pub id_field: String,
    /// Whether point lookups on this model are cached by default
    pub cacheable: bool,
}

impl ModelSchema {
    /// Create a schema whose collection name matches the model name
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            collection: name.clone(),
            name,
            id_field: DEFAULT_ID_FIELD.to_string(),
            cacheable: false,
        }
    }

    pub fn collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    pub fn id_field(mut self, field: impl Into<String>) -> Self {
        self.id_field = field.into();
        self
    }

    /// Opt the model into default point-lookup caching
    pub fn cacheable(mut self, cacheable: bool) -> Self {
        self.cacheable = cacheable;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_defaults() {
        let schema = ModelSchema::new("User");
        assert_eq!(schema.collection, "User");
        assert_eq!(schema.id_field, "_id");
        assert!(!schema.cacheable);
    }

    #[test]
    fn test_schema_builder() {
        let schema = ModelSchema::new("User")
            .collection("users")
            .id_field("uuid")
            .cacheable(true);

        assert_eq!(schema.name, "User");
        assert_eq!(schema.collection, "users");
        assert_eq!(schema.id_field, "uuid");
        assert!(schema.cacheable);
    }
}
