//! Model registration
//!
//! This module holds the schema data the cache layer needs about each model:
//! its name, collection, identifier field and cache eligibility.

pub mod model;
pub mod registry;

pub use model::{ModelSchema, DEFAULT_ID_FIELD};
pub use registry::ModelRegistry;
