//! Query descriptions and the value model they are built from

pub mod description;
pub mod value;

pub use description::{CacheTtl, DerivedOptions, Operation, QueryDescription};
pub use value::{Document, ObjectId, QueryValue};
