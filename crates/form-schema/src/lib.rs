#![deny(unsafe_code)]

pub mod error;
pub mod hash;
pub mod loaders;
pub mod manifest;
pub mod raw;
pub mod registry;

pub use crate::error::SchemaError;
pub use crate::loaders::{load_mapping, load_schema, parse_mapping, parse_schema};
pub use crate::registry::{CatalogSummary, verify_and_load};
