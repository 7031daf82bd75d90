//! Conversion between nested form documents and flat answer maps.

pub mod codec;
pub mod counts;
pub mod error;
pub mod flatten;
pub mod yaml;

pub use codec::{Codec, ImportedDocument, ImportedPage};
pub use counts::{FieldCounts, count_fields_by_page};
pub use error::DocumentError;
pub use flatten::{FlatEntry, FlatMap, GroupItem, flatten, unflatten};
pub use yaml::{parse_document, read_document, to_yaml_string, write_document};
