use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::Serialize;

use crate::ident::detransform;

/// Fixed per-page pairing of document paths and template field identifiers.
///
/// When several paths point at one identifier, reverse lookups return the
/// first pairing added.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MappingTable {
    page: String,
    by_path: IndexMap<String, String>,
    #[serde(skip)]
    by_field: BTreeMap<String, String>,
}

impl MappingTable {
    pub fn new<P, F>(page: impl Into<String>, pairs: impl IntoIterator<Item = (P, F)>) -> Self
    where
        P: Into<String>,
        F: Into<String>,
    {
        let mut table = Self {
            page: page.into(),
            by_path: IndexMap::new(),
            by_field: BTreeMap::new(),
        };
        for (path, field) in pairs {
            table.insert(path.into(), field.into());
        }
        table
    }

    fn insert(&mut self, path: String, field: String) {
        self.by_field
            .entry(field.clone())
            .or_insert_with(|| path.clone());
        self.by_path.insert(path, field);
    }

    pub fn page(&self) -> &str {
        &self.page
    }

    /// Template identifier for a document path.
    pub fn field_id(&self, path: &str) -> Option<&str> {
        self.by_path.get(path).map(String::as_str)
    }

    /// Document path for an exact identifier.
    pub fn document_path(&self, field_id: &str) -> Option<&str> {
        self.by_field.get(field_id).map(String::as_str)
    }

    /// Document path and group index for a possibly cloned identifier.
    pub fn template_path(&self, field_id: &str) -> Option<(&str, usize)> {
        let (template, index) = detransform(field_id);
        self.document_path(&template)
            .map(|path| (path, index))
            .or_else(|| self.document_path(field_id).map(|path| (path, 0)))
    }

    /// Position of `path` in the order pairings were added.
    pub fn position(&self, path: &str) -> Option<usize> {
        self.by_path.get_index_of(path)
    }

    pub fn len(&self) -> usize {
        self.by_path.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_path.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.by_path
            .iter()
            .map(|(path, field)| (path.as_str(), field.as_str()))
    }
}
