use std::collections::BTreeSet;

use serde::Serialize;

use crate::error::{ModelError, Result};
use crate::mapping::MappingTable;
use crate::schema::PageSchema;

/// One page of the form with its schema and document mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogPage {
    pub name: String,
    pub title: String,
    pub category: Option<String>,
    pub schema: PageSchema,
    pub mapping: MappingTable,
}

/// Ordered, immutable set of pages making up a form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FormCatalog {
    pages: Vec<CatalogPage>,
}

impl FormCatalog {
    pub fn new(pages: Vec<CatalogPage>) -> Result<Self> {
        let mut seen = BTreeSet::new();
        for page in &pages {
            if page.name.trim().is_empty() {
                return Err(ModelError::InvalidPageName(page.name.clone()));
            }
            if !seen.insert(page.name.as_str()) {
                return Err(ModelError::DuplicatePage(page.name.clone()));
            }
        }
        Ok(Self { pages })
    }

    pub fn page(&self, name: &str) -> Option<&CatalogPage> {
        self.pages.iter().find(|page| page.name == name)
    }

    pub fn pages(&self) -> &[CatalogPage] {
        &self.pages
    }

    pub fn page_names(&self) -> impl Iterator<Item = &str> {
        self.pages.iter().map(|page| page.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}
