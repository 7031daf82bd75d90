//! Data model for schema-driven, multi-page government forms.
//!
//! The types here are shared by the schema loader, the document codec and the
//! resolution engine: field definitions and dependency rules (immutable after
//! load), the flat [`AnswerMap`], the nested [`Document`], per-page
//! [`MappingTable`]s and the [`FormCatalog`] that ties pages together.

pub mod answers;
pub mod catalog;
pub mod dependency;
pub mod diagnostics;
pub mod document;
pub mod error;
pub mod field;
pub mod ident;
pub mod ids;
pub mod mapping;
pub mod schema;

pub use answers::{AnswerMap, NOT_APPLICABLE, is_truthy};
pub use catalog::{CatalogPage, FormCatalog};
pub use dependency::{DependencyChain, DependencyRule};
pub use diagnostics::{DiagnosticLog, LogEntry, MemoryLog, TracingLog};
pub use document::{Document, DocumentNode, Object};
pub use error::{ModelError, Result};
pub use field::{FieldDefinition, FieldKind, NaToggle};
pub use ident::{GroupedId, detransform, is_group_eligible, transform};
pub use ids::{GroupKey, normalize_label};
pub use mapping::MappingTable;
pub use schema::PageSchema;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_rejects_duplicate_pages() {
        let page = || CatalogPage {
            name: "personal_page1".to_string(),
            title: "Personal 1".to_string(),
            category: None,
            schema: PageSchema::new("personal_page1"),
            mapping: MappingTable::new("personal_page1", Vec::<(String, String)>::new()),
        };
        let err = FormCatalog::new(vec![page(), page()]).unwrap_err();
        assert!(matches!(err, ModelError::DuplicatePage(name) if name == "personal_page1"));
    }

    #[test]
    fn field_serializes_with_kind_tag() {
        let field = FieldDefinition::new(
            "ctl00_tbxSURNAME",
            "Surnames",
            FieldKind::ShortText,
        );
        let json = serde_json::to_value(&field).expect("serialize field");
        assert_eq!(json["kind"]["kind"], "short_text");
        let round: FieldDefinition = serde_json::from_value(json).expect("deserialize field");
        assert_eq!(round, field);
    }
}
