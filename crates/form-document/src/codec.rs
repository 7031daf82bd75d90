//! Mapping-table codec between documents and answer maps.
//!
//! Import flattens each page and maps every path to its field identifier,
//! moving repeated-group items to their instance index. Export runs the other
//! way: identifiers are decoded to their template, looked up in reverse and
//! reassembled into nested pages with `unflatten`.

use std::collections::{BTreeMap, BTreeSet};

use form_model::ident::{is_group_eligible, transform};
use form_model::{
    AnswerMap, CatalogPage, DiagnosticLog, Document, DocumentNode, FormCatalog, MappingTable,
    NOT_APPLICABLE, Object, is_truthy, normalize_label,
};
use indexmap::IndexMap;
use serde_json::json;

use crate::flatten::{FlatEntry, FlatMap, GroupItem, flatten, unflatten};

const SCOPE: &str = "codec";
const NA_SUFFIX: &str = "_na";

/// Answers and repeated-group arrays read from one page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportedPage {
    pub answers: AnswerMap,
    /// Normalized group key to the raw flattened items.
    pub groups: BTreeMap<String, Vec<GroupItem>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportedDocument {
    pub answers: AnswerMap,
    /// Page name to group key to items.
    pub groups: BTreeMap<String, BTreeMap<String, Vec<GroupItem>>>,
}

#[derive(Clone, Copy)]
pub struct Codec<'a> {
    log: &'a dyn DiagnosticLog,
    not_applicable: &'a str,
}

impl<'a> Codec<'a> {
    pub fn new(log: &'a dyn DiagnosticLog) -> Self {
        Self {
            log,
            not_applicable: NOT_APPLICABLE,
        }
    }

    /// Value written to a field whose not-applicable toggle is set.
    pub fn with_not_applicable(mut self, marker: &'a str) -> Self {
        self.not_applicable = marker;
        self
    }

    pub fn import_document(&self, document: &Document, catalog: &FormCatalog) -> ImportedDocument {
        let mut imported = ImportedDocument::default();
        for (name, content) in document.pages() {
            let Some(page) = catalog.page(name) else {
                self.log
                    .log(SCOPE, "skipped unknown page", Some(&json!({ "page": name })));
                continue;
            };
            let DocumentNode::Object(content) = content else {
                self.log.log(
                    SCOPE,
                    "skipped page that is not a mapping",
                    Some(&json!({ "page": name })),
                );
                continue;
            };
            let page_import = self.import_page(content, &page.mapping);
            imported.answers.extend(page_import.answers);
            if !page_import.groups.is_empty() {
                imported.groups.insert(name.to_string(), page_import.groups);
            }
        }
        tracing::debug!(
            pages = document.len(),
            answers = imported.answers.len(),
            "document imported"
        );
        imported
    }

    pub fn import_page(&self, content: &Object, mapping: &MappingTable) -> ImportedPage {
        let flat = flatten(content, self.log);
        let mut imported = ImportedPage::default();
        let mut forced = Vec::new();

        for (path, entry) in &flat {
            match entry {
                FlatEntry::Scalar(value) => {
                    forced.extend(self.import_value(mapping, path, value, 0, &mut imported.answers));
                }
                FlatEntry::Empty => {}
                FlatEntry::Group { items, .. } => {
                    for (index, item) in items.iter().enumerate() {
                        for (item_path, value) in item {
                            forced.extend(self.import_value(
                                mapping,
                                item_path,
                                value,
                                index,
                                &mut imported.answers,
                            ));
                        }
                    }
                    imported.groups.insert(normalize_label(path), items.clone());
                }
            }
        }

        for id in forced {
            imported.answers.set(id, self.not_applicable);
        }
        imported
    }

    /// Store one value; returns the data identifier a set toggle overrides.
    fn import_value(
        &self,
        mapping: &MappingTable,
        path: &str,
        value: &str,
        index: usize,
        answers: &mut AnswerMap,
    ) -> Option<String> {
        let Some(template) = mapping.field_id(path) else {
            self.log.log(
                SCOPE,
                "no mapping for path",
                Some(&json!({ "page": mapping.page(), "path": path })),
            );
            return None;
        };
        let id = transform(template, index);

        let Some(base) = path.strip_suffix(NA_SUFFIX) else {
            answers.set(id, value);
            return None;
        };
        let toggled = is_truthy(value);
        answers.set(id, if toggled { "true" } else { "false" });
        if !toggled {
            return None;
        }
        mapping.field_id(base).map(|main| transform(main, index))
    }

    /// Export every page with at least one mapped answer, in catalog order.
    pub fn export_document(&self, answers: &AnswerMap, catalog: &FormCatalog) -> Document {
        let mut document = Document::new();
        for page in catalog.pages() {
            if let Some(content) = self.export_page(answers, page) {
                document.insert_page(page.name.clone(), DocumentNode::Object(content));
            }
        }

        for (id, _) in answers.iter() {
            let mapped = catalog
                .pages()
                .iter()
                .any(|page| page.mapping.template_path(id).is_some());
            if !mapped {
                self.log
                    .log(SCOPE, "no mapping for identifier", Some(&json!({ "id": id })));
            }
        }
        document
    }

    pub fn export_page(&self, answers: &AnswerMap, page: &CatalogPage) -> Option<Object> {
        let mapping = &page.mapping;
        let mut roots: BTreeSet<&str> = page
            .schema
            .all_fields()
            .into_iter()
            .filter(|field| field.repeatable)
            .filter_map(|field| mapping.document_path(&field.name))
            .filter_map(group_root)
            .collect();

        let mut located = Vec::new();
        for (id, value) in answers.iter() {
            let Some((path, index)) = mapping.template_path(id) else {
                continue;
            };
            if index > 0
                && let Some(root) = group_root(path)
            {
                roots.insert(root);
            }
            located.push((id, path, index, value));
        }
        if located.is_empty() {
            return None;
        }
        located.sort_by_key(|&(_, path, index, _)| (mapping.position(path), index));

        // First key of each flat entry, in mapping order.
        let mut order: Vec<&str> = Vec::new();
        let mut scalars = GroupItem::new();
        let mut groups: IndexMap<&str, BTreeMap<usize, GroupItem>> = IndexMap::new();
        for (id, path, index, value) in located {
            match group_root(path) {
                Some(root) if is_group_eligible(id) && roots.contains(root) => {
                    if !groups.contains_key(root) {
                        order.push(root);
                    }
                    groups
                        .entry(root)
                        .or_default()
                        .entry(index)
                        .or_default()
                        .insert(path.to_string(), value.to_string());
                }
                _ if index > 0 => self.log.log(
                    SCOPE,
                    "dropped group answer without a group path",
                    Some(&json!({ "page": page.name, "id": id })),
                ),
                _ => {
                    order.push(path);
                    scalars.insert(path.to_string(), value.to_string());
                }
            }
        }

        self.force_not_applicable(mapping, &mut scalars);
        let mut flat = FlatMap::new();
        for key in order {
            if let Some(instances) = groups.shift_remove(key) {
                let mut items: Vec<GroupItem> = instances.into_values().collect();
                for item in &mut items {
                    self.force_not_applicable(mapping, item);
                }
                flat.insert(key.to_string(), FlatEntry::group(items));
            } else if let Some(value) = scalars.shift_remove(key) {
                flat.insert(key.to_string(), FlatEntry::Scalar(value));
            }
        }
        // Overrides for toggles whose field had no answer.
        flat.extend(
            scalars
                .into_iter()
                .map(|(path, value)| (path, FlatEntry::Scalar(value))),
        );
        Some(unflatten(&flat, self.log))
    }

    fn force_not_applicable(&self, mapping: &MappingTable, values: &mut GroupItem) {
        let toggled: Vec<String> = values
            .iter()
            .filter(|(_, value)| is_truthy(value))
            .filter_map(|(path, _)| path.strip_suffix(NA_SUFFIX))
            .filter(|base| mapping.field_id(base).is_some())
            .map(str::to_string)
            .collect();
        for base in toggled {
            values.insert(base, self.not_applicable.to_string());
        }
    }
}

fn group_root(path: &str) -> Option<&str> {
    path.split_once('.').map(|(root, _)| root)
}
