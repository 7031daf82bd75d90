#![deny(unsafe_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use form_model::ident::detransform;
use form_model::{MappingTable, PageSchema};
use indexmap::IndexMap;
use serde::Deserialize;

use crate::error::SchemaError;
use crate::raw::RawSchema;

pub fn load_schema(page: &str, path: &Path) -> Result<PageSchema, SchemaError> {
    let contents = std::fs::read_to_string(path).map_err(|e| SchemaError::io(path, e))?;
    parse_schema(page, &contents).map_err(|e| e.at_path(path))
}

pub fn load_mapping(page: &str, path: &Path) -> Result<MappingTable, SchemaError> {
    let contents = std::fs::read_to_string(path).map_err(|e| SchemaError::io(path, e))?;
    parse_mapping(page, &contents).map_err(|e| e.at_path(path))
}

/// Parse and resolve a schema document, rejecting rule cycles.
pub fn parse_schema(page: &str, contents: &str) -> Result<PageSchema, SchemaError> {
    let raw: RawSchema =
        serde_json::from_str(contents).map_err(|e| SchemaError::invalid_json(page, e))?;
    let schema = raw.resolve(page)?;
    check_cycles(&schema)?;
    tracing::debug!(
        page,
        fields = schema.fields.len(),
        rules = schema.rules().len(),
        "schema loaded"
    );
    Ok(schema)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum MappingFile {
    Wrapped { form_mapping: IndexMap<String, String> },
    Bare(IndexMap<String, String>),
}

/// Parse `{"form_mapping": {path: id}}` or a bare `{path: id}` object.
pub fn parse_mapping(page: &str, contents: &str) -> Result<MappingTable, SchemaError> {
    let file: MappingFile =
        serde_json::from_str(contents).map_err(|e| SchemaError::invalid_json(page, e))?;
    let pairs = match file {
        MappingFile::Wrapped { form_mapping } => form_mapping,
        MappingFile::Bare(pairs) => pairs,
    };
    Ok(MappingTable::new(page, pairs))
}

/// Reject schemas where revealing a field can, through any chain of rules,
/// reveal the field that triggered it.
pub fn check_cycles(schema: &PageSchema) -> Result<(), SchemaError> {
    let mut edges: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for (key, rule) in schema.rules() {
        let Some(source) = trigger_source(schema, key) else {
            continue;
        };
        edges
            .entry(source)
            .or_default()
            .extend(rule.shows.iter().map(|field| field.name.clone()));
    }

    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Active,
        Done,
    }

    let mut marks: BTreeMap<&str, Mark> = BTreeMap::new();
    for start in edges.keys() {
        if marks.contains_key(start.as_str()) {
            continue;
        }
        // (node, next child position); `path` mirrors the active nodes.
        let mut stack: Vec<(&str, usize)> = vec![(start.as_str(), 0)];
        marks.insert(start.as_str(), Mark::Active);
        while let Some((node, position)) = stack.last().copied() {
            let next = edges
                .get(node)
                .and_then(|children| children.iter().nth(position));
            let Some(child) = next else {
                marks.insert(node, Mark::Done);
                stack.pop();
                continue;
            };
            if let Some(top) = stack.last_mut() {
                top.1 += 1;
            }
            match marks.get(child.as_str()) {
                Some(Mark::Active) => {
                    let from = stack
                        .iter()
                        .position(|(name, _)| *name == child.as_str())
                        .unwrap_or(0);
                    let mut cycle: Vec<&str> = stack[from..].iter().map(|(name, _)| *name).collect();
                    cycle.push(child);
                    return Err(SchemaError::DependencyCycle {
                        page: schema.page.clone(),
                        cycle: cycle.join(" -> "),
                    });
                }
                Some(Mark::Done) => {}
                None => {
                    marks.insert(child.as_str(), Mark::Active);
                    stack.push((child.as_str(), 0));
                }
            }
        }
    }
    Ok(())
}

/// Template identifier of the field a trigger key belongs to.
fn trigger_source(schema: &PageSchema, key: &str) -> Option<String> {
    let (id, _) = key.split_once('.')?;
    let (template, _) = detransform(id);
    schema
        .field_for_choice(&template)
        .map(|field| field.name.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mapping_accepts_wrapped_and_bare_objects() {
        let wrapped = parse_mapping("p", r#"{"form_mapping": {"a.b": "tbxA"}}"#).unwrap();
        let bare = parse_mapping("p", r#"{"a.b": "tbxA"}"#).unwrap();
        assert_eq!(wrapped.field_id("a.b"), Some("tbxA"));
        assert_eq!(bare.field_id("a.b"), Some("tbxA"));
    }

    #[test]
    fn mapping_keeps_file_order() {
        let table = parse_mapping("p", r#"{"z.last": "tbxZ", "a.first": "tbxA"}"#).unwrap();
        let paths: Vec<_> = table.iter().map(|(path, _)| path).collect();
        assert_eq!(paths, ["z.last", "a.first"]);
        assert_eq!(table.position("a.first"), Some(1));
    }

    #[test]
    fn unknown_field_type_is_rejected() {
        let err = parse_schema(
            "p",
            r#"{"fields": [{"name": "x", "type": "checkbox", "value": ""}]}"#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            SchemaError::UnknownFieldKind { ref kind, .. } if kind == "checkbox"
        ));
    }
}
