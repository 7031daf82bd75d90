//! Per-page schema: top-level fields and the dependency rule tree.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::dependency::DependencyRule;
use crate::field::{FieldDefinition, FieldKind};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSchema {
    pub page: String,
    /// Top-level fields in declaration order.
    pub fields: Vec<FieldDefinition>,
    /// Top-level rules keyed by trigger key.
    #[serde(default)]
    pub dependencies: BTreeMap<String, DependencyRule>,
}

impl PageSchema {
    pub fn new(page: impl Into<String>) -> Self {
        Self {
            page: page.into(),
            fields: Vec::new(),
            dependencies: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, field: FieldDefinition) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_rule(mut self, key: impl Into<String>, rule: DependencyRule) -> Self {
        self.dependencies.insert(key.into(), rule);
        self
    }

    /// Top-level field by template identifier.
    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Every rule in the tree with its trigger key, parents before children.
    pub fn rules(&self) -> Vec<(&str, &DependencyRule)> {
        let mut out = Vec::new();
        let mut stack: Vec<(&str, &DependencyRule)> = self
            .dependencies
            .iter()
            .rev()
            .map(|(key, rule)| (key.as_str(), rule))
            .collect();
        while let Some((key, rule)) = stack.pop() {
            out.push((key, rule));
            stack.extend(
                rule.nested
                    .iter()
                    .rev()
                    .map(|(key, rule)| (key.as_str(), rule)),
            );
        }
        out
    }

    /// Every field definition the page can ever show (top-level fields first,
    /// then rule-revealed ones), deduplicated by identifier.
    pub fn all_fields(&self) -> Vec<&FieldDefinition> {
        let mut seen = BTreeSet::new();
        let mut out = Vec::new();
        let revealed = self.rules().into_iter().flat_map(|(_, rule)| rule.shows.iter());
        for field in self.fields.iter().chain(revealed) {
            if seen.insert(field.name.as_str()) {
                out.push(field);
            }
        }
        out
    }

    /// Any known definition by template identifier, revealed fields included.
    pub fn find_field(&self, name: &str) -> Option<&FieldDefinition> {
        self.field(name).or_else(|| {
            self.rules()
                .into_iter()
                .flat_map(|(_, rule)| rule.shows.iter())
                .find(|field| field.name == name)
        })
    }

    /// Definition that owns `id` either as its identifier or as one of its
    /// choice sub-identifiers.
    pub fn field_for_choice(&self, choice_id: &str) -> Option<&FieldDefinition> {
        self.all_fields().into_iter().find(|field| match &field.kind {
            FieldKind::SingleChoice { choices } => {
                choices.values().any(|id| id == choice_id)
            }
            _ => field.name == choice_id,
        })
    }
}
