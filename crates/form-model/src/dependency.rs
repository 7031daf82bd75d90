use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::field::FieldDefinition;

/// Fields revealed by one trigger key, plus nested rules reachable from them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyRule {
    #[serde(default)]
    pub shows: Vec<FieldDefinition>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub nested: BTreeMap<String, DependencyRule>,
}

impl DependencyRule {
    pub fn new(shows: Vec<FieldDefinition>) -> Self {
        Self {
            shows,
            nested: BTreeMap::new(),
        }
    }

    pub fn with_nested(mut self, key: impl Into<String>, rule: DependencyRule) -> Self {
        self.nested.insert(key.into(), rule);
        self
    }
}

/// An active reveal: `parent` currently shows `children`.
///
/// Chains are derived from the schema and the answers; they are never stored
/// on their own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyChain {
    pub parent: String,
    pub children: Vec<FieldDefinition>,
    /// Parent field of the enclosing chain when `parent` was itself revealed.
    pub parent_chain_id: Option<String>,
}

impl DependencyChain {
    pub fn child_ids(&self) -> impl Iterator<Item = &str> {
        self.children.iter().map(|child| child.name.as_str())
    }
}
