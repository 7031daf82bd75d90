//! Field definitions as resolved from the raw schema.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ident::transform;
use crate::ids::normalize_label;

/// Input kind of a field, resolved once at schema load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldKind {
    ShortText,
    LongText,
    /// Radio-style choice; every choice value owns a sub-identifier.
    SingleChoice { choices: BTreeMap<String, String> },
    /// Dropdown-style choice over a fixed option list.
    EnumeratedChoice { options: Vec<String> },
}

impl FieldKind {
    pub fn is_choice(&self) -> bool {
        matches!(
            self,
            FieldKind::SingleChoice { .. } | FieldKind::EnumeratedChoice { .. }
        )
    }
}

/// "Does not apply" checkbox paired with a field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NaToggle {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// A single form field. Immutable once the schema is loaded; group clones are
/// produced with [`FieldDefinition::for_group`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDefinition {
    /// Identifier (the template identifier for index 0).
    pub name: String,
    pub prompt: String,
    pub kind: FieldKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub na_toggle: Option<NaToggle>,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub repeatable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help_text: Option<String>,
}

impl FieldDefinition {
    pub fn new(name: impl Into<String>, prompt: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            prompt: prompt.into(),
            kind,
            parent_label: None,
            max_length: None,
            na_toggle: None,
            optional: false,
            repeatable: false,
            help_text: None,
        }
    }

    pub fn with_parent_label(mut self, label: impl Into<String>) -> Self {
        self.parent_label = Some(label.into());
        self
    }

    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = Some(max_length);
        self
    }

    pub fn with_na_toggle(mut self, id: impl Into<String>, label: Option<String>) -> Self {
        self.na_toggle = Some(NaToggle {
            id: id.into(),
            label,
        });
        self
    }

    pub fn with_help_text(mut self, help_text: impl Into<String>) -> Self {
        self.help_text = Some(help_text.into());
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn repeatable(mut self) -> Self {
        self.repeatable = true;
        self
    }

    pub fn is_choice(&self) -> bool {
        self.kind.is_choice()
    }

    pub fn toggle_id(&self) -> Option<&str> {
        self.na_toggle.as_ref().map(|toggle| toggle.id.as_str())
    }

    /// Normalized group key of the field's parent label.
    pub fn group_key(&self) -> Option<String> {
        self.parent_label
            .as_deref()
            .map(normalize_label)
            .filter(|key| !key.is_empty())
    }

    /// Rule lookup key for `value` on this field.
    ///
    /// Single-choice fields key on the chosen option's sub-identifier,
    /// enumerated fields on their own identifier and the trimmed value.
    /// Text fields never trigger rules.
    pub fn trigger_key(&self, value: &str) -> Option<String> {
        match &self.kind {
            FieldKind::SingleChoice { choices } => {
                let choice_id = choices.get(value)?;
                Some(format!("{choice_id}.{value}"))
            }
            FieldKind::EnumeratedChoice { .. } => {
                let trimmed = value.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(format!("{}.{trimmed}", self.name))
                }
            }
            FieldKind::ShortText | FieldKind::LongText => None,
        }
    }

    /// Clone of this definition with every identifier moved to `group_index`.
    pub fn for_group(&self, group_index: usize) -> Self {
        let mut clone = self.clone();
        clone.name = transform(&self.name, group_index);
        if let Some(toggle) = clone.na_toggle.as_mut() {
            toggle.id = transform(&toggle.id, group_index);
        }
        if let FieldKind::SingleChoice { choices } = &mut clone.kind {
            for id in choices.values_mut() {
                *id = transform(id, group_index);
            }
        }
        clone
    }

    /// Every identifier that can carry an answer for this field.
    pub fn answer_ids(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.toggle_id())
    }
}
