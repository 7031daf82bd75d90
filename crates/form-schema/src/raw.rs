//! On-disk JSON shape of page schemas.
//!
//! Raw records are parsed as-is, then resolved once into the closed
//! [`FieldKind`] variants of the model; nothing downstream sees the raw form.

#![deny(unsafe_code)]

use std::collections::BTreeMap;

use form_model::{DependencyRule, FieldDefinition, FieldKind, PageSchema};
use serde::Deserialize;

use crate::error::SchemaError;

#[derive(Debug, Clone, Deserialize)]
pub struct RawSchema {
    #[serde(default)]
    pub fields: Vec<RawField>,
    #[serde(default)]
    pub dependencies: BTreeMap<String, RawDependency>,
    #[serde(default)]
    pub buttons: Vec<RawButton>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawButton {
    pub id: String,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawDependency {
    #[serde(default)]
    pub shows: Vec<RawField>,
    /// Accepted for compatibility; hiding is derived from the absence of a
    /// matching rule.
    #[serde(default)]
    pub hides: Vec<RawField>,
    #[serde(default)]
    pub dependencies: BTreeMap<String, RawDependency>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    One(String),
    Many(Vec<String>),
}

impl Default for RawValue {
    fn default() -> Self {
        Self::Many(Vec::new())
    }
}

impl RawValue {
    fn into_options(self) -> Vec<String> {
        match self {
            Self::One(value) if value.is_empty() => Vec::new(),
            Self::One(value) => vec![value],
            Self::Many(values) => values,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawField {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub value: RawValue,
    #[serde(default)]
    pub text_phrase: Option<String>,
    #[serde(default)]
    pub parent_text_phrase: Option<String>,
    #[serde(default)]
    pub maxlength: Option<String>,
    #[serde(default)]
    pub has_na_checkbox: bool,
    #[serde(default)]
    pub na_checkbox_id: Option<String>,
    #[serde(default)]
    pub na_checkbox_text: Option<String>,
    #[serde(default)]
    pub button_ids: BTreeMap<String, String>,
    #[serde(default)]
    pub help_text: Option<String>,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub add_group: bool,
}

impl RawField {
    pub fn resolve(self, page: &str) -> Result<FieldDefinition, SchemaError> {
        let kind = match self.kind.as_str() {
            "text" | "date" => FieldKind::ShortText,
            "textarea" => FieldKind::LongText,
            "radio" => FieldKind::SingleChoice {
                choices: self.button_ids,
            },
            "dropdown" => FieldKind::EnumeratedChoice {
                options: self.value.into_options(),
            },
            other => {
                return Err(SchemaError::UnknownFieldKind {
                    page: page.to_string(),
                    field: self.name,
                    kind: other.to_string(),
                });
            }
        };

        let max_length = match self.maxlength.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(value) => Some(value.parse::<usize>().map_err(|_| {
                SchemaError::InvalidMaxLength {
                    page: page.to_string(),
                    field: self.name.clone(),
                    value: value.to_string(),
                }
            })?),
        };

        let prompt = self.text_phrase.unwrap_or_else(|| self.name.clone());
        let mut field = FieldDefinition::new(self.name, prompt, kind);
        field.max_length = max_length;
        field.parent_label = self.parent_text_phrase.filter(|label| !label.trim().is_empty());
        field.help_text = self.help_text.filter(|text| !text.trim().is_empty());
        field.optional = self.optional;
        field.repeatable = self.add_group;
        match (self.has_na_checkbox, self.na_checkbox_id) {
            (true, Some(id)) if !id.is_empty() => {
                field = field.with_na_toggle(id, self.na_checkbox_text);
            }
            (true, _) => {
                tracing::warn!(page, field = %field.name, "na checkbox without an identifier ignored");
            }
            _ => {}
        }
        Ok(field)
    }
}

impl RawDependency {
    /// Resolve a rule tree with an explicit stack.
    fn resolve(self, page: &str) -> Result<DependencyRule, SchemaError> {
        enum Frame {
            Enter(Option<String>, RawDependency),
            Exit,
        }

        let mut stack = vec![Frame::Enter(None, self)];
        let mut built: Vec<(Option<String>, DependencyRule, usize)> = Vec::new();
        let mut finished: Vec<(String, DependencyRule)> = Vec::new();
        let mut root = None;

        while let Some(frame) = stack.pop() {
            match frame {
                Frame::Enter(key, raw) => {
                    let shows = raw
                        .shows
                        .into_iter()
                        .map(|field| field.resolve(page))
                        .collect::<Result<Vec<_>, _>>()?;
                    built.push((key, DependencyRule::new(shows), finished.len()));
                    stack.push(Frame::Exit);
                    for (child_key, child) in raw.dependencies.into_iter().rev() {
                        stack.push(Frame::Enter(Some(child_key), child));
                    }
                }
                Frame::Exit => {
                    let Some((key, mut rule, mark)) = built.pop() else {
                        break;
                    };
                    rule.nested.extend(finished.drain(mark..));
                    match key {
                        Some(key) => finished.push((key, rule)),
                        None => root = Some(rule),
                    }
                }
            }
        }

        Ok(root.unwrap_or_default())
    }
}

impl RawSchema {
    pub fn resolve(self, page: &str) -> Result<PageSchema, SchemaError> {
        let mut schema = PageSchema::new(page);
        for field in self.fields {
            schema.fields.push(field.resolve(page)?);
        }
        for (key, rule) in self.dependencies {
            schema.dependencies.insert(key, rule.resolve(page)?);
        }
        Ok(schema)
    }
}
