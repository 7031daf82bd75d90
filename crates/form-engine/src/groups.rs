//! Repeated-group instances.
//!
//! A group is the set of schema fields sharing a normalized parent label
//! where at least one field is marked repeatable. Instance `i` (from 1) is a
//! clone of the template with every identifier moved to group index `i`; the
//! template itself is index 0.

use std::collections::{BTreeMap, BTreeSet};

use form_model::ident::{detransform, is_group_eligible, transform};
use form_model::{AnswerMap, DiagnosticLog, FieldDefinition, FieldKind, GroupKey, PageSchema};
use serde_json::json;

use crate::error::{EngineError, Result};
use crate::resolver::{FieldLayout, LayoutExtension};

const SCOPE: &str = "groups";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupDefinition {
    pub key: GroupKey,
    /// Template fields cloned for every instance.
    pub template: Vec<FieldDefinition>,
    /// Template identifiers plus every field reachable through rules
    /// triggered by the group's choice fields.
    pub family: Vec<FieldDefinition>,
}

impl GroupDefinition {
    /// Answer-carrying identifiers of the whole family at `index`.
    fn answer_ids(&self, index: usize) -> Vec<String> {
        self.family
            .iter()
            .flat_map(|field| field.answer_ids())
            .filter(|id| is_group_eligible(id))
            .map(|id| transform(id, index))
            .collect()
    }

    fn instance(&self, index: usize) -> Vec<FieldDefinition> {
        self.template
            .iter()
            .map(|field| field.for_group(index))
            .collect()
    }

    /// Highest group index found among `answers` for this family.
    pub fn highest_answered_index(&self, answers: &AnswerMap) -> usize {
        let templates: BTreeSet<&str> = self
            .family
            .iter()
            .flat_map(|field| field.answer_ids())
            .collect();
        answers
            .iter()
            .map(|(id, _)| detransform(id))
            .filter(|(template, _)| templates.contains(template.as_str()))
            .map(|(_, index)| index)
            .max()
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone)]
struct GroupState {
    definition: GroupDefinition,
    instances: Vec<Vec<FieldDefinition>>,
}

/// Repeated groups of one page and their current instances.
#[derive(Debug, Clone, Default)]
pub struct RepeatedGroupManager {
    groups: BTreeMap<GroupKey, GroupState>,
}

impl RepeatedGroupManager {
    /// Discover the page's groups.
    pub fn from_schema(schema: &PageSchema) -> Self {
        let all_fields = schema.all_fields();
        let keys: BTreeSet<GroupKey> = all_fields
            .iter()
            .filter(|field| field.repeatable)
            .filter_map(|field| field.group_key())
            .filter_map(|label| GroupKey::new(label).ok())
            .collect();

        let mut groups = BTreeMap::new();
        for key in keys {
            let definition = define_group(schema, &all_fields, key.clone());
            if definition.template.is_empty() {
                tracing::warn!(page = %schema.page, group = %key, "group has no clonable fields");
                continue;
            }
            groups.insert(
                key,
                GroupState {
                    definition,
                    instances: Vec::new(),
                },
            );
        }
        Self { groups }
    }

    pub fn keys(&self) -> impl Iterator<Item = &GroupKey> {
        self.groups.keys()
    }

    pub fn definition(&self, label: &str) -> Result<&GroupDefinition> {
        Ok(&self.state(label)?.definition)
    }

    pub fn instance_count(&self, label: &str) -> Result<usize> {
        Ok(self.state(label)?.instances.len())
    }

    /// Fields of instance `index` (1-based).
    pub fn instance(&self, label: &str, index: usize) -> Result<&[FieldDefinition]> {
        let state = self.state(label)?;
        index
            .checked_sub(1)
            .and_then(|slot| state.instances.get(slot))
            .map(Vec::as_slice)
            .ok_or_else(|| EngineError::InvalidInstance {
                label: label.to_string(),
                index,
                count: state.instances.len(),
            })
    }

    /// Append a new instance; returns its group index.
    pub fn add_instance(&mut self, label: &str) -> Result<usize> {
        let state = self.state_mut(label)?;
        let index = state.instances.len() + 1;
        let instance = state.definition.instance(index);
        state.instances.push(instance);
        tracing::debug!(group = %state.definition.key, index, "group instance added");
        Ok(index)
    }

    /// Remove instance `index`, shifting later instances' answers down.
    ///
    /// Returns `None` when the group has no instances.
    pub fn remove_instance(
        &mut self,
        label: &str,
        index: usize,
        answers: &mut AnswerMap,
        log: &dyn DiagnosticLog,
    ) -> Result<Option<usize>> {
        let state = self.state_mut(label)?;
        let count = state.instances.len();
        if count == 0 {
            log.log(
                SCOPE,
                "remove from empty group ignored",
                Some(&json!({ "group": label })),
            );
            return Ok(None);
        }
        if index == 0 || index > count {
            return Err(EngineError::InvalidInstance {
                label: label.to_string(),
                index,
                count,
            });
        }

        for slot in index..count {
            let targets = state.definition.answer_ids(slot);
            let sources = state.definition.answer_ids(slot + 1);
            for (target, source) in targets.into_iter().zip(sources) {
                match answers.get(&source).map(str::to_string) {
                    Some(value) => {
                        answers.set(target, value);
                    }
                    None => {
                        answers.remove(&target);
                    }
                }
            }
        }
        for id in state.definition.answer_ids(count) {
            answers.remove(&id);
        }
        state.instances.pop();
        tracing::debug!(group = %state.definition.key, index, remaining = count - 1, "group instance removed");
        Ok(Some(index))
    }

    pub fn remove_last(
        &mut self,
        label: &str,
        answers: &mut AnswerMap,
        log: &dyn DiagnosticLog,
    ) -> Result<Option<usize>> {
        let count = self.instance_count(label)?;
        self.remove_instance(label, count.max(1), answers, log)
    }

    /// Drop every instance without touching answers.
    pub fn clear(&mut self) {
        for state in self.groups.values_mut() {
            state.instances.clear();
        }
    }

    /// Page layout with every instance placed after its template.
    pub fn layout(&self, schema: &PageSchema) -> FieldLayout {
        let mut layout = FieldLayout::new(schema.fields.clone());
        for state in self.groups.values() {
            let anchors: Vec<String> = state
                .definition
                .template
                .iter()
                .map(|field| field.name.clone())
                .collect();
            for instance in &state.instances {
                layout = layout.with_extension(LayoutExtension {
                    anchors: anchors.clone(),
                    fields: instance.clone(),
                });
            }
        }
        layout
    }

    fn state(&self, label: &str) -> Result<&GroupState> {
        GroupKey::new(label)
            .ok()
            .and_then(|key| self.groups.get(&key))
            .ok_or_else(|| EngineError::UnknownGroup(label.to_string()))
    }

    fn state_mut(&mut self, label: &str) -> Result<&mut GroupState> {
        GroupKey::new(label)
            .ok()
            .and_then(|key| self.groups.get_mut(&key))
            .ok_or_else(|| EngineError::UnknownGroup(label.to_string()))
    }
}

fn define_group(schema: &PageSchema, all_fields: &[&FieldDefinition], key: GroupKey) -> GroupDefinition {
    let in_group = |field: &FieldDefinition| {
        field
            .group_key()
            .is_some_and(|label| label == key.as_str())
    };

    // Fields revealed by the group's own choice fields arrive through the
    // clones' chains rather than the template.
    let mut revealed_within = BTreeSet::new();
    for (trigger, rule) in schema.rules() {
        let source = trigger
            .split_once('.')
            .and_then(|(id, _)| schema.field_for_choice(&detransform(id).0));
        if source.is_some_and(in_group) {
            revealed_within.extend(rule.shows.iter().map(|field| field.name.clone()));
        }
    }

    let mut template = Vec::new();
    for field in all_fields.iter().copied().filter(|field| in_group(*field)) {
        if revealed_within.contains(&field.name) {
            continue;
        }
        if !is_group_eligible(&field.name) {
            tracing::warn!(page = %schema.page, group = %key, field = %field.name, "field cannot be cloned");
            continue;
        }
        template.push(field.clone());
    }

    let family = family_of(schema, &template);
    GroupDefinition {
        key,
        template,
        family,
    }
}

/// Template plus everything reachable through rules triggered by family
/// choice fields.
fn family_of(schema: &PageSchema, template: &[FieldDefinition]) -> Vec<FieldDefinition> {
    let rules = schema.rules();
    let mut seen: BTreeSet<String> = template.iter().map(|field| field.name.clone()).collect();
    let mut family = template.to_vec();
    let mut stack: Vec<FieldDefinition> = template.to_vec();
    while let Some(field) = stack.pop() {
        let triggers: Vec<String> = match &field.kind {
            FieldKind::SingleChoice { choices } => choices.values().cloned().collect(),
            FieldKind::EnumeratedChoice { .. } => vec![field.name.clone()],
            _ => continue,
        };
        for (key, rule) in &rules {
            let Some((id, _)) = key.split_once('.') else {
                continue;
            };
            if !triggers.iter().any(|trigger| trigger == id) {
                continue;
            }
            for child in &rule.shows {
                if seen.insert(child.name.clone()) {
                    family.push(child.clone());
                    stack.push(child.clone());
                }
            }
        }
    }
    family
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use form_model::{DependencyRule, MemoryLog};

    use super::*;

    const LABEL: &str = "Previous Travel Details";

    fn group_field(name: &str, kind: FieldKind) -> FieldDefinition {
        FieldDefinition::new(name, name, kind)
            .with_parent_label(LABEL)
            .repeatable()
    }

    fn schema() -> PageSchema {
        let choices = BTreeMap::from([("Y".to_string(), "dtl_ctl00_rblDL_0".to_string())]);
        PageSchema::new("p")
            .with_field(group_field("dtl_ctl00_tbxDATE", FieldKind::ShortText))
            .with_field(group_field(
                "dtl_ctl00_rblDL",
                FieldKind::SingleChoice { choices },
            ))
            .with_rule(
                "dtl_ctl00_rblDL_0.Y",
                DependencyRule::new(vec![
                    FieldDefinition::new("dtl_ctl00_tbxDL_NUM", "Number", FieldKind::ShortText)
                        .with_parent_label(LABEL),
                ]),
            )
    }

    #[test]
    fn template_excludes_fields_revealed_inside_the_group() {
        let manager = RepeatedGroupManager::from_schema(&schema());
        let definition = manager.definition("previous_travel_details").unwrap();
        let template: Vec<_> = definition.template.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(template, ["dtl_ctl00_tbxDATE", "dtl_ctl00_rblDL"]);
        let family: Vec<_> = definition.family.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(family, ["dtl_ctl00_tbxDATE", "dtl_ctl00_rblDL", "dtl_ctl00_tbxDL_NUM"]);
    }

    #[test]
    fn consecutive_instances_get_distinct_identifiers() {
        let mut manager = RepeatedGroupManager::from_schema(&schema());
        assert_eq!(manager.add_instance(LABEL).unwrap(), 1);
        assert_eq!(manager.add_instance(LABEL).unwrap(), 2);
        let first = manager.instance(LABEL, 1).unwrap();
        let second = manager.instance(LABEL, 2).unwrap();
        assert_eq!(first[0].name, "dtl_ctl01_tbxDATE");
        assert_eq!(second[0].name, "dtl_ctl02_tbxDATE");
    }

    #[test]
    fn removal_shifts_family_values_down() {
        let mut manager = RepeatedGroupManager::from_schema(&schema());
        manager.add_instance(LABEL).unwrap();
        manager.add_instance(LABEL).unwrap();
        let mut answers: AnswerMap = [
            ("dtl_ctl01_tbxDATE", "2019"),
            ("dtl_ctl01_tbxDL_NUM", "A1"),
            ("dtl_ctl02_tbxDATE", "2020"),
            ("dtl_ctl02_rblDL", "Y"),
        ]
        .into_iter()
        .collect();
        let log = MemoryLog::new();

        let removed = manager.remove_instance(LABEL, 1, &mut answers, &log).unwrap();

        assert_eq!(removed, Some(1));
        assert_eq!(manager.instance_count(LABEL).unwrap(), 1);
        assert_eq!(answers.get("dtl_ctl01_tbxDATE"), Some("2020"));
        assert_eq!(answers.get("dtl_ctl01_rblDL"), Some("Y"));
        assert_eq!(answers.get("dtl_ctl01_tbxDL_NUM"), None);
        assert_eq!(answers.get("dtl_ctl02_tbxDATE"), None);
        assert_eq!(answers.get("dtl_ctl02_rblDL"), None);
    }

    #[test]
    fn empty_and_unknown_groups() {
        let mut manager = RepeatedGroupManager::from_schema(&schema());
        let mut answers = AnswerMap::new();
        let log = MemoryLog::new();
        assert_eq!(manager.remove_last(LABEL, &mut answers, &log).unwrap(), None);
        assert!(log.contains(SCOPE, "empty group"));
        assert_eq!(
            manager.add_instance("Employers").unwrap_err(),
            EngineError::UnknownGroup("Employers".to_string())
        );
    }
}
