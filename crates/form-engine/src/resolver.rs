//! Dependency graph resolution.
//!
//! Visibility is a pure function of the page schema, the field layout (base
//! fields plus repeated-group instances) and the answers. The resolver
//! derives it in two steps:
//!
//! 1. **Expansion**: starting from the layout's fields in order, every
//!    visible choice field with an answer is looked up in the rule tree; a
//!    matching rule yields a [`DependencyChain`] whose children are expanded
//!    in turn. Extensions are expanded only when one of their anchors is
//!    shown; otherwise they are hidden with everything they reveal.
//! 2. **Linearization**: fields are emitted in layout order, each followed by
//!    its chain's children, then the children's own blocks.
//!
//! [`DependencyResolver::apply_change`] updates an existing state after one
//! answer changes and always lands on the same state a full
//! [`DependencyResolver::resolve`] would produce.

use std::collections::{BTreeMap, BTreeSet};

use form_model::ident::{detransform, group_index};
use form_model::{AnswerMap, DependencyChain, DependencyRule, FieldDefinition, PageSchema};
use serde::Serialize;

/// Default limit on nested chain depth.
pub const DEFAULT_MAX_CHAIN_DEPTH: usize = 32;

/// Fields inserted after a set of anchor fields, such as one instance of a
/// repeated group placed after its template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutExtension {
    pub anchors: Vec<String>,
    pub fields: Vec<FieldDefinition>,
}

/// Root fields of a page in display order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldLayout {
    pub fields: Vec<FieldDefinition>,
    pub extensions: Vec<LayoutExtension>,
}

impl FieldLayout {
    pub fn new(fields: Vec<FieldDefinition>) -> Self {
        Self {
            fields,
            extensions: Vec::new(),
        }
    }

    pub fn with_extension(mut self, extension: LayoutExtension) -> Self {
        self.extensions.push(extension);
        self
    }

    /// Extension fields whose anchors include at least one of `shown`.
    fn anchored<'s>(
        &'s self,
        shown: &'s BTreeSet<&str>,
    ) -> impl Iterator<Item = &'s FieldDefinition> + 's {
        self.extensions
            .iter()
            .filter(|ext| ext.anchors.iter().any(|anchor| shown.contains(anchor.as_str())))
            .flat_map(|ext| ext.fields.iter())
    }
}

/// Visible fields and active chains of one page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VisibilityState {
    visible: BTreeSet<String>,
    chains: Vec<DependencyChain>,
    ordered: Vec<FieldDefinition>,
}

impl VisibilityState {
    pub fn is_visible(&self, id: &str) -> bool {
        self.visible.contains(id)
    }

    pub fn visible_ids(&self) -> &BTreeSet<String> {
        &self.visible
    }

    /// Active chains ordered by their parent's display position.
    pub fn chains(&self) -> &[DependencyChain] {
        &self.chains
    }

    pub fn chain_for(&self, parent: &str) -> Option<&DependencyChain> {
        self.chains.iter().find(|chain| chain.parent == parent)
    }

    /// Visible fields in display order.
    pub fn fields(&self) -> &[FieldDefinition] {
        &self.ordered
    }

    pub fn field(&self, id: &str) -> Option<&FieldDefinition> {
        self.ordered.iter().find(|field| field.name == id)
    }
}

/// Fields that appeared or disappeared after one transition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChangeOutcome {
    pub revealed: Vec<String>,
    pub hidden: Vec<String>,
}

impl ChangeOutcome {
    pub fn is_empty(&self) -> bool {
        self.revealed.is_empty() && self.hidden.is_empty()
    }

    fn between(before: &BTreeSet<String>, after: &BTreeSet<String>) -> Self {
        Self {
            revealed: after.difference(before).cloned().collect(),
            hidden: before.difference(after).cloned().collect(),
        }
    }
}

/// Resolves visibility for one page schema.
#[derive(Debug, Clone, Copy)]
pub struct DependencyResolver<'a> {
    schema: &'a PageSchema,
    max_depth: usize,
}

/// A field waiting to be expanded.
struct Pending {
    field: FieldDefinition,
    parent_chain: Option<String>,
    depth: usize,
}

impl Pending {
    fn root(field: &FieldDefinition) -> Self {
        Self {
            field: field.clone(),
            parent_chain: None,
            depth: 0,
        }
    }
}

impl<'a> DependencyResolver<'a> {
    pub fn new(schema: &'a PageSchema) -> Self {
        Self {
            schema,
            max_depth: DEFAULT_MAX_CHAIN_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn schema(&self) -> &'a PageSchema {
        self.schema
    }

    /// Look up a rule by trigger key: top-level rules first, then nested rule
    /// maps depth-first.
    pub fn find_rule(&self, key: &str) -> Option<&'a DependencyRule> {
        let mut stack = vec![&self.schema.dependencies];
        while let Some(rules) = stack.pop() {
            if let Some(rule) = rules.get(key) {
                return Some(rule);
            }
            stack.extend(
                rules
                    .values()
                    .rev()
                    .map(|rule| &rule.nested)
                    .filter(|nested| !nested.is_empty()),
            );
        }
        None
    }

    /// Fields revealed when `field` holds `value`.
    ///
    /// Clones look up the template's rule and receive children moved to the
    /// clone's group index.
    pub fn reveal(&self, field: &FieldDefinition, value: &str) -> Vec<FieldDefinition> {
        let Some(key) = field.trigger_key(value) else {
            return Vec::new();
        };
        let Some(rule) = self.find_rule(&template_key(&key)) else {
            return Vec::new();
        };
        let index = group_index(&field.name);
        rule.shows
            .iter()
            .map(|child| {
                if index == 0 {
                    child.clone()
                } else {
                    child.for_group(index)
                }
            })
            .collect()
    }

    /// Derive the full state from scratch.
    pub fn resolve(&self, layout: &FieldLayout, answers: &AnswerMap) -> VisibilityState {
        let roots = layout.fields.iter().map(Pending::root).collect();
        let mut visited = BTreeSet::new();
        let mut chains = Vec::new();
        self.expand(roots, answers, &mut visited, &mut chains);
        self.expand_extensions(layout, answers, &mut visited, &mut chains);

        let mut state = VisibilityState {
            visible: BTreeSet::new(),
            chains,
            ordered: Vec::new(),
        };
        self.relinearize(layout, &mut state);
        tracing::trace!(
            page = %self.schema.page,
            visible = state.visible.len(),
            chains = state.chains.len(),
            "visibility resolved"
        );
        state
    }

    /// Update `state` after the answer for `field_id` changed.
    ///
    /// Fields that are not visible choice fields leave the state untouched;
    /// their answers are kept but never read.
    pub fn apply_change(
        &self,
        layout: &FieldLayout,
        state: &mut VisibilityState,
        field_id: &str,
        answers: &AnswerMap,
    ) -> ChangeOutcome {
        let Some(field) = state.field(field_id).filter(|f| f.is_choice()).cloned() else {
            return ChangeOutcome::default();
        };
        let before = state.visible.clone();

        let removed = descendant_parents(&state.chains, field_id);
        state.chains.retain(|chain| !removed.contains(&chain.parent));

        let parent_chain = state
            .chains
            .iter()
            .find(|chain| chain.child_ids().any(|id| id == field_id))
            .map(|chain| chain.parent.clone());
        let depth = chain_depth(&state.chains, parent_chain.as_deref());

        let mut visited: BTreeSet<String> =
            state.chains.iter().map(|chain| chain.parent.clone()).collect();
        let pending = vec![Pending {
            field,
            parent_chain,
            depth,
        }];
        self.expand(pending, answers, &mut visited, &mut state.chains);
        self.expand_extensions(layout, answers, &mut visited, &mut state.chains);
        self.relinearize(layout, state);

        let outcome = ChangeOutcome::between(&before, &state.visible);
        tracing::debug!(
            page = %self.schema.page,
            field = field_id,
            revealed = outcome.revealed.len(),
            hidden = outcome.hidden.len(),
            "answer change applied"
        );
        outcome
    }

    /// Expand the fields of every extension anchored to a shown base field.
    ///
    /// Anchors are template fields, so only base fields and chain children
    /// decide placement. Unanchored extensions stay hidden and their chains
    /// are dropped when the state is relinearized.
    fn expand_extensions(
        &self,
        layout: &FieldLayout,
        answers: &AnswerMap,
        visited: &mut BTreeSet<String>,
        chains: &mut Vec<DependencyChain>,
    ) {
        let shown: BTreeSet<&str> = layout
            .fields
            .iter()
            .map(|field| field.name.as_str())
            .chain(chains.iter().flat_map(DependencyChain::child_ids))
            .collect();
        let roots: Vec<Pending> = layout
            .anchored(&shown)
            .filter(|field| !visited.contains(&field.name))
            .map(Pending::root)
            .collect();
        self.expand(roots, answers, visited, chains);
    }

    /// Expand pending fields into chains with an explicit stack.
    fn expand(
        &self,
        mut pending: Vec<Pending>,
        answers: &AnswerMap,
        visited: &mut BTreeSet<String>,
        chains: &mut Vec<DependencyChain>,
    ) {
        pending.reverse();
        while let Some(Pending {
            field,
            parent_chain,
            depth,
        }) = pending.pop()
        {
            if !field.is_choice() {
                continue;
            }
            let value = answers.value(&field.name);
            if value.trim().is_empty() {
                continue;
            }
            if depth >= self.max_depth {
                tracing::warn!(
                    page = %self.schema.page,
                    field = %field.name,
                    depth,
                    "chain depth limit reached"
                );
                continue;
            }
            if !visited.insert(field.name.clone()) {
                tracing::warn!(
                    page = %self.schema.page,
                    field = %field.name,
                    "field already expanded"
                );
                continue;
            }

            let children = self.reveal(&field, value);
            if children.is_empty() {
                continue;
            }
            pending.extend(children.iter().rev().map(|child| Pending {
                field: child.clone(),
                parent_chain: Some(field.name.clone()),
                depth: depth + 1,
            }));
            chains.push(DependencyChain {
                parent: field.name,
                children,
                parent_chain_id: parent_chain,
            });
        }
    }

    /// Rebuild display order and the visible set from the layout and chains,
    /// then order chains by their parent's position.
    fn relinearize(&self, layout: &FieldLayout, state: &mut VisibilityState) {
        let by_parent: BTreeMap<&str, &DependencyChain> = state
            .chains
            .iter()
            .map(|chain| (chain.parent.as_str(), chain))
            .collect();

        // Which base field's block each extension follows.
        let mut block_of: BTreeMap<String, usize> = BTreeMap::new();
        for (position, field) in layout.fields.iter().enumerate() {
            for emitted in emit_block(field, &by_parent, &mut BTreeSet::new()) {
                block_of.entry(emitted.name.clone()).or_insert(position);
            }
        }
        let mut after: BTreeMap<usize, Vec<&LayoutExtension>> = BTreeMap::new();
        for extension in &layout.extensions {
            let target = extension
                .anchors
                .iter()
                .filter_map(|anchor| block_of.get(anchor).copied())
                .max();
            if let Some(position) = target {
                after.entry(position).or_default().push(extension);
            }
        }

        let mut placed = BTreeSet::new();
        let mut ordered = Vec::new();
        for (position, field) in layout.fields.iter().enumerate() {
            ordered.extend(emit_block(field, &by_parent, &mut placed));
            for extension in after.get(&position).into_iter().flatten() {
                for field in &extension.fields {
                    ordered.extend(emit_block(field, &by_parent, &mut placed));
                }
            }
        }

        let positions: BTreeMap<&str, usize> = ordered
            .iter()
            .enumerate()
            .map(|(position, field)| (field.name.as_str(), position))
            .collect();
        let mut chains = std::mem::take(&mut state.chains);
        chains.retain(|chain| positions.contains_key(chain.parent.as_str()));
        chains.sort_by_key(|chain| positions.get(chain.parent.as_str()).copied());

        state.visible = placed;
        state.chains = chains;
        state.ordered = ordered;
    }
}

/// Emit `root`, its chain's children, then the children's blocks.
fn emit_block(
    root: &FieldDefinition,
    by_parent: &BTreeMap<&str, &DependencyChain>,
    placed: &mut BTreeSet<String>,
) -> Vec<FieldDefinition> {
    let mut out = Vec::new();
    if !placed.insert(root.name.clone()) {
        return out;
    }
    out.push(root.clone());
    let mut stack = vec![root.name.clone()];
    while let Some(parent) = stack.pop() {
        let Some(chain) = by_parent.get(parent.as_str()) else {
            continue;
        };
        let mut expanded = Vec::new();
        for child in &chain.children {
            if placed.insert(child.name.clone()) {
                out.push(child.clone());
                expanded.push(child.name.clone());
            }
        }
        stack.extend(expanded.into_iter().rev());
    }
    out
}

/// Parents of the chain rooted at `root` and of every chain nested under it.
fn descendant_parents(chains: &[DependencyChain], root: &str) -> BTreeSet<String> {
    let mut parents = BTreeSet::from([root.to_string()]);
    let mut stack = vec![root.to_string()];
    while let Some(parent) = stack.pop() {
        for chain in chains {
            if chain.parent_chain_id.as_deref() == Some(parent.as_str())
                && parents.insert(chain.parent.clone())
            {
                stack.push(chain.parent.clone());
            }
        }
    }
    parents
}

/// Nesting depth of a field whose enclosing chain is rooted at `parent`.
fn chain_depth<'a>(chains: &'a [DependencyChain], mut parent: Option<&'a str>) -> usize {
    let mut depth = 0;
    while let Some(id) = parent {
        depth += 1;
        if depth > chains.len() {
            break;
        }
        parent = chains
            .iter()
            .find(|chain| chain.parent == id)
            .and_then(|chain| chain.parent_chain_id.as_deref());
    }
    depth
}

/// Trigger key with its identifier part moved back to the template.
fn template_key(key: &str) -> String {
    match key.split_once('.') {
        Some((id, value)) => format!("{}.{value}", detransform(id).0),
        None => key.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use form_model::FieldKind;

    use super::*;

    fn yes_no(name: &str) -> FieldDefinition {
        let choices = BTreeMap::from([
            ("N".to_string(), format!("{name}_1")),
            ("Y".to_string(), format!("{name}_0")),
        ]);
        FieldDefinition::new(name, name, FieldKind::SingleChoice { choices })
    }

    fn text(name: &str) -> FieldDefinition {
        FieldDefinition::new(name, name, FieldKind::ShortText)
    }

    #[test]
    fn nested_rules_are_found_depth_first() {
        let schema = PageSchema::new("p").with_rule(
            "a_0.Y",
            DependencyRule::new(vec![yes_no("b")])
                .with_nested("b_0.Y", DependencyRule::new(vec![text("c")])),
        );
        let resolver = DependencyResolver::new(&schema);
        assert!(resolver.find_rule("a_0.Y").is_some());
        assert_eq!(resolver.find_rule("b_0.Y").unwrap().shows[0].name, "c");
        assert!(resolver.find_rule("missing.Y").is_none());
    }

    #[test]
    fn clones_reveal_children_at_their_index() {
        let schema = PageSchema::new("p").with_rule(
            "dtl_ctl00_rblQ_0.Y",
            DependencyRule::new(vec![text("dtl_ctl00_tbxDETAIL")]),
        );
        let resolver = DependencyResolver::new(&schema);
        let clone = yes_no("dtl_ctl00_rblQ").for_group(3);
        let children = resolver.reveal(&clone, "Y");
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].name, "dtl_ctl03_tbxDETAIL");
    }

    #[test]
    fn depth_guard_stops_expansion() {
        let schema = PageSchema::new("p").with_field(yes_no("a")).with_rule(
            "a_0.Y",
            DependencyRule::new(vec![yes_no("b")])
                .with_nested("b_0.Y", DependencyRule::new(vec![text("c")])),
        );
        let answers: AnswerMap = [("a", "Y"), ("b", "Y")].into_iter().collect();
        let layout = FieldLayout::new(schema.fields.clone());
        let state = DependencyResolver::new(&schema)
            .with_max_depth(1)
            .resolve(&layout, &answers);
        assert!(state.is_visible("b"));
        assert!(!state.is_visible("c"));
    }

    #[test]
    fn nested_blocks_follow_enclosing_children() {
        let schema = PageSchema::new("p")
            .with_field(yes_no("a"))
            .with_field(text("z"))
            .with_rule(
                "a_0.Y",
                DependencyRule::new(vec![yes_no("b"), text("c")])
                    .with_nested("b_0.Y", DependencyRule::new(vec![text("d")])),
            );
        let answers: AnswerMap = [("a", "Y"), ("b", "Y")].into_iter().collect();
        let layout = FieldLayout::new(schema.fields.clone());
        let state = DependencyResolver::new(&schema).resolve(&layout, &answers);
        let order: Vec<_> = state.fields().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(order, ["a", "b", "c", "d", "z"]);
        assert_eq!(state.chains().len(), 2);
        assert_eq!(state.chains()[1].parent_chain_id.as_deref(), Some("a"));
    }

    #[test]
    fn extensions_follow_their_anchor_block() {
        let layout = FieldLayout::new(vec![text("dtl_ctl00_tbx"), text("tail")]).with_extension(
            LayoutExtension {
                anchors: vec!["dtl_ctl00_tbx".to_string()],
                fields: vec![text("dtl_ctl01_tbx")],
            },
        );
        let schema = PageSchema::new("p");
        let state = DependencyResolver::new(&schema).resolve(&layout, &AnswerMap::new());
        let order: Vec<_> = state.fields().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(order, ["dtl_ctl00_tbx", "dtl_ctl01_tbx", "tail"]);
    }

    #[test]
    fn unanchored_extensions_are_hidden() {
        let schema = PageSchema::new("p").with_field(text("head")).with_rule(
            "dtl_ctl00_rblQ_0.Y",
            DependencyRule::new(vec![text("dtl_ctl00_tbxDETAIL")]),
        );
        let layout = FieldLayout::new(schema.fields.clone()).with_extension(LayoutExtension {
            anchors: vec!["dtl_ctl00_rblQ".to_string()],
            fields: vec![yes_no("dtl_ctl00_rblQ").for_group(1)],
        });
        let answers: AnswerMap = [("dtl_ctl01_rblQ", "Y")].into_iter().collect();
        let state = DependencyResolver::new(&schema).resolve(&layout, &answers);
        let order: Vec<_> = state.fields().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(order, ["head"]);
        assert!(state.chains().is_empty());
    }
}
