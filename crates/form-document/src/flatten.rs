//! Nested document <-> flat path map.
//!
//! Object keys are joined with `.`; a sequence becomes a [`FlatEntry::Group`]
//! whose items keep the full dotted path of every leaf. Empty objects are
//! kept as [`FlatEntry::Empty`] markers so they survive the round trip.
//! `unflatten` also
//! accepts scalar keys carrying a `_ctlNN` token, which it gathers into
//! index-ordered sequences.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use form_model::{DiagnosticLog, DocumentNode, Object};
use indexmap::IndexMap;
use regex::Regex;
use serde_json::json;

const SCOPE: &str = "flatten";

static INDEXED_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.*)_ctl(\d+)").expect("indexed key pattern is valid"));

/// One flattened sequence item: full dotted path to value.
pub type GroupItem = IndexMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlatEntry {
    Scalar(String),
    /// An object with no keys.
    Empty,
    Group {
        items: Vec<GroupItem>,
        /// Item index and full path of empty objects inside items.
        empty: BTreeSet<(usize, String)>,
    },
}

impl FlatEntry {
    pub fn group(items: Vec<GroupItem>) -> Self {
        Self::Group {
            items,
            empty: BTreeSet::new(),
        }
    }
}

/// Flat entries in document order.
pub type FlatMap = IndexMap<String, FlatEntry>;

fn join(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

/// Push the entries of `object` so they pop in document order.
fn push_entries<'d>(stack: &mut Vec<(String, &'d DocumentNode)>, prefix: &str, object: &'d Object) {
    stack.extend(
        object
            .iter()
            .rev()
            .map(|(key, node)| (join(prefix, key), node)),
    );
}

/// Flatten an object into dotted paths, depth first in document order.
pub fn flatten(object: &Object, log: &dyn DiagnosticLog) -> FlatMap {
    let mut flat = FlatMap::new();
    let mut stack = Vec::new();
    push_entries(&mut stack, "", object);
    while let Some((path, node)) = stack.pop() {
        match node {
            DocumentNode::Scalar(value) => {
                flat.insert(path, FlatEntry::Scalar(value.clone()));
            }
            DocumentNode::Object(inner) if inner.is_empty() => {
                flat.insert(path, FlatEntry::Empty);
            }
            DocumentNode::Object(inner) => push_entries(&mut stack, &path, inner),
            DocumentNode::Sequence(items) => {
                let entry = flatten_items(&path, items, log);
                flat.insert(path, entry);
            }
        }
    }
    flat
}

fn flatten_items(path: &str, items: &[DocumentNode], log: &dyn DiagnosticLog) -> FlatEntry {
    let mut group = Vec::with_capacity(items.len());
    let mut empty = BTreeSet::new();
    for (index, item) in items.iter().enumerate() {
        match item {
            DocumentNode::Scalar(value) => {
                group.push(GroupItem::from([(path.to_string(), value.clone())]));
            }
            DocumentNode::Object(object) => {
                let (item, empties) = flatten_item(path, object, log);
                empty.extend(empties.into_iter().map(|path| (group.len(), path)));
                group.push(item);
            }
            DocumentNode::Sequence(_) => log.log(
                SCOPE,
                "dropped sequence nested in sequence",
                Some(&json!({ "path": path, "index": index })),
            ),
        }
    }
    FlatEntry::Group {
        items: group,
        empty,
    }
}

/// Flatten one sequence item; also returns the paths of nested empty objects.
fn flatten_item(path: &str, object: &Object, log: &dyn DiagnosticLog) -> (GroupItem, Vec<String>) {
    let mut item = GroupItem::new();
    let mut empty = Vec::new();
    let mut stack = Vec::new();
    push_entries(&mut stack, path, object);
    while let Some((path, node)) = stack.pop() {
        match node {
            DocumentNode::Scalar(value) => {
                item.insert(path, value.clone());
            }
            DocumentNode::Object(inner) if inner.is_empty() => empty.push(path),
            DocumentNode::Object(inner) => push_entries(&mut stack, &path, inner),
            DocumentNode::Sequence(_) => log.log(
                SCOPE,
                "dropped sequence nested in sequence item",
                Some(&json!({ "path": path })),
            ),
        }
    }
    (item, empty)
}

/// Split an indexed scalar key into (group path, index, item path).
///
/// The group is the first two segments before the token, or the first one
/// when only two exist. Single-segment keys are not grouped.
fn split_indexed_key(key: &str) -> Option<(String, usize, String)> {
    let captures = INDEXED_KEY.captures(key)?;
    let index = captures[2].parse::<usize>().ok()?;
    let segments: Vec<&str> = captures[1].split('.').collect();
    let split = match segments.len() {
        0 | 1 => return None,
        2 => 1,
        _ => 2,
    };
    Some((
        segments[..split].join("."),
        index,
        segments[split..].join("."),
    ))
}

/// Rebuild a nested object from a flat map.
pub fn unflatten(flat: &FlatMap, log: &dyn DiagnosticLog) -> Object {
    let mut root = Object::new();
    let mut indexed: IndexMap<String, BTreeMap<usize, Object>> = IndexMap::new();

    for (key, entry) in flat {
        match entry {
            FlatEntry::Scalar(value) => match split_indexed_key(key) {
                Some((group, index, item_path)) => {
                    let item = indexed.entry(group).or_default().entry(index).or_default();
                    insert_path(item, &item_path, DocumentNode::scalar(value.as_str()), log);
                }
                None => insert_path(&mut root, key, DocumentNode::scalar(value.as_str()), log),
            },
            FlatEntry::Empty => {
                insert_path(&mut root, key, DocumentNode::Object(Object::new()), log);
            }
            FlatEntry::Group { items, empty } => {
                let items = items
                    .iter()
                    .enumerate()
                    .map(|(index, item)| {
                        let empties = empty
                            .range((index, String::new())..(index + 1, String::new()))
                            .map(|(_, path)| path.as_str());
                        unflatten_item(key, item, empties, log)
                    })
                    .collect();
                insert_path(&mut root, key, DocumentNode::Sequence(items), log);
            }
        }
    }

    for (group, instances) in indexed {
        let items = instances.into_values().map(DocumentNode::Object).collect();
        insert_path(&mut root, &group, DocumentNode::Sequence(items), log);
    }
    root
}

fn unflatten_item<'e>(
    path: &str,
    item: &GroupItem,
    empty: impl Iterator<Item = &'e str>,
    log: &dyn DiagnosticLog,
) -> DocumentNode {
    let mut empty = empty.peekable();
    if item.len() == 1
        && empty.peek().is_none()
        && let Some(value) = item.get(path)
    {
        return DocumentNode::scalar(value.as_str());
    }
    let prefix = format!("{path}.");
    let mut object = Object::new();
    let leaves = item
        .iter()
        .map(|(key, value)| (key.as_str(), DocumentNode::scalar(value.as_str())))
        .chain(empty.map(|key| (key, DocumentNode::Object(Object::new()))));
    for (key, node) in leaves {
        match key.strip_prefix(&prefix) {
            Some(relative) => insert_path(&mut object, relative, node, log),
            None => log.log(
                SCOPE,
                "dropped item key outside its group",
                Some(&json!({ "group": path, "key": key })),
            ),
        }
    }
    DocumentNode::Object(object)
}

/// Insert `value` at dotted `path`, keeping whatever is already there on
/// conflict.
pub(crate) fn insert_path(root: &mut Object, path: &str, value: DocumentNode, log: &dyn DiagnosticLog) {
    let mut segments = path.split('.').peekable();
    let mut current = root;
    while let Some(segment) = segments.next() {
        if segments.peek().is_none() {
            if current.contains_key(segment) {
                log.log(SCOPE, "dropped conflicting entry", Some(&json!({ "path": path })));
            } else {
                current.insert(segment.to_string(), value);
            }
            return;
        }
        let next = current
            .entry(segment.to_string())
            .or_insert_with(|| DocumentNode::Object(Object::new()));
        match next {
            DocumentNode::Object(inner) => current = inner,
            _ => {
                log.log(SCOPE, "dropped entry below a leaf", Some(&json!({ "path": path })));
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use form_model::MemoryLog;

    use super::*;

    #[test]
    fn indexed_keys_split_into_group_and_item() {
        assert_eq!(
            split_indexed_key("previous_travel_page.previous_travel_details.arrival.month_ctl01"),
            Some((
                "previous_travel_page.previous_travel_details".to_string(),
                1,
                "arrival.month".to_string()
            ))
        );
        assert_eq!(
            split_indexed_key("previous_travel_details.arrival_date_ctl02"),
            Some(("previous_travel_details".to_string(), 2, "arrival_date".to_string()))
        );
        assert_eq!(split_indexed_key("surname_ctl01"), None);
        assert_eq!(split_indexed_key("surname"), None);
    }

    #[test]
    fn indexed_scalars_become_compacted_sequence() {
        let log = MemoryLog::new();
        let flat = FlatMap::from([
            ("visits.arrival_ctl05".to_string(), FlatEntry::Scalar("2020".to_string())),
            ("visits.arrival_ctl02".to_string(), FlatEntry::Scalar("2019".to_string())),
        ]);
        let object = unflatten(&flat, &log);
        let visits = object["visits"].as_sequence().unwrap();
        assert_eq!(visits.len(), 2);
        assert_eq!(
            visits[0].as_object().unwrap()["arrival"],
            DocumentNode::scalar("2019")
        );
        assert_eq!(
            visits[1].as_object().unwrap()["arrival"],
            DocumentNode::scalar("2020")
        );
    }

    #[test]
    fn conflicting_paths_are_dropped_and_logged() {
        let log = MemoryLog::new();
        let flat = FlatMap::from([
            ("a".to_string(), FlatEntry::Scalar("leaf".to_string())),
            ("a.b".to_string(), FlatEntry::Scalar("below".to_string())),
        ]);
        let object = unflatten(&flat, &log);
        assert_eq!(object["a"], DocumentNode::scalar("leaf"));
        assert!(log.contains(SCOPE, "below a leaf"));
    }

    #[test]
    fn nested_sequences_are_dropped() {
        let log = MemoryLog::new();
        let object = Object::from([(
            "groups".to_string(),
            DocumentNode::Sequence(vec![DocumentNode::Sequence(vec![])]),
        )]);
        let flat = flatten(&object, &log);
        assert_eq!(flat["groups"], FlatEntry::group(vec![]));
        assert!(log.contains(SCOPE, "nested in sequence"));
    }
}
