//! Answered-leaf counts computed straight from a document.

use std::collections::BTreeMap;

use form_model::{Document, DocumentNode, Object, is_truthy};
use serde::Serialize;

const SKIPPED_KEYS: &[&str] = &["button_clicks", "street2"];
const NA_SUFFIX: &str = "_na";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FieldCounts {
    pub by_page: BTreeMap<String, usize>,
    /// Counted leaves per page as `path=value`, for diagnostics.
    pub details: BTreeMap<String, Vec<String>>,
}

impl FieldCounts {
    pub fn total(&self) -> usize {
        self.by_page.values().sum()
    }
}

/// Count non-empty leaves per page.
///
/// A `key`/`key_na` pair counts once: answered when the toggle is `true`,
/// otherwise when the value is non-empty. Automation bookkeeping keys are
/// skipped.
pub fn count_fields_by_page(document: &Document) -> FieldCounts {
    let mut counts = FieldCounts::default();
    for (page, content) in document.pages() {
        let DocumentNode::Object(object) = content else {
            continue;
        };
        let mut details = Vec::new();
        let count = count_object(page, object, &mut details);
        counts.by_page.insert(page.to_string(), count);
        counts.details.insert(page.to_string(), details);
    }
    tracing::debug!(total = counts.total(), "document fields counted");
    counts
}

fn count_object(root_path: &str, root: &Object, details: &mut Vec<String>) -> usize {
    let mut count = 0;
    let mut stack = vec![(root_path.to_string(), root)];
    while let Some((path, object)) = stack.pop() {
        for (key, value) in object {
            if SKIPPED_KEYS.contains(&key.as_str()) || key.ends_with(NA_SUFFIX) {
                continue;
            }
            let current = format!("{path}.{key}");

            let toggle = object.get(&format!("{key}{NA_SUFFIX}"));
            if let Some(toggle) = toggle {
                if toggle.as_scalar().is_some_and(is_truthy) {
                    count += 1;
                    details.push(format!("{current}{NA_SUFFIX}=true"));
                } else if let Some(value) = value.as_scalar().filter(|v| !v.is_empty()) {
                    count += 1;
                    details.push(format!("{current}={value}"));
                }
                continue;
            }

            match value {
                DocumentNode::Scalar(value) if value.is_empty() => {}
                DocumentNode::Scalar(value) => {
                    count += 1;
                    details.push(format!("{current}={value}"));
                }
                DocumentNode::Object(inner) => stack.push((current, inner)),
                DocumentNode::Sequence(items) => {
                    for (index, item) in items.iter().enumerate() {
                        let item_path = format!("{current}[{index}]");
                        match item {
                            DocumentNode::Object(inner) => stack.push((item_path, inner)),
                            DocumentNode::Scalar(value) if !value.is_empty() => {
                                count += 1;
                                details.push(format!("{item_path}={value}"));
                            }
                            _ => {}
                        }
                    }
                }
            }
        }
    }
    count
}
