//! The flat answer map shared by every page of a form.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Value written to a field whose not-applicable toggle is set.
pub const NOT_APPLICABLE: &str = "N/A";

/// Toggle values are stored as strings; only `"true"` (any case) is set.
pub fn is_truthy(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("true")
}

/// Identifier to answer value. An absent key means unanswered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerMap(BTreeMap<String, String>);

impl AnswerMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<&str> {
        self.0.get(id).map(String::as_str)
    }

    /// Value for `id`, empty when unanswered.
    pub fn value(&self, id: &str) -> &str {
        self.get(id).unwrap_or("")
    }

    pub fn set(&mut self, id: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(id.into(), value.into())
    }

    pub fn remove(&mut self, id: &str) -> Option<String> {
        self.0.remove(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.0.contains_key(id)
    }

    /// True when `id` holds a non-blank value.
    pub fn is_answered(&self, id: &str) -> bool {
        self.get(id).is_some_and(|value| !value.trim().is_empty())
    }

    /// True when the toggle `id` is set.
    pub fn is_toggled(&self, id: &str) -> bool {
        self.get(id).is_some_and(is_truthy)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(id, value)| (id.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn extend(&mut self, other: AnswerMap) {
        self.0.extend(other.0);
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for AnswerMap {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(id, value)| (id.into(), value.into()))
                .collect(),
        )
    }
}

impl IntoIterator for AnswerMap {
    type Item = (String, String);
    type IntoIter = std::collections::btree_map::IntoIter<String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
