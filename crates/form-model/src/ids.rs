use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};

/// Normalize a group label or document array key into a group key.
///
/// Labels are lowercased; whitespace runs become `_` unless the label already
/// uses underscores as separators.
pub fn normalize_label(label: &str) -> String {
    let lower = label.trim().to_lowercase();
    if lower.contains('_') {
        lower
    } else {
        lower.split_whitespace().collect::<Vec<_>>().join("_")
    }
}

/// Normalized identity of a repeated group within a page.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GroupKey(String);

impl GroupKey {
    pub fn new(label: impl AsRef<str>) -> Result<Self> {
        let key = normalize_label(label.as_ref());
        if key.is_empty() {
            return Err(ModelError::InvalidGroupLabel(label.as_ref().to_string()));
        }
        Ok(Self(key))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for GroupKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for GroupKey {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<GroupKey> for String {
    fn from(value: GroupKey) -> Self {
        value.0
    }
}
