//! Group-index encoding for field identifiers.
//!
//! A repeatable field exists once per group instance. Every instance shares the
//! template identifier except for the last `_ctlNN` control-number token, which
//! carries the instance's group index (`_ctl00` on the template itself). Outer
//! tokens name enclosing containers and never change.
//!
//! [`GroupedId`] is the structured form of that pair; the string encoding only
//! appears at the edges through [`GroupedId::encode`] and [`GroupedId::parse`].

#![deny(unsafe_code)]

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Group index of the untransformed template.
pub const TEMPLATE_INDEX: usize = 0;

const TOKEN_PREFIX: &str = "_ctl";

static CONTROL_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_ctl(\d+)").expect("control token pattern is valid"));

/// A concrete identifier decoded into its template and group index.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroupedId {
    template: String,
    index: usize,
}

impl GroupedId {
    pub fn new(template: impl Into<String>, index: usize) -> Self {
        Self {
            template: template.into(),
            index,
        }
    }

    /// Decode a concrete identifier.
    pub fn parse(identifier: &str) -> Self {
        let (template, index) = detransform(identifier);
        Self { template, index }
    }

    /// Encode back into a concrete identifier.
    pub fn encode(&self) -> String {
        transform(&self.template, self.index)
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn is_template(&self) -> bool {
        self.index == TEMPLATE_INDEX
    }
}

impl fmt::Display for GroupedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

/// Encode `group_index` into `identifier`.
///
/// Index 0 and identifiers without a control-number token are returned as-is.
pub fn transform(identifier: &str, group_index: usize) -> String {
    if group_index == TEMPLATE_INDEX {
        return identifier.to_string();
    }
    replace_last_token(identifier, group_index).unwrap_or_else(|| identifier.to_string())
}

/// Decode `identifier` into its template identifier and group index.
///
/// Identifiers without a token decode to themselves at index 0.
pub fn detransform(identifier: &str) -> (String, usize) {
    let Some(captures) = CONTROL_TOKEN.captures_iter(identifier).last() else {
        return (identifier.to_string(), TEMPLATE_INDEX);
    };
    let Ok(index) = captures[1].parse::<usize>() else {
        return (identifier.to_string(), TEMPLATE_INDEX);
    };
    let template = replace_last_token(identifier, TEMPLATE_INDEX)
        .unwrap_or_else(|| identifier.to_string());
    (template, index)
}

/// Group index encoded in `identifier` (0 for templates and ineligible ids).
pub fn group_index(identifier: &str) -> usize {
    detransform(identifier).1
}

/// True when `identifier` carries a control-number token and can be cloned.
pub fn is_group_eligible(identifier: &str) -> bool {
    CONTROL_TOKEN.is_match(identifier)
}

fn replace_last_token(identifier: &str, group_index: usize) -> Option<String> {
    let token = CONTROL_TOKEN.find_iter(identifier).last()?;
    let mut out = String::with_capacity(identifier.len() + 2);
    out.push_str(&identifier[..token.start()]);
    out.push_str(TOKEN_PREFIX);
    out.push_str(&format!("{group_index:02}"));
    out.push_str(&identifier[token.end()..]);
    Some(out)
}
