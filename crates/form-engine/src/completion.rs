//! Answered / applicable counts over visible fields.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use form_model::ident::group_index;
use form_model::{AnswerMap, FieldDefinition};
use regex::Regex;
use serde::Serialize;

static DATE_PART: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.*?)\s*-\s*(Day|Month|Year)$").expect("date part pattern is valid")
});

static SSN_PART: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(U\.S\. Social Security Number)\s+([123])$").expect("ssn pattern is valid")
});

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Completion {
    pub answered: usize,
    pub applicable: usize,
}

impl Completion {
    pub fn is_complete(&self) -> bool {
        self.answered == self.applicable
    }

    /// Share of applicable units answered, 100 when nothing applies.
    pub fn percent(&self) -> f64 {
        if self.applicable == 0 {
            100.0
        } else {
            self.answered as f64 * 100.0 / self.applicable as f64
        }
    }
}

impl fmt::Display for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.answered, self.applicable)
    }
}

impl std::ops::Add for Completion {
    type Output = Completion;

    fn add(self, other: Completion) -> Completion {
        Completion {
            answered: self.answered + other.answered,
            applicable: self.applicable + other.applicable,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum TriadKind {
    Date,
    Ssn,
}

/// Compound fields share a base prompt and a group instance.
type TriadKey = (TriadKind, String, usize);

fn triad_part(field: &FieldDefinition) -> Option<(TriadKey, String)> {
    let index = group_index(&field.name);
    if let Some(captures) = DATE_PART.captures(&field.prompt) {
        let key = (TriadKind::Date, captures[1].trim().to_string(), index);
        return Some((key, captures[2].to_string()));
    }
    SSN_PART.captures(&field.prompt).map(|captures| {
        let key = (TriadKind::Ssn, captures[1].to_lowercase(), index);
        (key, captures[2].to_string())
    })
}

fn is_answered(field: &FieldDefinition, answers: &AnswerMap) -> bool {
    answers.is_answered(&field.name) || field.toggle_id().is_some_and(|id| answers.is_toggled(id))
}

/// Count answered and applicable units among `visible` fields.
///
/// Optional fields are skipped. Day/month/year triads and the three parts of a
/// U.S. Social Security Number count as one unit when all three parts are
/// visible; a triad is answered when
/// every part has a value or any part's not-applicable toggle is set.
pub fn count_completion(visible: &[FieldDefinition], answers: &AnswerMap) -> Completion {
    let required: Vec<&FieldDefinition> = visible.iter().filter(|field| !field.optional).collect();

    let mut triads: BTreeMap<TriadKey, BTreeMap<String, &FieldDefinition>> = BTreeMap::new();
    for field in &required {
        if let Some((key, part)) = triad_part(field) {
            triads.entry(key).or_default().insert(part, *field);
        }
    }
    triads.retain(|_, parts| parts.len() == 3);

    let mut completion = Completion::default();
    for field in &required {
        let in_triad = triad_part(field).is_some_and(|(key, _)| triads.contains_key(&key));
        if in_triad {
            continue;
        }
        completion.applicable += 1;
        if is_answered(field, answers) {
            completion.answered += 1;
        }
    }

    for parts in triads.values() {
        completion.applicable += 1;
        let toggled = parts
            .values()
            .any(|field| field.toggle_id().is_some_and(|id| answers.is_toggled(id)));
        let filled = parts.values().all(|field| answers.is_answered(&field.name));
        if toggled || filled {
            completion.answered += 1;
        }
    }
    completion
}

#[cfg(test)]
mod tests {
    use form_model::FieldKind;

    use super::*;

    fn text(name: &str, prompt: &str) -> FieldDefinition {
        FieldDefinition::new(name, prompt, FieldKind::ShortText)
    }

    fn date_triad(prefix: &str) -> Vec<FieldDefinition> {
        ["Day", "Month", "Year"]
            .iter()
            .map(|part| text(&format!("{prefix}{part}"), &format!("Date of Birth - {part}")))
            .collect()
    }

    #[test]
    fn date_triad_with_optional_note() {
        let mut fields = date_triad("ddlDOB");
        fields.push(text("tbxNOTE", "Notes").optional());

        let mut answers = AnswerMap::new();
        answers.set("ddlDOBDay", "01");
        answers.set("ddlDOBMonth", "JAN");
        assert_eq!(
            count_completion(&fields, &answers),
            Completion {
                answered: 0,
                applicable: 1
            }
        );

        answers.set("ddlDOBYear", "1990");
        assert_eq!(
            count_completion(&fields, &answers),
            Completion {
                answered: 1,
                applicable: 1
            }
        );
    }

    #[test]
    fn toggle_counts_as_answered() {
        let fields = vec![
            text("tbxSSN1", "U.S. Social Security Number 1").with_na_toggle("cbxSSN1_na", None),
            text("tbxSSN2", "U.S. Social Security Number 2"),
            text("tbxSSN3", "U.S. Social Security Number 3"),
        ];
        let answers: AnswerMap = [("cbxSSN1_na", "true")].into_iter().collect();
        assert_eq!(
            count_completion(&fields, &answers),
            Completion {
                answered: 1,
                applicable: 1
            }
        );

        let single = vec![text("tbxSSN1", "SSN").with_na_toggle("cbxSSN1_na", None)];
        assert_eq!(count_completion(&single, &answers).answered, 1);
    }

    #[test]
    fn incomplete_triads_count_parts_individually() {
        let fields = vec![
            text("ddlDay", "Arrival - Day"),
            text("ddlMonth", "Arrival - Month"),
        ];
        let answers: AnswerMap = [("ddlDay", "01")].into_iter().collect();
        assert_eq!(
            count_completion(&fields, &answers),
            Completion {
                answered: 1,
                applicable: 2
            }
        );
    }

    #[test]
    fn triads_are_keyed_per_group_instance() {
        let mut fields = Vec::new();
        for prefix in ["dtl_ctl00_ddl", "dtl_ctl01_ddl"] {
            fields.extend(date_triad(prefix));
        }
        let answers: AnswerMap = [
            ("dtl_ctl00_ddlDay", "1"),
            ("dtl_ctl00_ddlMonth", "2"),
            ("dtl_ctl00_ddlYear", "2000"),
        ]
        .into_iter()
        .collect();
        assert_eq!(
            count_completion(&fields, &answers),
            Completion {
                answered: 1,
                applicable: 2
            }
        );
    }

    #[test]
    fn other_numbered_prompts_count_individually() {
        let fields = vec![
            text("tbxPHONE1", "Phone Number 1"),
            text("tbxPHONE2", "Phone Number 2"),
            text("tbxPHONE3", "Phone Number 3"),
        ];
        let answers: AnswerMap = [("tbxPHONE1", "555")].into_iter().collect();
        assert_eq!(
            count_completion(&fields, &answers),
            Completion {
                answered: 1,
                applicable: 3
            }
        );
    }
}
