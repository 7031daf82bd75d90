use std::fs;
use std::path::Path;

use form_cli::commands::{run_export, run_import, run_progress, run_verify};
use form_document::parse_document;
use form_engine::Completion;

const RADIO: &str = "ctl00_SiteContentPlaceHolder_FormView1_rblPREV_US_TRAVEL_IND";
const ARRIVAL: &str = "ctl00_SiteContentPlaceHolder_FormView1_dtlPREV_US_VISIT_ctl00_tbxPREV_US_VISIT_DTE";
const ARRIVAL_01: &str = "ctl00_SiteContentPlaceHolder_FormView1_dtlPREV_US_VISIT_ctl01_tbxPREV_US_VISIT_DTE";
const SSN1: &str = "ctl00_SiteContentPlaceHolder_FormView1_tbxAPP_SSN1";
const SSN_NA: &str = "ctl00_SiteContentPlaceHolder_FormView1_cbexAPP_SSN_NA";

const TRAVEL_SCHEMA: &str = r#"{
  "fields": [
    {
      "name": "ctl00_SiteContentPlaceHolder_FormView1_rblPREV_US_TRAVEL_IND",
      "type": "radio",
      "value": ["Y", "N"],
      "text_phrase": "Have you ever been in the U.S.?",
      "button_ids": {
        "Y": "ctl00_SiteContentPlaceHolder_FormView1_rblPREV_US_TRAVEL_IND_0",
        "N": "ctl00_SiteContentPlaceHolder_FormView1_rblPREV_US_TRAVEL_IND_1"
      }
    }
  ],
  "dependencies": {
    "ctl00_SiteContentPlaceHolder_FormView1_rblPREV_US_TRAVEL_IND_0.Y": {
      "shows": [
        {
          "name": "ctl00_SiteContentPlaceHolder_FormView1_dtlPREV_US_VISIT_ctl00_tbxPREV_US_VISIT_DTE",
          "type": "date",
          "text_phrase": "Date Arrived",
          "parent_text_phrase": "Previous Travel Details",
          "add_group": true
        },
        {
          "name": "ctl00_SiteContentPlaceHolder_FormView1_dtlPREV_US_VISIT_ctl00_tbxPREV_US_VISIT_LOS",
          "type": "text",
          "text_phrase": "Length of Stay",
          "parent_text_phrase": "Previous Travel Details",
          "add_group": true
        }
      ],
      "hides": []
    }
  }
}"#;

const TRAVEL_MAPPING: &str = r#"{
  "form_mapping": {
    "previous_travel": "ctl00_SiteContentPlaceHolder_FormView1_rblPREV_US_TRAVEL_IND",
    "previous_travel_details.arrival_date": "ctl00_SiteContentPlaceHolder_FormView1_dtlPREV_US_VISIT_ctl00_tbxPREV_US_VISIT_DTE",
    "previous_travel_details.length_of_stay": "ctl00_SiteContentPlaceHolder_FormView1_dtlPREV_US_VISIT_ctl00_tbxPREV_US_VISIT_LOS"
  }
}"#;

const PERSONAL_SCHEMA: &str = r#"{
  "fields": [
    {
      "name": "ctl00_SiteContentPlaceHolder_FormView1_tbxAPP_SSN1",
      "type": "text",
      "text_phrase": "U.S. Social Security Number 1",
      "maxlength": "3",
      "has_na_checkbox": true,
      "na_checkbox_id": "ctl00_SiteContentPlaceHolder_FormView1_cbexAPP_SSN_NA",
      "na_checkbox_text": "Does Not Apply"
    },
    {
      "name": "ctl00_SiteContentPlaceHolder_FormView1_tbxAPP_SSN2",
      "type": "text",
      "text_phrase": "U.S. Social Security Number 2",
      "maxlength": "2"
    },
    {
      "name": "ctl00_SiteContentPlaceHolder_FormView1_tbxAPP_SSN3",
      "type": "text",
      "text_phrase": "U.S. Social Security Number 3",
      "maxlength": "4"
    }
  ]
}"#;

const PERSONAL_MAPPING: &str = r#"{
  "ssn1": "ctl00_SiteContentPlaceHolder_FormView1_tbxAPP_SSN1",
  "ssn1_na": "ctl00_SiteContentPlaceHolder_FormView1_cbexAPP_SSN_NA",
  "ssn2": "ctl00_SiteContentPlaceHolder_FormView1_tbxAPP_SSN2",
  "ssn3": "ctl00_SiteContentPlaceHolder_FormView1_tbxAPP_SSN3"
}"#;

const DOCUMENT: &str = r#"
personal_page2:
  ssn1: ""
  ssn1_na: true
previous_travel_page:
  previous_travel: "Y"
  previous_travel_details:
    - arrival_date: March 2019
      length_of_stay: ten days
    - arrival_date: May 2020
unknown_page:
  anything: here
"#;

fn write(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, contents).unwrap();
}

fn write_catalog(dir: &Path) {
    write(&dir.join("schemas/personal_page2.json"), PERSONAL_SCHEMA);
    write(&dir.join("mappings/personal_page2_mapping.json"), PERSONAL_MAPPING);
    write(&dir.join("schemas/previous_travel_page.json"), TRAVEL_SCHEMA);
    write(&dir.join("mappings/previous_travel_page_mapping.json"), TRAVEL_MAPPING);
    write(
        &dir.join("manifest.toml"),
        r#"[manifest]
schema = "form-engine.catalog"
schema_version = 1

[[pages]]
name = "personal_page2"
title = "Personal Information 2"
category = "personal"
schema = "schemas/personal_page2.json"
mapping = "mappings/personal_page2_mapping.json"

[[pages]]
name = "previous_travel_page"
title = "Previous U.S. Travel"
category = "travel"
schema = "schemas/previous_travel_page.json"
mapping = "mappings/previous_travel_page_mapping.json"
"#,
    );
}

#[test]
fn verify_reports_catalog_counts() {
    let dir = tempfile::tempdir().unwrap();
    write_catalog(dir.path());

    let summary = run_verify(dir.path()).unwrap();
    assert_eq!(summary.page_count, 2);
    assert_eq!(summary.field_count, 6);
    assert_eq!(summary.rule_count, 1);
    assert_eq!(summary.mapping_count, 7);
    assert_eq!(summary.pinned_file_count, 0);
    assert_eq!(summary.unpinned_file_count, 4);
}

#[test]
fn verify_fails_with_catalog_context() {
    let dir = tempfile::tempdir().unwrap();
    let error = run_verify(&dir.path().join("missing")).unwrap_err();
    assert!(format!("{error:#}").starts_with("load catalog"), "{error:#}");
}

#[test]
fn import_maps_document_to_answers() {
    let dir = tempfile::tempdir().unwrap();
    write_catalog(dir.path());
    let document = dir.path().join("answers.yaml");
    write(&document, DOCUMENT);

    let report = run_import(dir.path(), &document).unwrap();
    assert_eq!(report.answers.get(SSN_NA), Some("true"));
    assert_eq!(report.answers.get(SSN1), Some("N/A"));
    assert_eq!(report.answers.get(RADIO), Some("Y"));
    assert_eq!(report.answers.get(ARRIVAL), Some("March 2019"));
    assert_eq!(report.answers.get(ARRIVAL_01), Some("May 2020"));

    assert_eq!(report.groups.len(), 1);
    assert_eq!(report.groups[0].page, "previous_travel_page");
    assert_eq!(report.groups[0].group, "previous_travel_details");
    assert_eq!(report.groups[0].instances, 1);

    assert_eq!(report.diagnostics.len(), 1);
    assert_eq!(report.diagnostics[0].message, "skipped unknown page");
}

#[test]
fn progress_counts_visible_fields_per_page() {
    let dir = tempfile::tempdir().unwrap();
    write_catalog(dir.path());
    let document = dir.path().join("answers.yaml");
    write(&document, DOCUMENT);

    let report = run_progress(dir.path(), &document).unwrap();
    let pages: Vec<(&str, Completion, usize)> = report
        .pages
        .iter()
        .map(|page| (page.page.as_str(), page.completion, page.document_fields))
        .collect();
    assert_eq!(
        pages,
        [
            (
                "personal_page2",
                Completion {
                    answered: 1,
                    applicable: 1
                },
                1
            ),
            (
                "previous_travel_page",
                Completion {
                    answered: 4,
                    applicable: 5
                },
                4
            ),
        ]
    );
    assert_eq!(
        report.total,
        Completion {
            answered: 5,
            applicable: 6
        }
    );
}

#[test]
fn export_writes_nested_document() {
    let dir = tempfile::tempdir().unwrap();
    write_catalog(dir.path());
    let answers = dir.path().join("answers.json");
    write(
        &answers,
        &serde_json::json!({
            RADIO: "N",
            ARRIVAL: "March 2019",
            ARRIVAL_01: "May 2020",
            SSN_NA: "true",
            "tbxUNKNOWN": "x",
        })
        .to_string(),
    );

    let report = run_export(dir.path(), &answers).unwrap();
    assert_eq!(report.pages, 2);
    let expected = parse_document(
        r#"
personal_page2:
  ssn1: N/A
  ssn1_na: "true"
previous_travel_page:
  previous_travel: "N"
  previous_travel_details:
    - arrival_date: March 2019
    - arrival_date: May 2020
"#,
    )
    .unwrap();
    assert_eq!(parse_document(&report.yaml).unwrap(), expected);
    assert!(
        report
            .diagnostics
            .iter()
            .any(|entry| entry.message == "no mapping for identifier")
    );
}
